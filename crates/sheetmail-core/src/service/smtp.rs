//! SMTP service for sending a batch over one session.
//!
//! Connects and authenticates once, then hands every message of the batch
//! to the same [`Client`] session.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use sheetmail_smtp::connection::{connect, connect_tls};
use sheetmail_smtp::{Address, Client, Envelope, Ready};
use tracing::{debug, info};

use crate::dispatch::{MailTransport, SendError};

/// Hostname announced in EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

/// Security/encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

/// SMTP server configuration. The password is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication. Empty means no authentication.
    pub username: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Security::Tls.default_port(),
            security: Security::Tls,
            username: String::new(),
        }
    }
}

/// Errors that end a batch before its first message.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No server configured.
    #[error("No SMTP server configured")]
    NoServer,

    /// Connection or TLS setup failed.
    #[error("Connection to {host}:{port} failed: {source}")]
    Connection {
        /// Server hostname.
        host: String,
        /// Server port.
        port: u16,
        /// Underlying error.
        source: sheetmail_smtp::Error,
    },

    /// Authentication failed.
    #[error("Authentication as {username} failed: {source}")]
    Authentication {
        /// Username that was refused.
        username: String,
        /// Underlying error.
        source: sheetmail_smtp::Error,
    },

    /// Closing the session failed.
    #[error("Closing the SMTP session failed: {0}")]
    Close(sheetmail_smtp::Error),
}

/// An email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// BCC addresses. Envelope only, never in the headers.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl OutgoingMessage {
    /// Creates a new outgoing message.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            from_name: None,
            to: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Sets the sender display name.
    #[must_use]
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Builds the RFC 5322 formatted message, dated now.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        self.render(&Local::now(), &next_message_id(&self.from))
    }

    /// Builds the RFC 5322 formatted message with a fixed date and
    /// Message-ID.
    #[must_use]
    pub fn render<Tz: TimeZone>(&self, date: &DateTime<Tz>, message_id: &str) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut message = String::new();

        let _ = writeln!(message, "From: {}\r", self.from_header());
        if !self.to.is_empty() {
            let _ = writeln!(message, "To: {}\r", self.to.join(", "));
        }
        let _ = writeln!(message, "Subject: {}\r", encode_header(&self.subject));
        let _ = writeln!(message, "Date: {}\r", date.to_rfc2822());
        let _ = writeln!(message, "Message-ID: {message_id}\r");
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");

        message.push_str(&self.body);
        if !self.body.ends_with('\n') {
            message.push_str("\r\n");
        }
        message
    }

    /// Builds the SMTP envelope: every `to` and `bcc` address.
    ///
    /// # Errors
    ///
    /// Returns an error if any address cannot be used on the wire.
    pub fn envelope(&self) -> sheetmail_smtp::Result<Envelope> {
        let mut recipients = self.to.iter().chain(&self.bcc);
        let first = recipients
            .next()
            .ok_or_else(|| sheetmail_smtp::Error::InvalidAddress("No recipients specified".into()))?;

        let mut envelope = Envelope::new(Address::new(&self.from)?, Address::new(first)?);
        for addr in recipients {
            envelope = envelope.with_recipient(Address::new(addr)?);
        }
        Ok(envelope)
    }

    fn from_header(&self) -> String {
        match self.from_name.as_deref() {
            Some(name) if !name.is_empty() && name != self.from => {
                let name = if name.is_ascii() {
                    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    encode_header(name)
                };
                format!("{name} <{}>", self.from)
            }
            _ => format!("<{}>", self.from),
        }
    }
}

/// Encodes a header value as an RFC 2047 encoded word when it is not plain
/// ASCII.
fn encode_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }
    format!("=?utf-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

fn next_message_id(from: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let domain = from.rsplit_once('@').map_or("localhost", |(_, d)| d);
    let stamp = Local::now().timestamp_micros();
    format!("<{stamp}.{seq}.sheetmail@{domain}>")
}

/// A [`MailTransport`] backed by one authenticated SMTP session.
#[derive(Debug)]
pub struct SmtpTransport {
    client: Client<Ready>,
    sent: usize,
}

impl SmtpTransport {
    /// Connects, greets and authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] or
    /// [`TransportError::Authentication`]; no message has been sent then.
    pub async fn connect(settings: &SmtpSettings, password: &str) -> Result<Self, TransportError> {
        if settings.host.trim().is_empty() {
            return Err(TransportError::NoServer);
        }
        let host = settings.host.trim();
        let connection_error = |source| TransportError::Connection {
            host: host.to_string(),
            port: settings.port,
            source,
        };

        let stream = match settings.security {
            Security::Tls => connect_tls(host, settings.port).await,
            Security::StartTls | Security::None => connect(host, settings.port).await,
        }
        .map_err(connection_error)?;

        let client = Client::connect(stream)
            .await
            .map_err(connection_error)?
            .ehlo(CLIENT_HOSTNAME)
            .await
            .map_err(connection_error)?;

        let client = if settings.security == Security::StartTls {
            client
                .starttls(host, CLIENT_HOSTNAME)
                .await
                .map_err(connection_error)?
        } else {
            client
        };

        let client = if settings.username.is_empty() {
            client.without_auth()
        } else {
            client
                .authenticate(&settings.username, password)
                .await
                .map_err(|source| TransportError::Authentication {
                    username: settings.username.clone(),
                    source,
                })?
        };

        info!(
            host,
            port = settings.port,
            security = settings.security.display_name(),
            "SMTP session ready"
        );
        Ok(Self { client, sent: 0 })
    }

    /// Number of messages the server accepted so far.
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge QUIT.
    pub async fn close(self) -> Result<(), TransportError> {
        debug!(sent = self.sent, "Closing SMTP session");
        self.client.quit().await.map_err(TransportError::Close)
    }
}

impl MailTransport for SmtpTransport {
    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SendError> {
        let envelope = message
            .envelope()
            .map_err(|e| SendError::Rejected(e.to_string()))?;
        let data = message.to_rfc5322();

        match self.client.send_mail(&envelope, data.as_bytes()).await {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) if e.is_connection_error() => Err(SendError::ConnectionLost(e.to_string())),
            Err(e) => Err(SendError::Rejected(e.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message() -> OutgoingMessage {
        OutgoingMessage::new("jansen@example.edu", "[MA101] Results", "Dear Ana,\n\nWell done.")
            .from_name("Dr. Jansen")
            .to("ana@example.edu")
            .bcc("office@example.edu")
    }

    #[test]
    fn test_render_headers() {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let text = message().render(&date, "<1@example.edu>");
        assert_eq!(
            text,
            format!("From: \"Dr. Jansen\" <jansen@example.edu>\r\n\
             To: ana@example.edu\r\n\
             Subject: [MA101] Results\r\n\
             Date: {}\r\n\
             Message-ID: <1@example.edu>\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             Dear Ana,\n\nWell done.\r\n",
            date.to_rfc2822()
        ));
        assert!(!text.contains("office@example.edu"));
    }

    #[test]
    fn test_non_ascii_headers_are_encoded() {
        let msg = OutgoingMessage::new("a@example.edu", "Cijfer één", "x").from_name("Zoë");
        let text = msg.render(&Utc::now(), "<x@y>");
        assert!(text.contains("From: =?utf-8?B?Wm/Dqw==?= <a@example.edu>\r\n"));
        assert!(text.contains("Subject: =?utf-8?B?"));
    }

    #[test]
    fn test_name_equal_to_address_is_dropped() {
        let msg = OutgoingMessage::new("a@example.edu", "s", "b").from_name("a@example.edu");
        assert_eq!(msg.from_header(), "<a@example.edu>");
    }

    #[test]
    fn test_envelope_includes_bcc() {
        let envelope = message().envelope().unwrap();
        assert_eq!(envelope.from.as_str(), "jansen@example.edu");
        let rcpts: Vec<_> = envelope.recipients.iter().map(Address::as_str).collect();
        assert_eq!(rcpts, vec!["ana@example.edu", "office@example.edu"]);
    }

    #[test]
    fn test_envelope_needs_recipient() {
        let msg = OutgoingMessage::new("a@example.edu", "s", "b");
        assert!(msg.envelope().is_err());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = next_message_id("a@example.edu");
        let b = next_message_id("a@example.edu");
        assert_ne!(a, b);
        assert!(a.ends_with("@example.edu>"));
    }

    #[test]
    fn test_security_defaults() {
        let settings = SmtpSettings::default();
        assert_eq!(settings.port, 465);
        assert_eq!(settings.security, Security::Tls);
        assert_eq!(Security::StartTls.default_port(), 587);
    }

    #[tokio::test]
    async fn test_connect_requires_host() {
        let err = SmtpTransport::connect(&SmtpSettings::default(), "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NoServer));
    }
}
