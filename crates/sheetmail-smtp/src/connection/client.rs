//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{AuthMechanism, Envelope, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Type-state marker: greeting received, not yet authenticated.
#[derive(Debug)]
pub struct Greeted;

/// Type-state marker: mail transactions may be started.
#[derive(Debug)]
pub struct Ready;

/// SMTP client with type-state pattern.
///
/// A `Client<Ready>` is a reusable session: [`Client::send_mail`] borrows it
/// mutably and leaves it ready for the next message.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl Client<Greeted> {
    /// Reads the server greeting from a freshly opened stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not `220`.
    pub async fn connect(stream: SmtpStream) -> Result<Self> {
        let mut client = Self {
            stream,
            server_info: ServerInfo::default(),
            _state: PhantomData,
        };

        let greeting = client.read_reply().await?.expect_code(ReplyCode::SERVICE_READY)?;
        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %client.server_info.hostname, "SMTP greeting received");

        Ok(client)
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects EHLO.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .expect_success()?;

        // First line is the server's greeting text
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect::<HashSet<_>>();
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised, is refused, or the
    /// handshake fails.
    pub async fn starttls(mut self, server_hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls)
            .await?
            .expect_code(ReplyCode::SERVICE_READY)?;
        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        self.ehlo(client_hostname).await
    }

    /// Authenticates with the best mechanism the server offers.
    ///
    /// PLAIN is preferred; LOGIN is used when it is the only one available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAuthMechanism`] when neither is offered, or the
    /// server's rejection.
    pub async fn authenticate(self, username: &str, password: &str) -> Result<Client<Ready>> {
        let offered = self.server_info.auth_mechanisms();
        if offered.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else if offered.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else {
            let names: Vec<_> = offered.iter().map(|m| m.as_str()).collect();
            Err(Error::NoAuthMechanism(if names.is_empty() {
                "none".into()
            } else {
                names.join(" ")
            }))
        }
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<Ready>> {
        let credentials = STANDARD.encode(format!("\0{username}\0{password}"));
        self.send_command(Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(credentials),
        })
        .await?
        .expect_code(ReplyCode::AUTH_SUCCESS)?;

        tracing::debug!(mechanism = "PLAIN", "SMTP authenticated");
        Ok(self.into_state())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the exchange is refused.
    pub async fn auth_login(mut self, username: &str, password: &str) -> Result<Client<Ready>> {
        self.send_command(Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        })
        .await?
        .expect_code(ReplyCode::AUTH_CONTINUE)?;
        self.send_command(Command::AuthResponse(STANDARD.encode(username)))
            .await?
            .expect_code(ReplyCode::AUTH_CONTINUE)?;
        self.send_command(Command::AuthResponse(STANDARD.encode(password)))
            .await?
            .expect_code(ReplyCode::AUTH_SUCCESS)?;

        tracing::debug!(mechanism = "LOGIN", "SMTP authenticated");
        Ok(self.into_state())
    }

    /// Skips authentication, for relays that accept unauthenticated mail.
    #[must_use]
    pub fn without_auth(self) -> Client<Ready> {
        self.into_state()
    }
}

impl Client<Ready> {
    /// Sends one message: MAIL FROM, RCPT TO for every envelope recipient,
    /// then DATA.
    ///
    /// When the server refuses a step, the transaction is reset with RSET
    /// so the session can carry the next message, and the refusal is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the server's refusal, [`Error::MessageTooLarge`] when the
    /// message exceeds the advertised SIZE, or a connection error.
    pub async fn send_mail(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        if envelope.recipients.is_empty() {
            return Err(Error::Protocol("Envelope has no recipients".into()));
        }
        if let Some(limit) = self.server_info.max_message_size()
            && limit > 0
            && message.len() > limit
        {
            return Err(Error::MessageTooLarge {
                size: message.len(),
                limit,
            });
        }

        match self.transaction(envelope, message).await {
            Err(err) if !err.is_connection_error() => {
                if let Err(reset_err) = self.reset().await {
                    tracing::warn!(?reset_err, "RSET after refused transaction failed");
                }
                Err(err)
            }
            other => other,
        }
    }

    async fn transaction(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        let body = self.server_info.supports_8bitmime().then_some("8BITMIME");
        let size = self.server_info.advertises_size().then_some(message.len());

        self.send_command(Command::MailFrom {
            from: envelope.from.clone(),
            body,
            size,
        })
        .await?
        .expect_success()?;

        for to in &envelope.recipients {
            self.send_command(Command::RcptTo { to: to.clone() })
                .await?
                .expect_success()?;
        }

        self.send_command(Command::Data)
            .await?
            .expect_code(ReplyCode::START_DATA)?;
        self.stream.write_all(&encode_data(message)).await?;
        let accepted = self.read_reply().await?.expect_success()?;

        tracing::debug!(
            recipients = envelope.recipients.len(),
            reply = %accepted.message_text(),
            "Message accepted"
        );
        Ok(())
    }

    /// Aborts the current mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if RSET is refused.
    pub async fn reset(&mut self) -> Result<()> {
        self.send_command(Command::Rset).await?.expect_success()?;
        Ok(())
    }

    /// Checks the session is still alive.
    ///
    /// # Errors
    ///
    /// Returns an error if NOOP is refused or the connection is gone.
    pub async fn noop(&mut self) -> Result<()> {
        self.send_command(Command::Noop).await?.expect_success()?;
        Ok(())
    }
}

impl<S> Client<S> {
    /// Returns what the server advertised.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true once the session runs over TLS.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }

    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::trace!(command = cmd.verb(), "C:");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = self.read_reply().await?;
        tracing::trace!(command = cmd.verb(), code = %reply.code, "S:");
        if reply.code == ReplyCode::SERVICE_UNAVAILABLE {
            return Err(Error::smtp_error(
                reply.code.as_u16(),
                reply.message_text(),
            ));
        }
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.stream.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        self.send_command(Command::Quit)
            .await?
            .expect_code(ReplyCode::CLOSING)?;
        if let Err(err) = self.stream.shutdown().await {
            tracing::debug!(?err, "Stream shutdown after QUIT failed");
        }
        Ok(())
    }
}
