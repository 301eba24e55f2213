//! Envelope address types.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, lacks exactly one `@`,
    /// has an empty local or domain part, or contains characters that would
    /// break the command line.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into().trim().to_string();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
        {
            return Err(Error::InvalidAddress(format!(
                "Address contains illegal characters: {addr}"
            )));
        }

        match addr.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => {
                if local.is_empty() || domain.is_empty() {
                    return Err(Error::InvalidAddress(
                        "Local and domain parts cannot be empty".into(),
                    ));
                }
                Ok(())
            }
            _ => Err(Error::InvalidAddress(format!(
                "Address must have exactly one @: {addr}"
            ))),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Sender and recipients of one mail transaction.
///
/// Header recipients (`To`, `Cc`) and blind copies all go in `recipients`;
/// only the message headers decide who is visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path.
    pub from: Address,
    /// Forward paths, in `RCPT TO` order.
    pub recipients: Vec<Address>,
}

impl Envelope {
    /// Creates an envelope with a single recipient.
    #[must_use]
    pub fn new(from: Address, to: Address) -> Self {
        Self {
            from,
            recipients: vec![to],
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn with_recipient(mut self, to: Address) -> Self {
        self.recipients.push(to);
        self
    }
}
