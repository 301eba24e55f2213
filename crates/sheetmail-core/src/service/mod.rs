//! Outgoing mail services.

mod smtp;

pub use smtp::{OutgoingMessage, Security, SmtpSettings, SmtpTransport, TransportError};
