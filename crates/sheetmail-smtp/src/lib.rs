//! # sheetmail-smtp
//!
//! Async SMTP submission client (RFC 5321) built for batch sending: one
//! session is opened, authenticated once, and reused for every message.
//!
//! ## Features
//!
//! - **Type-state session**: `Client<Greeted>` can only authenticate,
//!   `Client<Ready>` can only send
//! - **TLS**: implicit TLS (port 465) and STARTTLS
//! - **Authentication**: PLAIN, falling back to LOGIN
//! - **Recoverable refusals**: a rejected transaction is reset with RSET so
//!   the session keeps going
//!
//! ## Quick Start
//!
//! ```ignore
//! use sheetmail_smtp::{Address, Client, Envelope};
//! use sheetmail_smtp::connection::connect_tls;
//!
//! #[tokio::main]
//! async fn main() -> sheetmail_smtp::Result<()> {
//!     let stream = connect_tls("smtp.example.com", 465).await?;
//!     let mut client = Client::connect(stream)
//!         .await?
//!         .ehlo("localhost")
//!         .await?
//!         .authenticate("user@example.com", "password")
//!         .await?;
//!
//!     let envelope = Envelope::new(
//!         Address::new("lecturer@example.com")?,
//!         Address::new("student@example.com")?,
//!     );
//!     client
//!         .send_mail(&envelope, b"Subject: Grades\r\n\r\nHello!\r\n")
//!         .await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────┐  authenticate() / without_auth()  ┌─────────┐
//! │ Greeted  │ ────────────────────────────────→ │  Ready  │ ⟲ send_mail()
//! └──────────┘                                   └─────────┘
//!   ehlo(), starttls()                             reset(), noop()
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization and DATA encoding
//! - [`connection`]: Streams and the type-state client
//! - [`parser`]: Reply parser
//! - [`types`]: Addresses, extensions, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Client, Greeted, Ready, ServerInfo, SmtpStream};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Envelope, Extension, Reply, ReplyCode};
