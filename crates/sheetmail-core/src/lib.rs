//! # sheetmail-core
//!
//! Core logic for the `sheetmail` mail-merge tool.
//!
//! This crate provides:
//! - Workbook loading (xlsx, xls, ods) into in-memory sheets
//! - Campaigns: sender, subject, address column and body template
//! - Batch validation before anything is sent
//! - The batch state machine and dispatch loop
//! - SMTP transport over one session per batch
//! - Settings persistence and keyring credentials

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod campaign;
pub mod credentials;
pub mod dispatch;
mod error;
pub mod service;
pub mod settings;
pub mod workbook;

pub use campaign::{
    Campaign, DispatchRange, DraftBuilder, DraftProblem, MailDraft, TemplateGenerator,
    ValidationError, build_draft, compute_active_rows, is_valid_email, preview, validate_batch,
    validated_drafts,
};
pub use credentials::{CredentialError, CredentialResult};
pub use dispatch::{
    Batch, BatchPhase, DispatchOutcome, Idle, MailTransport, Ready, Rejected, RowOutcome,
    SendError, dispatch,
};
pub use error::{Error, Result};
pub use service::{OutgoingMessage, Security, SmtpSettings, SmtpTransport, TransportError};
pub use settings::Settings;
pub use workbook::{Sheet, Workbook};
