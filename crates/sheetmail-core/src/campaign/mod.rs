//! Mail-merge campaigns: configuration, row selection, drafts and
//! validation.

mod draft;
mod generator;
mod model;
mod rows;
mod validation;

pub use draft::{DraftBuilder, build_draft, preview, recipient_cell};
pub use generator::TemplateGenerator;
pub use model::{Campaign, DispatchRange, DraftProblem, MailDraft};
pub use rows::compute_active_rows;
pub use validation::{
    MIN_FIELD_LENGTH, ValidationError, is_valid_email, validate_batch,
    validated_drafts,
};
