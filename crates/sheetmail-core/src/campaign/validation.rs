//! Batch validation.
//!
//! Every check runs before the first message leaves, so a typo in a cell
//! reference cannot leave a batch half sent.

use std::sync::LazyLock;

use regex::Regex;
use sheetmail_template::{CellSource, InvalidReference};

use super::draft::DraftBuilder;
use super::model::{Campaign, DraftProblem, MailDraft};

/// Minimum length, in characters, of the subject and the course code.
pub const MIN_FIELD_LENGTH: usize = 2;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z0-9-]{2,63}$").expect("valid regex")
});

/// Returns true if `address` is a syntactically acceptable e-mail address.
///
/// The whole string must match; letters are compared case-insensitively.
#[must_use]
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

/// Reason a batch may not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Sender address is not valid.
    InvalidSender(String),
    /// Course code is shorter than [`MIN_FIELD_LENGTH`].
    CourseCodeTooShort,
    /// Subject is shorter than [`MIN_FIELD_LENGTH`].
    SubjectTooShort,
    /// No row left to mail.
    NoRows,
    /// A row's recipient address is not valid.
    InvalidRecipient {
        /// Sheet row.
        row: u32,
        /// Address as rendered, suffix included.
        address: String,
    },
    /// A row's body still contains unresolved references.
    InvalidReferences {
        /// Sheet row.
        row: u32,
        /// Tokens that did not resolve for this row.
        tokens: Vec<InvalidReference>,
    },
    /// A blind-copy address is not valid.
    InvalidBcc(String),
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidSender(_) => "Sender email address is invalid",
            Self::CourseCodeTooShort => "Course code must be at least 2 characters",
            Self::SubjectTooShort => "Subject must be at least 2 characters",
            Self::NoRows => "There are no mails to send",
            Self::InvalidRecipient { .. } => "Recipient email address is invalid",
            Self::InvalidReferences { .. } => "Mail text contains invalid references",
            Self::InvalidBcc(_) => "Bcc email address is invalid",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidSender(_) => "sender_email",
            Self::CourseCodeTooShort => "course_code",
            Self::SubjectTooShort => "subject",
            Self::NoRows => "range",
            Self::InvalidRecipient { .. } => "email_column",
            Self::InvalidReferences { .. } => "body",
            Self::InvalidBcc(_) => "bcc",
        }
    }

    /// Sheet row the error was found on, if it is row-specific.
    #[must_use]
    pub const fn row(&self) -> Option<u32> {
        match self {
            Self::InvalidRecipient { row, .. } | Self::InvalidReferences { row, .. } => Some(*row),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSender(addr) | Self::InvalidBcc(addr) => {
                write!(f, "{}: {addr:?}", self.message())
            }
            Self::InvalidRecipient { row, address } => {
                write!(f, "{} on row {row}: {address:?}", self.message())
            }
            Self::InvalidReferences { row, tokens } if !tokens.is_empty() => {
                let list: Vec<_> = tokens.iter().map(ToString::to_string).collect();
                write!(f, "{} on row {row}: {}", self.message(), list.join(", "))
            }
            Self::InvalidReferences { row, .. } => write!(f, "{} on row {row}", self.message()),
            _ => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks a whole batch before anything is sent.
///
/// Checks run in this order and stop at the first failure: sender address,
/// course code length, subject length, at least one row, then for each row
/// its recipient address and its rendered body, and finally every bcc
/// address.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_batch<S: CellSource + ?Sized>(
    campaign: &Campaign,
    rows: &[u32],
    source: &S,
) -> Result<(), ValidationError> {
    validated_drafts(campaign, rows, source).map(|_| ())
}

/// Like [`validate_batch`], but hands back the drafts it rendered, one per
/// row and in row order.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validated_drafts<S: CellSource + ?Sized>(
    campaign: &Campaign,
    rows: &[u32],
    source: &S,
) -> Result<Vec<MailDraft>, ValidationError> {
    if !is_valid_email(&campaign.sender_email) {
        return Err(ValidationError::InvalidSender(campaign.sender_email.clone()));
    }
    if campaign.course_code.chars().count() < MIN_FIELD_LENGTH {
        return Err(ValidationError::CourseCodeTooShort);
    }
    if campaign.subject.chars().count() < MIN_FIELD_LENGTH {
        return Err(ValidationError::SubjectTooShort);
    }
    if rows.is_empty() {
        return Err(ValidationError::NoRows);
    }

    let builder = DraftBuilder::from_campaign(campaign);
    let mut drafts = Vec::with_capacity(rows.len());
    for &row in rows {
        let draft = builder.build(row, source);
        match draft.problem {
            None => drafts.push(draft),
            Some(DraftProblem::InvalidRecipient) => {
                return Err(ValidationError::InvalidRecipient {
                    row,
                    address: draft.recipient,
                });
            }
            Some(DraftProblem::InvalidReference(tokens)) => {
                return Err(ValidationError::InvalidReferences { row, tokens });
            }
        }
    }

    if let Some(bad) = campaign.bcc_addresses().find(|addr| !is_valid_email(addr)) {
        return Err(ValidationError::InvalidBcc(bad.to_string()));
    }

    Ok(drafts)
}
