//! Rendering drafts and previews for single rows.

use std::fmt::Write;

use sheetmail_template::{
    CellSource, Template, contains_invalid_reference, parse_cell_reference, resolve_value,
    INVALID_REFERENCE,
};

use super::model::{Campaign, DraftProblem, MailDraft};
use super::validation::is_valid_email;

/// Renders drafts for many rows from one pre-scanned template.
#[derive(Debug, Clone)]
pub struct DraftBuilder<'a> {
    template: Template<'a>,
    email_column: &'a str,
    append_suffix: &'a str,
}

impl<'a> DraftBuilder<'a> {
    /// Creates a builder for a body template and address column.
    #[must_use]
    pub fn new(body_template: &'a str, email_column: &'a str, append_suffix: &'a str) -> Self {
        Self {
            template: Template::parse(body_template),
            email_column,
            append_suffix,
        }
    }

    /// Creates a builder from a campaign's template and address settings.
    #[must_use]
    pub fn from_campaign(campaign: &'a Campaign) -> Self {
        Self::new(
            &campaign.body,
            &campaign.email_column,
            &campaign.append_suffix,
        )
    }

    /// Renders the draft for `row`.
    ///
    /// The recipient is checked before the body; the first problem found is
    /// recorded.
    #[must_use]
    pub fn build<S: CellSource + ?Sized>(&self, row: u32, source: &S) -> MailDraft {
        let body = self.template.render(row, source);
        let mut recipient = recipient_cell(self.email_column, row, source);
        recipient.push_str(self.append_suffix);

        let problem = if !is_valid_email(&recipient) {
            Some(DraftProblem::InvalidRecipient)
        } else if contains_invalid_reference(&body) {
            Some(DraftProblem::InvalidReference(
                self.template.invalid_references(row, source),
            ))
        } else {
            None
        };

        MailDraft {
            row,
            body,
            recipient,
            problem,
        }
    }
}

/// Renders one row's draft.
///
/// The body is `body_template` substituted for `row`; the recipient is the
/// cell named by `email_column` (anchored to `row` when relative) followed
/// by `append_suffix`.
#[must_use]
pub fn build_draft<S: CellSource + ?Sized>(
    row: u32,
    body_template: &str,
    email_column: &str,
    append_suffix: &str,
    source: &S,
) -> MailDraft {
    DraftBuilder::new(body_template, email_column, append_suffix).build(row, source)
}

/// Resolves the address cell for `row` without any suffix.
#[must_use]
pub fn recipient_cell<S: CellSource + ?Sized>(email_column: &str, row: u32, source: &S) -> String {
    parse_cell_reference(email_column.trim(), row).map_or_else(
        |_| INVALID_REFERENCE.to_string(),
        |reference| resolve_value(&reference, source),
    )
}

/// Renders the message for `row` as the user would see it: headers, a
/// blank line, then the body.
#[must_use]
pub fn preview<S: CellSource + ?Sized>(campaign: &Campaign, row: u32, source: &S) -> String {
    let draft = DraftBuilder::from_campaign(campaign).build(row, source);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "From: {} <{}>",
        campaign.sender_display_name(),
        campaign.sender_email
    );
    let _ = writeln!(out, "To: <{}>", draft.recipient);
    for bcc in campaign.bcc_addresses() {
        let _ = writeln!(out, "Bcc: <{bcc}>");
    }
    let _ = writeln!(out, "Subject: {}", campaign.subject_line());
    out.push_str("\n\n");
    out.push_str(&draft.body);
    out
}
