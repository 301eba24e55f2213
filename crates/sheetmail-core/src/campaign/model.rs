//! Campaign model types.

use serde::{Deserialize, Serialize};
use sheetmail_template::InvalidReference;

use crate::service::OutgoingMessage;

/// Inclusive, 1-based range of sheet rows to mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchRange {
    /// First row, inclusive.
    pub first_row: u32,
    /// Last row, inclusive.
    pub last_row: u32,
}

impl DispatchRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(first_row: u32, last_row: u32) -> Self {
        Self {
            first_row,
            last_row,
        }
    }

    /// A range covering a whole sheet of `row_count` rows.
    #[must_use]
    pub fn all(row_count: usize) -> Self {
        Self::new(1, u32::try_from(row_count).unwrap_or(u32::MAX))
    }

    /// Restricts the range to `1..=row_count`. The result may be empty.
    #[must_use]
    pub fn clamp_to(self, row_count: usize) -> Self {
        let max = u32::try_from(row_count).unwrap_or(u32::MAX);
        Self::new(self.first_row.max(1), self.last_row.min(max))
    }

    /// Iterates the rows in order.
    pub fn rows(self) -> impl Iterator<Item = u32> {
        self.first_row..=self.last_row
    }

    /// Returns true if the range holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_row > self.last_row
    }
}

impl Default for DispatchRange {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Everything the user configures for one mail merge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Campaign {
    /// Display name of the sender. Empty means "use the address".
    pub sender_name: String,
    /// Sender address.
    pub sender_email: String,
    /// Subject, without the course-code prefix.
    pub subject: String,
    /// Course code, shown as `[CODE]` in front of the subject.
    pub course_code: String,
    /// Blind copies, separated by `;`.
    pub bcc: String,
    /// Reference to the cell holding each row's address, usually a bare
    /// column such as `C`.
    pub email_column: String,
    /// Appended to every address cell, e.g. `@student.example.edu`.
    pub append_suffix: String,
    /// Body template with `#A1#` references.
    pub body: String,
    /// Rows to mail.
    pub range: DispatchRange,
    /// Leave out rows whose address cell is blank.
    pub skip_blank_addresses: bool,
    /// Mail the sender a summary once the batch is done.
    pub send_report: bool,
}

impl Campaign {
    /// `[<course code>] <subject>`.
    #[must_use]
    pub fn subject_line(&self) -> String {
        format!("[{}] {}", self.course_code, self.subject)
    }

    /// Sender name, falling back to the sender address when empty.
    #[must_use]
    pub fn sender_display_name(&self) -> &str {
        if self.sender_name.trim().is_empty() {
            &self.sender_email
        } else {
            &self.sender_name
        }
    }

    /// Blind-copy addresses, with empty entries dropped.
    pub fn bcc_addresses(&self) -> impl Iterator<Item = &str> {
        self.bcc
            .split(';')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }

    /// Builds the message for one draft.
    #[must_use]
    pub fn message_for(&self, draft: &MailDraft) -> OutgoingMessage {
        let mut message = OutgoingMessage::new(&self.sender_email, self.subject_line(), &draft.body)
            .from_name(self.sender_display_name())
            .to(&draft.recipient);
        for bcc in self.bcc_addresses() {
            message = message.bcc(bcc);
        }
        message
    }
}

/// Why a draft cannot be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftProblem {
    /// The rendered body contains the invalid-reference marker. Lists the
    /// offending tokens; empty when the marker came from cell text itself.
    InvalidReference(Vec<InvalidReference>),
    /// The recipient address is not a valid e-mail address.
    InvalidRecipient,
}

/// One row's rendered message, before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDraft {
    /// Sheet row the draft was rendered for.
    pub row: u32,
    /// Rendered body.
    pub body: String,
    /// Address cell plus suffix.
    pub recipient: String,
    /// First reason the draft cannot be sent, if any.
    pub problem: Option<DraftProblem>,
}

impl MailDraft {
    /// Returns true when the draft may be sent.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.problem.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn campaign() -> Campaign {
        Campaign {
            sender_name: "Dr. Jansen".into(),
            sender_email: "jansen@example.edu".into(),
            subject: "Results".into(),
            course_code: "MATH101".into(),
            bcc: "archive@example.edu; ;office@example.edu;".into(),
            ..Campaign::default()
        }
    }

    #[test]
    fn test_subject_line() {
        assert_eq!(campaign().subject_line(), "[MATH101] Results");
    }

    #[test]
    fn test_sender_name_falls_back_to_address() {
        let mut c = campaign();
        assert_eq!(c.sender_display_name(), "Dr. Jansen");
        c.sender_name = String::new();
        assert_eq!(c.sender_display_name(), "jansen@example.edu");
    }

    #[test]
    fn test_bcc_split() {
        assert_eq!(
            campaign().bcc_addresses().collect::<Vec<_>>(),
            vec!["archive@example.edu", "office@example.edu"]
        );
        assert_eq!(Campaign::default().bcc_addresses().count(), 0);
    }

    #[test]
    fn test_message_for_draft() {
        let draft = MailDraft {
            row: 2,
            body: "Hi".into(),
            recipient: "ana@example.edu".into(),
            problem: None,
        };
        let message = campaign().message_for(&draft);
        assert_eq!(message.to, vec!["ana@example.edu"]);
        assert_eq!(message.bcc.len(), 2);
        assert_eq!(message.subject, "[MATH101] Results");
        assert_eq!(message.from_name.as_deref(), Some("Dr. Jansen"));
    }

    #[test]
    fn test_range() {
        let range = DispatchRange::new(0, 10).clamp_to(3);
        assert_eq!(range, DispatchRange::new(1, 3));
        assert_eq!(range.rows().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(DispatchRange::new(5, 10).clamp_to(3).is_empty());
        assert_eq!(DispatchRange::all(4), DispatchRange::new(1, 4));
    }
}
