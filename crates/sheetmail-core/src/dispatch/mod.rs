//! Batch state machine and the dispatch loop.
//!
//! A [`Batch`] moves through `Idle -> Validating -> Ready -> Sending ->
//! Complete`. The phases that can hold a batch are encoded as type-state:
//!
//! ```text
//! Batch<Idle> --validate()--> Batch<Ready> --dispatch()--> DispatchOutcome
//!      ^                |
//!      +--- Rejected ---+
//! ```
//!
//! Validation covers every row before the first message is handed to the
//! [`MailTransport`].

use std::fmt::{self, Write};
use std::future::Future;
use std::marker::PhantomData;

use sheetmail_template::CellSource;
use tracing::{debug, info, warn};

use crate::campaign::{
    Campaign, MailDraft, ValidationError, compute_active_rows, validated_drafts,
};
use crate::service::OutgoingMessage;

/// Why a single message was not sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The server refused this message. Later rows are still attempted.
    #[error("Rejected: {0}")]
    Rejected(String),
    /// The session is gone. No further message can be sent.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

impl SendError {
    /// Returns true if the batch cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// Sends fully formed messages, one at a time, over a session owned by the
/// batch.
pub trait MailTransport {
    /// Sends one message.
    fn send(
        &mut self,
        message: &OutgoingMessage,
    ) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Result of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    /// Sheet row.
    pub row: u32,
    /// Address the message went to.
    pub recipient: String,
    /// Whether the transport accepted the message.
    pub succeeded: bool,
    /// Transport error text for a failed row.
    pub error: Option<String>,
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Rows handed to the transport.
    pub attempted: usize,
    /// Rows the transport accepted.
    pub succeeded: usize,
    /// Rows the transport refused.
    pub failed: usize,
    /// Refused rows, in order.
    pub failed_rows: Vec<u32>,
    /// Every attempted row, in order.
    pub results: Vec<RowOutcome>,
    /// Reason the batch stopped early, if it did.
    pub aborted: Option<String>,
    /// Rows never handed to the transport because the batch stopped early.
    pub unsent_rows: Vec<u32>,
    /// Whether the summary report reached the transport.
    pub report_sent: bool,
}

impl DispatchOutcome {
    /// Returns true if every row was attempted and accepted.
    #[must_use]
    pub const fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    fn record(&mut self, row: u32, recipient: String, result: Result<(), SendError>) {
        self.attempted += 1;
        let error = match result {
            Ok(()) => {
                self.succeeded += 1;
                None
            }
            Err(e) => {
                self.failed += 1;
                self.failed_rows.push(row);
                Some(e.to_string())
            }
        };
        self.results.push(RowOutcome {
            row,
            recipient,
            succeeded: error.is_none(),
            error,
        });
    }

    /// Human-readable summary listing every attempted address.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut txt = String::new();
        let _ = write!(txt, "Tried to send {} mails.\n\n", self.attempted);

        let _ = writeln!(txt, "Mails OK: {}", self.succeeded);
        for result in self.results.iter().filter(|r| r.succeeded) {
            let _ = writeln!(txt, "  {}", result.recipient);
        }

        let _ = write!(txt, "\nMails Failed: {}\n", self.failed);
        for result in self.results.iter().filter(|r| !r.succeeded) {
            let _ = write!(txt, "  {}", result.recipient);
            if let Some(error) = &result.error {
                let _ = write!(txt, " ({error})");
            }
            txt.push('\n');
        }

        if let Some(reason) = &self.aborted {
            let _ = write!(txt, "\nStopped early: {reason}\n");
            let rows: Vec<String> = self.unsent_rows.iter().map(u32::to_string).collect();
            let _ = writeln!(txt, "Rows not attempted: {}", rows.join(", "));
        }
        txt
    }

    /// Builds the summary message, addressed to the campaign's sender.
    #[must_use]
    pub fn report(&self, campaign: &Campaign) -> OutgoingMessage {
        OutgoingMessage::new(
            &campaign.sender_email,
            format!("{} (report)", campaign.subject_line()),
            self.summary(),
        )
        .from_name(campaign.sender_display_name())
        .to(&campaign.sender_email)
    }
}

/// Sends one message per row, in order, over `transport`.
///
/// A refused message is recorded and the loop moves on; a
/// [`SendError::ConnectionLost`] stops the loop and lists the remaining rows
/// in [`DispatchOutcome::unsent_rows`].
pub async fn dispatch<T, F>(rows: &[u32], mut build: F, transport: &mut T) -> DispatchOutcome
where
    T: MailTransport,
    F: FnMut(u32) -> OutgoingMessage,
{
    send_rows(rows, |_, row| build(row), transport).await
}

/// [`dispatch`] with the row's position in `rows` passed to `build`.
async fn send_rows<T, F>(rows: &[u32], mut build: F, transport: &mut T) -> DispatchOutcome
where
    T: MailTransport,
    F: FnMut(usize, u32) -> OutgoingMessage,
{
    let mut outcome = DispatchOutcome::default();

    for (index, &row) in rows.iter().enumerate() {
        let message = build(index, row);
        let recipient = message.to.join(", ");
        debug!(row, recipient = %recipient, "Sending");

        let result = transport.send(&message).await;
        let fatal = match &result {
            Ok(()) => None,
            Err(e) => {
                warn!(row, recipient = %recipient, error = %e, "Send failed");
                e.is_fatal().then(|| e.to_string())
            }
        };
        outcome.record(row, recipient, result);

        if let Some(reason) = fatal {
            outcome.unsent_rows = rows[index + 1..].to_vec();
            outcome.aborted = Some(reason);
            break;
        }
    }

    info!(
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "Batch finished"
    );
    outcome
}

/// Phase of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchPhase {
    /// Configured, not yet checked.
    Idle,
    /// Being checked row by row.
    Validating,
    /// Checked; may be sent.
    Ready,
    /// Messages are going out.
    Sending,
    /// Every row was handled.
    Complete,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::Complete => "complete",
        })
    }
}

/// A batch that has not been validated.
#[derive(Debug, Clone, Copy)]
pub struct Idle;

/// A batch whose every row passed validation.
#[derive(Debug, Clone, Copy)]
pub struct Ready;

/// Type-state marker for [`Batch`].
pub trait BatchState: sealed::Sealed {
    /// Phase a batch in this state is in.
    const PHASE: BatchPhase;
}

impl BatchState for Idle {
    const PHASE: BatchPhase = BatchPhase::Idle;
}

impl BatchState for Ready {
    const PHASE: BatchPhase = BatchPhase::Ready;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Ready {}
}

/// One mail merge over a sheet.
///
/// A ready batch owns the drafts it validated, so what is sent is exactly
/// what was checked.
#[derive(Debug, Clone)]
pub struct Batch<S: BatchState> {
    campaign: Campaign,
    rows: Vec<u32>,
    drafts: Vec<MailDraft>,
    _state: PhantomData<S>,
}

/// Validation failed; the batch is handed back idle.
#[derive(Debug)]
pub struct Rejected {
    /// The batch, unchanged.
    pub batch: Batch<Idle>,
    /// First problem found.
    pub error: ValidationError,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Rejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<S: BatchState> Batch<S> {
    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BatchPhase {
        S::PHASE
    }

    /// The campaign being mailed.
    #[must_use]
    pub const fn campaign(&self) -> &Campaign {
        &self.campaign
    }
}

impl Batch<Idle> {
    /// Creates an idle batch.
    #[must_use]
    pub const fn new(campaign: Campaign) -> Self {
        Self {
            campaign,
            rows: Vec::new(),
            drafts: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Mutable access to the campaign, e.g. to fix a rejected batch.
    pub const fn campaign_mut(&mut self) -> &mut Campaign {
        &mut self.campaign
    }

    /// Computes the active rows and validates the whole batch.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] with the first [`ValidationError`]; nothing has
    /// been sent.
    #[allow(clippy::result_large_err)]
    pub fn validate<C: CellSource + ?Sized>(self, source: &C) -> Result<Batch<Ready>, Rejected> {
        debug!(phase = %BatchPhase::Validating, "Validating batch");
        let rows = compute_active_rows(
            self.campaign.range,
            &self.campaign.email_column,
            source,
            self.campaign.skip_blank_addresses,
        );

        match validated_drafts(&self.campaign, &rows, source) {
            Ok(drafts) => {
                info!(rows = rows.len(), phase = %BatchPhase::Ready, "Batch validated");
                Ok(Batch {
                    campaign: self.campaign,
                    rows,
                    drafts,
                    _state: PhantomData,
                })
            }
            Err(error) => {
                warn!(error = %error, phase = %BatchPhase::Idle, "Batch rejected");
                Err(Rejected { batch: self, error })
            }
        }
    }
}

impl Batch<Ready> {
    /// Rows that will be mailed, in order.
    #[must_use]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// Drafts rendered during validation, one per row.
    #[must_use]
    pub fn drafts(&self) -> &[MailDraft] {
        &self.drafts
    }

    /// Sends every validated draft, then the report if the campaign asks
    /// for one and the batch was not cut short.
    pub async fn dispatch<T: MailTransport>(self, transport: &mut T) -> DispatchOutcome {
        debug!(phase = %BatchPhase::Sending, rows = self.rows.len(), "Sending batch");
        let campaign = &self.campaign;
        let drafts = &self.drafts;
        let mut outcome = send_rows(
            &self.rows,
            |index, _| campaign.message_for(&drafts[index]),
            transport,
        )
        .await;

        if campaign.send_report && outcome.aborted.is_none() {
            match transport.send(&outcome.report(campaign)).await {
                Ok(()) => outcome.report_sent = true,
                Err(e) => warn!(error = %e, "Report not sent"),
            }
        }

        debug!(phase = %BatchPhase::Complete, "Batch complete");
        outcome
    }
}
