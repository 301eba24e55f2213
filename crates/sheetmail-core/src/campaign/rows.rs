//! Selecting the rows a batch will mail.

use sheetmail_template::CellSource;

use super::draft::recipient_cell;
use super::model::DispatchRange;

/// Lists the rows of `range` to mail, in order.
///
/// The range is clamped to `1..=source.row_count()`. With
/// `skip_blank_addresses`, rows whose address cell is blank are left out;
/// an address cell that does not resolve is kept so validation reports it.
#[must_use]
pub fn compute_active_rows<S: CellSource + ?Sized>(
    range: DispatchRange,
    email_column: &str,
    source: &S,
    skip_blank_addresses: bool,
) -> Vec<u32> {
    range
        .clamp_to(source.row_count())
        .rows()
        .filter(|&row| {
            !skip_blank_addresses || !recipient_cell(email_column, row, source).trim().is_empty()
        })
        .collect()
}
