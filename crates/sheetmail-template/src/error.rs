//! Error types for cell references.

/// Result type alias for reference operations.
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Why a reference token could not be turned into a cell value.
///
/// None of these escape [`substitute`](crate::substitute): the engine
/// replaces the token with [`INVALID_REFERENCE`](crate::INVALID_REFERENCE)
/// and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// Token does not start with a column letter run, or has trailing garbage.
    #[error("Malformed reference: {0:?}")]
    Malformed(String),

    /// Column letters are empty, contain non-letters, or overflow.
    #[error("Invalid column: {0:?}")]
    InvalidColumn(String),

    /// Row number is zero or does not fit.
    #[error("Invalid row: {0:?}")]
    InvalidRow(String),

    /// Coordinate lies outside the active sheet, or no sheet is active.
    #[error("Cell {reference} is outside the sheet ({rows} rows x {columns} columns)")]
    OutOfRange {
        /// The reference in A1 form.
        reference: String,
        /// Rows in the source.
        rows: usize,
        /// Columns in the source.
        columns: usize,
    },
}

impl ReferenceError {
    /// Short reason used in validation messages.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed reference",
            Self::InvalidColumn(_) => "invalid column",
            Self::InvalidRow(_) => "invalid row",
            Self::OutOfRange { .. } => "outside the sheet",
        }
    }
}
