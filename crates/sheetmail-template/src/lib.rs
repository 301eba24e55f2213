//! # sheetmail-template
//!
//! Spreadsheet cell references and the `#A1#` template language used to
//! generate one mail per spreadsheet row.
//!
//! ## Features
//!
//! - **Column letters**: bijective base-26 decoding and encoding (`A` = 1,
//!   `AA` = 27) of any length
//! - **Cell references**: `B` (relative to the row being rendered) and `B7`
//!   (absolute)
//! - **Substitution**: single-pass, non-overlapping `#...#` scanning; bad
//!   references render as [`INVALID_REFERENCE`] instead of failing
//!
//! ## Quick Start
//!
//! ```
//! use sheetmail_template::{Grid, substitute};
//!
//! let sheet = Grid::from_rows([
//!     vec!["name", "score"],
//!     vec!["Alice", "9"],
//! ]);
//!
//! let text = substitute("Hello #A#, you scored #B#/#B1#", 2, &sheet);
//! assert_eq!(text, "Hello Alice, you scored 9/score");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod reference;
mod source;
mod template;

pub use error::{ReferenceError, Result};
pub use reference::{
    CellReference, decode_column_letters, encode_column_letters, parse_cell_reference,
    resolve_value,
};
pub use source::{CellSource, Grid};
pub use template::{InvalidReference, Segment, Template, substitute};

/// Text rendered in place of a reference that cannot be resolved.
///
/// Its presence in a rendered body blocks sending.
pub const INVALID_REFERENCE: &str = "[INV_REF!]";

/// Returns true if `text` contains the [`INVALID_REFERENCE`] marker.
#[must_use]
pub fn contains_invalid_reference(text: &str) -> bool {
    text.contains(INVALID_REFERENCE)
}
