//! Cell reference parsing and column-letter encoding.
//!
//! Columns use the spreadsheet's bijective base-26 numbering: `A` = 1,
//! `Z` = 26, `AA` = 27. Rows are plain 1-based integers. A reference
//! without a row number is *relative* and is anchored to whichever row is
//! being rendered.

use std::fmt;
use std::str::FromStr;

use crate::INVALID_REFERENCE;
use crate::error::{ReferenceError, Result};
use crate::source::CellSource;

/// A parsed `B`, `B7` or `AB12` style address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellReference {
    /// 1-based column index.
    pub column: u32,
    /// 1-based row index, `None` for a relative reference.
    pub row: Option<u32>,
}

impl CellReference {
    /// Creates an absolute reference.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self {
            column,
            row: Some(row),
        }
    }

    /// Creates a relative (column-only) reference.
    #[must_use]
    pub const fn relative(column: u32) -> Self {
        Self { column, row: None }
    }

    /// Returns true if the reference has no row of its own.
    #[must_use]
    pub const fn is_relative(&self) -> bool {
        self.row.is_none()
    }

    /// Anchors a relative reference to `current_row`. Absolute references
    /// are returned unchanged.
    #[must_use]
    pub const fn anchored(self, current_row: u32) -> Self {
        match self.row {
            Some(_) => self,
            None => Self::new(self.column, current_row),
        }
    }

    /// Reads the referenced cell, failing when the coordinate is unusable.
    ///
    /// This is the strict counterpart of [`resolve_value`].
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::OutOfRange`] when the row is missing or
    /// zero, the column is zero, or either exceeds the source's bounds.
    pub fn lookup<S: CellSource + ?Sized>(&self, source: &S) -> Result<String> {
        let rows = source.row_count();
        let columns = source.column_count();
        let out_of_range = || ReferenceError::OutOfRange {
            reference: self.to_string(),
            rows,
            columns,
        };

        let row = self.row.ok_or_else(out_of_range)? as usize;
        let column = self.column as usize;
        if row == 0 || column == 0 || row > rows || column > columns {
            return Err(out_of_range());
        }
        Ok(source.value_at(row, column))
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match encode_column_letters(self.column) {
            Ok(letters) => f.write_str(&letters)?,
            Err(_) => f.write_str("?")?,
        }
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl FromStr for CellReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self> {
        let (letters, digits) = split_token(s)?;
        let column = decode_column_letters(letters)?;
        let row = if digits.is_empty() {
            None
        } else {
            Some(parse_row(digits)?)
        };
        Ok(Self { column, row })
    }
}

/// Decodes column letters (`A`, `z`, `AB`, ...) to a 1-based index.
///
/// Any length is accepted as long as the value fits in a `u32`.
///
/// # Errors
///
/// Returns [`ReferenceError::InvalidColumn`] when `letters` is empty,
/// contains anything but ASCII letters, or overflows.
pub fn decode_column_letters(letters: &str) -> Result<u32> {
    let invalid = || ReferenceError::InvalidColumn(letters.to_string());
    if letters.is_empty() {
        return Err(invalid());
    }

    letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)
    })
}

/// Encodes a 1-based column index as uppercase letters.
///
/// # Errors
///
/// Returns [`ReferenceError::InvalidColumn`] for column 0.
pub fn encode_column_letters(column: u32) -> Result<String> {
    if column == 0 {
        return Err(ReferenceError::InvalidColumn("0".into()));
    }

    let mut n = column;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    Ok(out.into_iter().map(char::from).collect())
}

/// Parses the text between two `#` delimiters.
///
/// The column is the first run of letters in the token and the row the run
/// of digits directly after it; anything else is ignored, so `1A` reads as
/// `A` and `A2B` as `A2`. Without digits the row is `current_row`.
///
/// # Errors
///
/// - [`ReferenceError::Malformed`] if the token has no letters.
/// - [`ReferenceError::InvalidColumn`] if the letters do not decode.
/// - [`ReferenceError::InvalidRow`] if the row is zero or too large.
pub fn parse_cell_reference(token: &str, current_row: u32) -> Result<CellReference> {
    token
        .parse::<CellReference>()
        .map(|r| r.anchored(current_row))
}

/// Resolves a reference against a source, never failing.
///
/// Returns [`INVALID_REFERENCE`] when the row is missing or zero, the
/// column is zero, the source has no active sheet, or the coordinate lies
/// beyond `row_count()` / `column_count()`. Otherwise returns the stored
/// value as plain text.
#[must_use]
pub fn resolve_value<S: CellSource + ?Sized>(reference: &CellReference, source: &S) -> String {
    reference
        .lookup(source)
        .unwrap_or_else(|_| INVALID_REFERENCE.to_string())
}

/// Splits a token into its first letter run and the digit run right after
/// it. Text before the letters and after the digits is ignored.
fn split_token(token: &str) -> Result<(&str, &str)> {
    let letters_start = token
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| ReferenceError::Malformed(token.to_string()))?;

    let tail = &token[letters_start..];
    let letters_end = tail
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(tail.len());

    let rest = &tail[letters_end..];
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    Ok((&tail[..letters_end], &rest[..digits_end]))
}

fn parse_row(digits: &str) -> Result<u32> {
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => Err(ReferenceError::InvalidRow(digits.to_string())),
        Ok(row) => Ok(row),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::source::Grid;
    use proptest::prelude::*;

    fn sheet() -> Grid {
        Grid::from_rows([
            vec!["name", "email", "score"],
            vec!["Alice", "alice", "9"],
            vec!["Bob", "bob", "7"],
        ])
    }

    mod decode {
        use super::*;

        #[test]
        fn single_letters() {
            assert_eq!(decode_column_letters("A").unwrap(), 1);
            assert_eq!(decode_column_letters("Z").unwrap(), 26);
            for (i, c) in ('A'..='Z').enumerate() {
                assert_eq!(
                    decode_column_letters(&c.to_string()).unwrap(),
                    u32::try_from(i).unwrap() + 1
                );
            }
        }

        #[test]
        fn two_letters() {
            assert_eq!(decode_column_letters("AA").unwrap(), 27);
            assert_eq!(decode_column_letters("AB").unwrap(), 28);
            assert_eq!(decode_column_letters("AZ").unwrap(), 52);
            assert_eq!(decode_column_letters("BA").unwrap(), 53);
        }

        #[test]
        fn longer_runs() {
            assert_eq!(decode_column_letters("XFD").unwrap(), 16384);
            assert_eq!(decode_column_letters("ZZZZ").unwrap(), 475_254);
            assert_eq!(decode_column_letters("ZZZZZ").unwrap(), 12_356_630);
        }

        #[test]
        fn case_insensitive() {
            assert_eq!(
                decode_column_letters("a").unwrap(),
                decode_column_letters("A").unwrap()
            );
            assert_eq!(decode_column_letters("aB").unwrap(), 28);
        }

        #[test]
        fn rejects_bad_input() {
            assert!(matches!(
                decode_column_letters(""),
                Err(ReferenceError::InvalidColumn(_))
            ));
            assert!(matches!(
                decode_column_letters("A1"),
                Err(ReferenceError::InvalidColumn(_))
            ));
            assert!(matches!(
                decode_column_letters("É"),
                Err(ReferenceError::InvalidColumn(_))
            ));
        }

        #[test]
        fn rejects_overflow() {
            assert!(matches!(
                decode_column_letters("ZZZZZZZZ"),
                Err(ReferenceError::InvalidColumn(_))
            ));
        }
    }

    mod encode {
        use super::*;

        #[test]
        fn known_values() {
            assert_eq!(encode_column_letters(1).unwrap(), "A");
            assert_eq!(encode_column_letters(26).unwrap(), "Z");
            assert_eq!(encode_column_letters(27).unwrap(), "AA");
            assert_eq!(encode_column_letters(52).unwrap(), "AZ");
            assert_eq!(encode_column_letters(53).unwrap(), "BA");
            assert_eq!(encode_column_letters(16384).unwrap(), "XFD");
        }

        #[test]
        fn zero_is_invalid() {
            assert!(encode_column_letters(0).is_err());
        }
    }

    mod parse {
        use super::*;

        #[test]
        fn relative_uses_current_row() {
            let r = parse_cell_reference("B", 5).unwrap();
            assert_eq!(r.row, Some(5));
            assert_eq!(r.column, 2);
        }

        #[test]
        fn absolute_ignores_current_row() {
            let r = parse_cell_reference("B7", 5).unwrap();
            assert_eq!(r.row, Some(7));
        }

        #[test]
        fn lowercase_columns() {
            let r = parse_cell_reference("ab12", 1).unwrap();
            assert_eq!(r, CellReference::new(28, 12));
        }

        #[test]
        fn no_letters_is_malformed() {
            assert!(matches!(
                parse_cell_reference("12", 1),
                Err(ReferenceError::Malformed(_))
            ));
            assert!(matches!(
                parse_cell_reference("", 1),
                Err(ReferenceError::Malformed(_))
            ));
        }

        #[test]
        fn surrounding_text_is_ignored() {
            assert_eq!(
                parse_cell_reference("A1B", 5).unwrap(),
                CellReference::new(1, 1)
            );
            assert_eq!(
                parse_cell_reference("1A", 5).unwrap(),
                CellReference::new(1, 5)
            );
            assert_eq!(
                parse_cell_reference("12bc3x", 5).unwrap(),
                CellReference::new(55, 3)
            );
        }

        #[test]
        fn zero_row_is_invalid() {
            assert!(matches!(
                parse_cell_reference("A0", 1),
                Err(ReferenceError::InvalidRow(_))
            ));
        }

        #[test]
        fn huge_row_is_invalid() {
            assert!(matches!(
                parse_cell_reference("A99999999999", 1),
                Err(ReferenceError::InvalidRow(_))
            ));
        }

        #[test]
        fn from_str_keeps_relative() {
            let r: CellReference = "C".parse().unwrap();
            assert!(r.is_relative());
            assert_eq!(r.to_string(), "C");
            assert_eq!(r.anchored(4).to_string(), "C4");
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn reads_value() {
            let grid = sheet();
            assert_eq!(resolve_value(&CellReference::new(1, 2), &grid), "Alice");
            assert_eq!(resolve_value(&CellReference::new(3, 3), &grid), "7");
        }

        #[test]
        fn zero_coordinates_are_invalid() {
            let grid = sheet();
            assert_eq!(
                resolve_value(&CellReference::new(0, 1), &grid),
                INVALID_REFERENCE
            );
            assert_eq!(
                resolve_value(&CellReference::new(1, 0), &grid),
                INVALID_REFERENCE
            );
        }

        #[test]
        fn unanchored_is_invalid() {
            let grid = sheet();
            assert_eq!(
                resolve_value(&CellReference::relative(1), &grid),
                INVALID_REFERENCE
            );
        }

        #[test]
        fn beyond_bounds_is_invalid() {
            let grid = sheet();
            assert_eq!(
                resolve_value(&CellReference::new(4, 1), &grid),
                INVALID_REFERENCE
            );
            assert_eq!(
                resolve_value(&CellReference::new(1, 4), &grid),
                INVALID_REFERENCE
            );
        }

        #[test]
        fn no_active_sheet_is_invalid() {
            let none: Option<Grid> = None;
            assert_eq!(
                resolve_value(&CellReference::new(1, 1), &none),
                INVALID_REFERENCE
            );
        }

        #[test]
        fn lookup_reports_bounds() {
            let grid = sheet();
            let err = CellReference::new(9, 1).lookup(&grid).unwrap_err();
            assert_eq!(
                err,
                ReferenceError::OutOfRange {
                    reference: "I1".into(),
                    rows: 3,
                    columns: 3,
                }
            );
        }
    }

    proptest! {
        #[test]
        fn encode_decode_inverse(column in 1u32..=100_000) {
            let letters = encode_column_letters(column).unwrap();
            prop_assert_eq!(decode_column_letters(&letters).unwrap(), column);
        }

        #[test]
        fn decode_ignores_case(letters in "[A-Z]{1,5}") {
            prop_assert_eq!(
                decode_column_letters(&letters).unwrap(),
                decode_column_letters(&letters.to_lowercase()).unwrap()
            );
        }

        #[test]
        fn relative_reference_follows_row(letters in "[A-Za-z]{1,3}", row in 1u32..10_000) {
            let r = parse_cell_reference(&letters, row).unwrap();
            prop_assert_eq!(r.row, Some(row));
        }
    }
}
