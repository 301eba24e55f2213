//! `#A1#` template scanning and substitution.
//!
//! A reference token is `#`, a run of ASCII letters and digits (possibly
//! empty), and a closing `#`. Tokens are matched left to right without
//! overlap; a closing `#` is never reused as the next opening one. A `#`
//! that cannot be closed this way is ordinary text.

use crate::INVALID_REFERENCE;
use crate::error::ReferenceError;
use crate::reference::parse_cell_reference;
use crate::source::CellSource;

const DELIMITER: u8 = b'#';

/// One piece of a scanned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied verbatim.
    Literal(&'a str),
    /// Text between two delimiters, without the delimiters.
    Reference(&'a str),
}

/// A template scanned once into literal and reference segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

/// A token that would render as [`INVALID_REFERENCE`] for some row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidReference {
    /// The token text without delimiters.
    pub token: String,
    /// Why it did not resolve.
    pub error: ReferenceError,
}

impl std::fmt::Display for InvalidReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}# ({})", self.token, self.error.reason())
    }
}

impl<'a> Template<'a> {
    /// Scans `text` in a single left-to-right pass.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut pos = 0;

        while let Some(offset) = memchr_delimiter(&bytes[pos..]) {
            let open = pos + offset;
            let body_start = open + 1;
            let body_len = bytes[body_start..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric())
                .count();
            let close = body_start + body_len;

            if bytes.get(close) == Some(&DELIMITER) {
                if open > literal_start {
                    segments.push(Segment::Literal(&text[literal_start..open]));
                }
                segments.push(Segment::Reference(&text[body_start..close]));
                pos = close + 1;
                literal_start = pos;
            } else {
                // Not closed here: the `#` is text, but the scan resumes
                // right after it so a later `#` may still open a token.
                pos = body_start;
            }
        }

        if literal_start < text.len() {
            segments.push(Segment::Literal(&text[literal_start..]));
        }

        Self { segments }
    }

    /// Scanned segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Reference tokens in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reference(token) => Some(*token),
            Segment::Literal(_) => None,
        })
    }

    /// Returns true if the template contains no reference tokens.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.references().next().is_none()
    }

    /// Substitutes every reference for `row`.
    ///
    /// Unresolvable tokens become [`INVALID_REFERENCE`]; rendering never
    /// fails.
    #[must_use]
    pub fn render<S: CellSource + ?Sized>(&self, row: u32, source: &S) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Reference(token) => match resolve_token(token, row, source) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(INVALID_REFERENCE),
                },
            }
        }
        out
    }

    /// Lists the tokens that do not resolve for `row`, in order.
    #[must_use]
    pub fn invalid_references<S: CellSource + ?Sized>(
        &self,
        row: u32,
        source: &S,
    ) -> Vec<InvalidReference> {
        self.references()
            .filter_map(|token| {
                resolve_token(token, row, source)
                    .err()
                    .map(|error| InvalidReference {
                        token: token.to_string(),
                        error,
                    })
            })
            .collect()
    }
}

/// Substitutes all `#...#` references in `template` for `row`.
///
/// Text between tokens is copied verbatim. Any token that fails to parse or
/// lies outside the source becomes [`INVALID_REFERENCE`]. Never fails.
#[must_use]
pub fn substitute<S: CellSource + ?Sized>(template: &str, row: u32, source: &S) -> String {
    Template::parse(template).render(row, source)
}

fn resolve_token<S: CellSource + ?Sized>(
    token: &str,
    row: u32,
    source: &S,
) -> Result<String, ReferenceError> {
    parse_cell_reference(token, row)?.lookup(source)
}

fn memchr_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == DELIMITER)
}
