//! Starter templates built from column choices.

use std::fmt::Write;

use sheetmail_template::{ReferenceError, decode_column_letters, encode_column_letters};

/// Options for [`TemplateGenerator::generate`]. Columns are given as
/// letters (`"B"`), rows as 1-based numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateGenerator {
    /// Column with the recipient's name; a generic salutation otherwise.
    pub name_column: Option<String>,
    /// Column with the final grade.
    pub final_grade_column: Option<String>,
    /// Course code mentioned in the final-grade sentence.
    pub course_code: Option<String>,
    /// First and last column (inclusive) of the per-item breakdown.
    pub columns: Option<(String, String)>,
    /// Row holding the column titles.
    pub header_row: Option<u32>,
    /// Row holding the maximum points of each column.
    pub max_points_row: Option<u32>,
    /// Name used in the sign-off.
    pub sender_name: String,
}

impl TemplateGenerator {
    /// Builds the template text.
    ///
    /// A breakdown whose first column lies after its last column is left
    /// out.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::InvalidColumn`] if any column is not a
    /// letter run.
    pub fn generate(&self) -> Result<String, ReferenceError> {
        let mut txt = String::from("Dear ");
        match &self.name_column {
            Some(col) => {
                let _ = write!(txt, "#{}#,\n\n", column(col)?);
            }
            None => txt.push_str("Student,\n\n"),
        }

        if let Some(col) = &self.final_grade_column {
            let col = column(col)?;
            txt.push_str("Your grade ");
            if let Some(code) = self.course_code.as_deref().filter(|c| !c.is_empty()) {
                let _ = write!(txt, "for {code} ");
            }
            let _ = write!(txt, "is #{col}#");
            if let Some(max) = self.max_points_row {
                let _ = write!(txt, "/#{col}{max}#");
            }
            txt.push_str(".\n\n");
        }

        if let Some((first, last)) = &self.columns {
            let first = decode_column_letters(first.trim())?;
            let last = decode_column_letters(last.trim())?;
            if first <= last {
                // Labelled by the max-points row, not the header row.
                txt.push_str(if self.max_points_row.is_some() {
                    "Breakdown (points/total):\n"
                } else {
                    "Breakdown:\n"
                });
                for index in first..=last {
                    let col = encode_column_letters(index)?;
                    if let Some(header) = self.header_row {
                        let _ = write!(txt, "#{col}{header}#: ");
                    }
                    let _ = write!(txt, "#{col}#");
                    if let Some(max) = self.max_points_row {
                        let _ = write!(txt, "/#{col}{max}#");
                    }
                    txt.push('\n');
                }
            }
        }

        let _ = write!(txt, "\nKind regards,\n\n{}\n", self.sender_name);
        Ok(txt)
    }
}

/// Normalises a column to upper-case letters, rejecting anything else.
fn column(letters: &str) -> Result<String, ReferenceError> {
    encode_column_letters(decode_column_letters(letters.trim())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_template() {
        let generator = TemplateGenerator {
            sender_name: "Dr. Jansen".into(),
            ..TemplateGenerator::default()
        };
        assert_eq!(
            generator.generate().unwrap(),
            "Dear Student,\n\n\nKind regards,\n\nDr. Jansen\n"
        );
    }

    #[test]
    fn test_full_template() {
        let generator = TemplateGenerator {
            name_column: Some("a".into()),
            final_grade_column: Some("F".into()),
            course_code: Some("MA101".into()),
            columns: Some(("C".into(), "D".into())),
            header_row: Some(1),
            max_points_row: Some(2),
            sender_name: "Dr. Jansen".into(),
        };
        assert_eq!(
            generator.generate().unwrap(),
            "Dear #A#,\n\n\
             Your grade for MA101 is #F#/#F2#.\n\n\
             Breakdown (points/total):\n\
             #C1#: #C#/#C2#\n\
             #D1#: #D#/#D2#\n\
             \nKind regards,\n\nDr. Jansen\n"
        );
    }

    #[test]
    fn test_reversed_span_is_skipped() {
        let generator = TemplateGenerator {
            columns: Some(("D".into(), "B".into())),
            ..TemplateGenerator::default()
        };
        assert!(!generator.generate().unwrap().contains("Breakdown"));
    }

    #[test]
    fn test_plain_breakdown() {
        let generator = TemplateGenerator {
            final_grade_column: Some("E".into()),
            columns: Some(("B".into(), "B".into())),
            ..TemplateGenerator::default()
        };
        let txt = generator.generate().unwrap();
        assert!(txt.contains("Your grade is #E#.\n\n"));
        assert!(txt.contains("Breakdown:\n#B#\n"));
    }

    #[test]
    fn test_breakdown_label_follows_max_points_row() {
        let headers_only = TemplateGenerator {
            columns: Some(("B".into(), "B".into())),
            header_row: Some(1),
            ..TemplateGenerator::default()
        };
        assert!(headers_only.generate().unwrap().contains("Breakdown:\n#B1#: #B#\n"));

        let max_only = TemplateGenerator {
            columns: Some(("B".into(), "B".into())),
            max_points_row: Some(2),
            ..TemplateGenerator::default()
        };
        assert!(max_only.generate().unwrap().contains("Breakdown (points/total):\n#B#/#B2#\n"));
    }

    #[test]
    fn test_bad_column() {
        let generator = TemplateGenerator {
            name_column: Some("A1".into()),
            ..TemplateGenerator::default()
        };
        assert!(matches!(
            generator.generate(),
            Err(ReferenceError::InvalidColumn(_))
        ));
    }
}
