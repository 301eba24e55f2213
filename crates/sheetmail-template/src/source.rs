//! Tabular data sources the resolver reads from.

use crate::reference::encode_column_letters;

/// A read-only grid of cell values addressed by 1-based row and column.
///
/// The resolver never mutates a source. A source with no active sheet
/// reports zero rows and zero columns, which makes every reference out of
/// range.
pub trait CellSource {
    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Display name of a column header. Defaults to the column letters.
    fn header_name(&self, column: usize) -> String {
        u32::try_from(column)
            .ok()
            .and_then(|c| encode_column_letters(c).ok())
            .unwrap_or_default()
    }

    /// Literal stored value at `(row, column)`, both 1-based.
    ///
    /// Implementations return an empty string for coordinates they do not
    /// hold; callers check bounds first.
    fn value_at(&self, row: usize, column: usize) -> String;
}

impl<S: CellSource + ?Sized> CellSource for &S {
    fn row_count(&self) -> usize {
        (**self).row_count()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }

    fn header_name(&self, column: usize) -> String {
        (**self).header_name(column)
    }

    fn value_at(&self, row: usize, column: usize) -> String {
        (**self).value_at(row, column)
    }
}

impl<S: CellSource> CellSource for Option<S> {
    fn row_count(&self) -> usize {
        self.as_ref().map_or(0, CellSource::row_count)
    }

    fn column_count(&self) -> usize {
        self.as_ref().map_or(0, CellSource::column_count)
    }

    fn header_name(&self, column: usize) -> String {
        self.as_ref()
            .map_or_else(String::new, |s| s.header_name(column))
    }

    fn value_at(&self, row: usize, column: usize) -> String {
        self.as_ref()
            .map_or_else(String::new, |s| s.value_at(row, column))
    }
}

/// In-memory rectangular grid of strings.
///
/// Rows may be ragged on input; the column count is the widest row and
/// missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    columns: usize,
}

impl Grid {
    /// Creates an empty grid.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: Vec::new(),
            columns: 0,
        }
    }

    /// Builds a grid from rows of cells.
    #[must_use]
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut grid = Self::new();
        for row in rows {
            grid.push_row(row.into_iter().map(Into::into).collect());
        }
        grid
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.columns = self.columns.max(row.len());
        self.rows.push(row);
    }

    /// Sets a cell, growing the grid as needed. Coordinates are 1-based;
    /// zero coordinates are ignored.
    pub fn set(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if row == 0 || column == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize_with(column, String::new);
        }
        cells[column - 1] = value.into();
        self.columns = self.columns.max(column);
    }

    /// Returns true if the grid holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates rows as slices of cells.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

impl CellSource for Grid {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.columns
    }

    fn value_at(&self, row: usize, column: usize) -> String {
        row.checked_sub(1)
            .zip(column.checked_sub(1))
            .and_then(|(r, c)| self.rows.get(r)?.get(c))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows() {
        let grid = Grid::from_rows([vec!["a", "b", "c"], vec!["d"]]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.value_at(2, 1), "d");
        assert_eq!(grid.value_at(2, 3), "");
    }

    #[test]
    fn test_value_at_out_of_bounds() {
        let grid = Grid::from_rows([vec!["a"]]);
        assert_eq!(grid.value_at(0, 1), "");
        assert_eq!(grid.value_at(1, 0), "");
        assert_eq!(grid.value_at(5, 5), "");
    }

    #[test]
    fn test_set_grows() {
        let mut grid = Grid::new();
        grid.set(3, 2, "x");
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.value_at(3, 2), "x");
        assert_eq!(grid.value_at(1, 1), "");
        grid.set(0, 1, "ignored");
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn test_header_name_defaults_to_letters() {
        let grid = Grid::new();
        assert_eq!(grid.header_name(1), "A");
        assert_eq!(grid.header_name(28), "AB");
        assert_eq!(grid.header_name(0), "");
    }

    #[test]
    fn test_missing_source_has_no_bounds() {
        let source: Option<Grid> = None;
        assert_eq!(source.row_count(), 0);
        assert_eq!(source.column_count(), 0);
        assert_eq!(source.value_at(1, 1), "");
    }
}
