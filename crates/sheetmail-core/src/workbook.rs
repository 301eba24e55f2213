//! Spreadsheet workbooks as cell sources.
//!
//! Every worksheet is read once into a [`Grid`] of display strings. The
//! workbook then acts as a [`CellSource`] for whichever sheet is active.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, TimeDelta};
use sheetmail_template::{CellSource, Grid};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One worksheet, already materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Sheet name as shown in the spreadsheet application.
    pub name: String,
    /// Cell text, addressed like the sheet itself (A1 = row 1, column 1).
    pub grid: Grid,
}

/// All sheets of a spreadsheet file plus the active-sheet selection.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    active: Option<usize>,
}

impl Workbook {
    /// Opens an `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods` file.
    ///
    /// The first sheet becomes active.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a sheet cannot be
    /// read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let grid = grid_from_range(&range);
            debug!(
                sheet = %name,
                rows = grid.row_count(),
                columns = grid.column_count(),
                "Loaded worksheet"
            );
            sheets.push(Sheet { name, grid });
        }

        info!(path = %path.display(), sheets = sheets.len(), "Opened workbook");
        Ok(Self::from_sheets(sheets))
    }

    /// Builds a workbook from sheets already in memory. The first one
    /// becomes active.
    #[must_use]
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        let active = if sheets.is_empty() { None } else { Some(0) };
        Self { sheets, active }
    }

    /// Returns the sheet names in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// Returns all sheets.
    #[must_use]
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Makes the sheet called `name` active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SheetNotFound`] if there is no such sheet.
    pub fn select(&mut self, name: &str) -> Result<&Sheet> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        self.select_index(index)
    }

    /// Makes the sheet at `index` (0-based) active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SheetNotFound`] if the index is out of bounds.
    pub fn select_index(&mut self, index: usize) -> Result<&Sheet> {
        let sheet = self
            .sheets
            .get(index)
            .ok_or_else(|| Error::SheetNotFound(format!("#{}", index + 1)))?;
        self.active = Some(index);
        Ok(sheet)
    }

    /// Clears the selection; the workbook then reads as an empty source.
    pub const fn deselect(&mut self) {
        self.active = None;
    }

    /// Returns the active sheet, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Sheet> {
        self.active.and_then(|i| self.sheets.get(i))
    }
}

impl CellSource for Workbook {
    fn row_count(&self) -> usize {
        self.active().map(|s| &s.grid).row_count()
    }

    fn column_count(&self) -> usize {
        self.active().map(|s| &s.grid).column_count()
    }

    fn header_name(&self, column: usize) -> String {
        self.active().map(|s| &s.grid).header_name(column)
    }

    fn value_at(&self, row: usize, column: usize) -> String {
        self.active().map(|s| &s.grid).value_at(row, column)
    }
}

/// Copies a calamine range into a grid, keeping absolute coordinates.
///
/// calamine ranges start at the first used cell; the offset is restored so
/// `B3` in the spreadsheet is still row 3, column 2 here.
#[must_use]
pub fn grid_from_range(range: &Range<Data>) -> Grid {
    let mut grid = Grid::new();
    let Some((start_row, start_col)) = range.start() else {
        return grid;
    };

    for (r, row) in range.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let text = cell_text(cell);
            if text.is_empty() {
                continue;
            }
            grid.set(start_row as usize + r + 1, start_col as usize + c + 1, text);
        }
    }
    grid
}

/// Display text of one cell. Formulas are not evaluated; the cached
/// value stored in the file is used.
#[must_use]
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => e.to_string(),
        Data::DateTime(dt) if dt.is_duration() => dt.as_f64().to_string(),
        Data::DateTime(dt) => excel_date_text(dt.as_f64()),
    }
}

/// Formats an Excel serial date (1900 system) as ISO 8601.
#[allow(clippy::cast_possible_truncation)]
fn excel_date_text(serial: f64) -> String {
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;

    let datetime = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
        .zip(TimeDelta::try_days(days))
        .and_then(|(epoch, d)| epoch.checked_add_signed(d))
        .zip(TimeDelta::try_seconds(seconds))
        .and_then(|(date, s)| date.checked_add_signed(s));

    match datetime {
        Some(dt) if seconds == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}
