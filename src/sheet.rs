use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::normalize::digit_count;

/// Minimum number of non-empty cells for a row to be considered a header.
pub const HEADER_MIN_CELLS: usize = 3;

/// Share of digit characters above which a text cell counts as a number.
pub const NUMERIC_TEXT_RATIO: f64 = 0.7;

/// One raw spreadsheet cell, before any header is known.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// True for missing values only. A zero-length string reads as missing,
    /// but whitespace-only text is a value.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    /// Display form used for header labels and text fields.
    ///
    /// Integral numbers drop the fractional part so that an ID typed as a
    /// number (`12345.0`) reads back as `12345`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) if n.is_nan() => String::new(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Numbers and booleans always count; text counts when it is all digits
    /// or mostly digits.
    fn is_numeric_like(&self) -> bool {
        match self {
            Cell::Number(n) => !n.is_nan(),
            Cell::Bool(_) => true,
            Cell::Text(s) => {
                let t = s.trim();
                let total = t.chars().count();
                if total == 0 {
                    return false;
                }
                let digits = digit_count(s);
                digit_count(t) == total || digits as f64 > total as f64 * NUMERIC_TEXT_RATIO
            }
            Cell::Empty => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// A rectangular-ish grid of raw cells. Rows may have different lengths;
/// missing trailing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }
}

/// Read the first worksheet of an Excel/ODS workbook into a [`Grid`].
///
/// Row indexes are absolute: leading blank rows and columns that calamine
/// trims from the used range are padded back in.
pub fn read_workbook(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::Unreadable(format!("{}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Unreadable(format!("{}: no worksheets", path.display())))?
        .map_err(|e| ImportError::Unreadable(format!("{}: {e}", path.display())))?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for raw in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(raw.iter().map(Cell::from));
        rows.push(row);
    }

    let (height, width) = range.get_size();
    info!(path = %path.display(), height, width, "workbook read");
    Ok(Grid::new(rows))
}

/// Find the first row that looks like column titles rather than data.
///
/// A row qualifies when it has at least [`HEADER_MIN_CELLS`] non-empty cells
/// and none of them is numeric-like.
pub fn locate_header_row(grid: &Grid) -> Option<usize> {
    for (idx, row) in grid.rows.iter().enumerate() {
        let non_empty = row.iter().filter(|c| !c.is_empty()).count();
        if non_empty < HEADER_MIN_CELLS {
            debug!(row = idx, non_empty, "too few cells for a header");
            continue;
        }
        if let Some(cell) = row.iter().filter(|c| !c.is_empty()).find(|c| c.is_numeric_like()) {
            debug!(row = idx, ?cell, "row contains numbers");
            continue;
        }
        info!(row = idx, "header row found");
        return Some(idx);
    }
    info!("no valid header row found");
    None
}

/// Column labels taken from the header row; blank cells become `Unnamed_{i}`.
pub fn header_labels(grid: &Grid, header_row: usize) -> Vec<String> {
    let Some(row) = grid.rows.get(header_row) else {
        return Vec::new();
    };
    let width = grid.rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|i| {
            let label = row.get(i).map(Cell::as_text).unwrap_or_default();
            if label.is_empty() {
                format!("Unnamed_{i}")
            } else {
                label
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    #[test]
    fn header_after_title_rows() {
        let grid = Grid::new(vec![
            vec![t("Dean's List"), Cell::Empty, Cell::Empty],
            vec![t("Fall"), Cell::Number(2024.0), t("Faculty of Business")],
            vec![t("Student Name"), t("Student ID"), t("GPA")],
            vec![t("Ahmad Ali"), t("12345"), Cell::Number(3.7)],
        ]);
        assert_eq!(locate_header_row(&grid), Some(2));
    }

    #[test]
    fn all_numeric_grid_has_no_header() {
        let grid = Grid::new(vec![
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
            vec![t("4"), t("5"), t("6")],
        ]);
        assert_eq!(locate_header_row(&grid), None);
    }

    #[test]
    fn mostly_digit_text_counts_as_numeric() {
        // 8 digits out of 9 characters.
        let grid = Grid::new(vec![
            vec![t("Name"), t("ID"), t("2024-0001")],
            vec![t("Name"), t("ID"), t("Major")],
        ]);
        assert_eq!(locate_header_row(&grid), Some(1));

        // Section codes below the threshold stay text.
        let grid = Grid::new(vec![vec![t("Name"), t("ID"), t("BUS101")]]);
        assert_eq!(locate_header_row(&grid), Some(0));
    }

    #[test]
    fn arabic_indic_digits_count_as_digits() {
        let grid = Grid::new(vec![
            vec![t("الاسم"), t("الرقم"), t("١٢٣٤٥")],
            vec![t("اسم الطالب"), t("رقم الطالب"), t("المعدل")],
        ]);
        assert_eq!(locate_header_row(&grid), Some(1));
    }

    #[test]
    fn whitespace_cells_count_as_non_empty() {
        let grid = Grid::new(vec![
            vec![t("Student Name"), t("  "), t("Student ID")],
            vec![t("Ahmad"), t("x"), t("12345")],
        ]);
        assert_eq!(locate_header_row(&grid), Some(0));
        assert_eq!(header_labels(&grid, 0), vec!["Student Name", "Unnamed_1", "Student ID"]);

        // A zero-length string is still a missing value.
        let grid = Grid::new(vec![
            vec![t("Name"), t(""), t("ID")],
            vec![t("Name"), t("ID"), t("GPA"), Cell::Empty],
        ]);
        assert_eq!(locate_header_row(&grid), Some(1));
    }

    #[test]
    fn boolean_cells_count_as_numeric() {
        let grid = Grid::new(vec![
            vec![t("Name"), t("ID"), Cell::Bool(true)],
            vec![t("Student Name"), t("Student ID"), t("GPA")],
        ]);
        assert_eq!(locate_header_row(&grid), Some(1));
    }

    #[test]
    fn non_decimal_numerals_are_not_digits() {
        // Vulgar fractions and roman numerals are numeric but not decimal digits.
        let grid = Grid::new(vec![vec![t("Name"), t("½"), t("Ⅻ")]]);
        assert_eq!(locate_header_row(&grid), Some(0));
    }

    #[test]
    fn labels_fill_blanks_and_pad_to_widest_row() {
        let grid = Grid::new(vec![
            vec![t(" Name "), Cell::Empty, t("GPA")],
            vec![t("a"), t("b"), t("c"), t("d")],
        ]);
        assert_eq!(
            header_labels(&grid, 0),
            vec!["Name", "Unnamed_1", "GPA", "Unnamed_3"]
        );
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(12345.0).as_text(), "12345");
        assert_eq!(Cell::Number(3.75).as_text(), "3.75");
        assert_eq!(Cell::Number(f64::NAN).as_text(), "");
    }

    #[test]
    fn grid_deserializes_from_json_rows() {
        let grid: Grid =
            serde_json::from_value(serde_json::json!([["Name", null, 3.5, true]])).unwrap();
        assert_eq!(
            grid.rows[0],
            vec![t("Name"), Cell::Empty, Cell::Number(3.5), Cell::Bool(true)]
        );
    }
}
