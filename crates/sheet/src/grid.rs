use crate::cell::CellValue;

/// A read-only snapshot of a sheet's display values (row-major).
///
/// Rows and columns are addressed 1-based, the way the sheet itself is.
/// Cells outside the captured range read as the empty string, which is what
/// a blank cell displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataGrid {
    rows: Vec<Vec<String>>,
}

impl DataGrid {
    /// Create a grid from any string-like values
    #[must_use]
    pub fn from_data<T: Into<String>>(data: Vec<Vec<T>>) -> Self {
        Self {
            rows: data
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Capture the display strings of typed cells
    #[must_use]
    pub fn from_cells(cells: &[Vec<CellValue>]) -> Self {
        Self {
            rows: cells
                .iter()
                .map(|row| row.iter().map(CellValue::as_str).collect())
                .collect(),
        }
    }

    /// Number of the last populated row
    #[must_use]
    pub fn last_row(&self) -> usize {
        self.rows.len()
    }

    /// Number of the last populated column across all rows
    #[must_use]
    pub fn last_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Read the display value at a 1-based (row, col)
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        if row == 0 || col == 0 {
            return "";
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .map_or("", String::as_str)
    }

    /// Borrow a 1-based row
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[String]> {
        if row == 0 {
            return None;
        }
        self.rows.get(row - 1).map(Vec::as_slice)
    }
}
