//! Grid primitives for rowmerge
//!
//! Provides the small set of spreadsheet concepts the merge engine is built
//! on: typed cell values, column letter arithmetic, header maps and read-only
//! display-value snapshots.
//!
//! # Examples
//!
//! ```
//! use rowmerge_sheet::{column_letters_to_number, column_number_to_letters, DataGrid, HeaderMap};
//!
//! let grid = DataGrid::from_data(vec![
//!     vec!["Name", "Email"],
//!     vec!["Jane", "jane@x.com"],
//! ]);
//! let headers = HeaderMap::from_row(grid.row(1).unwrap()).unwrap();
//!
//! let col = headers.position_of("Email").unwrap();
//! assert_eq!(grid.cell(2, col), "jane@x.com");
//! assert_eq!(column_number_to_letters(col), "B");
//! assert_eq!(column_letters_to_number("B").unwrap(), col);
//! ```

mod a1_notation;
mod cell;
mod error;
mod grid;
mod header;

/// Re-export column addressing helpers.
pub use a1_notation::{column_letters_to_number, column_number_to_letters, to_a1_notation, CellPos};
/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export the display-value snapshot.
pub use grid::DataGrid;
/// Re-export header map types.
pub use header::{HeaderColumn, HeaderMap};
