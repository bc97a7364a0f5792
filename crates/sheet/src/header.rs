//! Header row indexing.
//!
//! A [`HeaderMap`] maps each non-blank header cell of a designated header row
//! to its 1-based column number and column letters.

use crate::a1_notation::column_number_to_letters;
use crate::error::{Result, SheetError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Location of a named column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderColumn {
    /// 1-based column number
    pub position: usize,
    /// Spreadsheet-style column letters for `position`
    pub letter: String,
}

/// Header name -> column lookup, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap {
    columns: IndexMap<String, HeaderColumn>,
}

impl HeaderMap {
    /// Build a header map from the values of a header row.
    ///
    /// Blank cells are not indexed. Two cells carrying the same name fail with
    /// [`SheetError::DuplicateHeader`].
    pub fn from_row<T: AsRef<str>>(row: &[T]) -> Result<Self> {
        let mut columns: IndexMap<String, HeaderColumn> = IndexMap::new();

        for (index, cell) in row.iter().enumerate() {
            let name = cell.as_ref();
            if name.trim().is_empty() {
                continue;
            }

            let position = index + 1;
            if let Some(existing) = columns.get(name) {
                return Err(SheetError::DuplicateHeader {
                    name: name.to_string(),
                    first: existing.position,
                    second: position,
                });
            }

            columns.insert(
                name.to_string(),
                HeaderColumn {
                    position,
                    letter: column_number_to_letters(position),
                },
            );
        }

        Ok(Self { columns })
    }

    /// Look up a column by header name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderColumn> {
        self.columns.get(name)
    }

    /// Look up a column number by header name
    pub fn position_of(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .map(|column| column.position)
            .ok_or_else(|| SheetError::UnknownHeader {
                name: name.to_string(),
            })
    }

    /// Iterate over `(name, column)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderColumn)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Number of indexed headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if no header is indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
