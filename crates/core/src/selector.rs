//! Column selectors: bind a merge field to a literal or to a row column.

use crate::error::{MergeError, MergeResult};
use rowmerge_sheet::{column_letters_to_number, DataGrid, HeaderMap, SheetError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a selector finds its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Specify,
    ByHeader,
    ByLetter,
    ByNumber,
}

impl SelectorKind {
    /// Label shown by configuration UIs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SelectorKind::Specify => "Specify",
            SelectorKind::ByHeader => "Select Column Header",
            SelectorKind::ByLetter => "Select Column Letter",
            SelectorKind::ByNumber => "Select Column Number",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SelectorKind {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Specify" => Ok(SelectorKind::Specify),
            "ByHeader" | "Select Column Header" => Ok(SelectorKind::ByHeader),
            "ByLetter" | "Select Column Letter" => Ok(SelectorKind::ByLetter),
            "ByNumber" | "Select Column Number" => Ok(SelectorKind::ByNumber),
            other => Err(MergeError::InvalidSelectorType(other.to_string())),
        }
    }
}

/// A merge field binding.
///
/// Deserializing checks letter and number inputs the same way
/// [`ColumnSelector::validate`] does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "input", try_from = "SelectorRecord")]
pub enum ColumnSelector {
    /// Literal value, independent of the row.
    Specify(String),
    /// Column named in the header row.
    ByHeader(String),
    /// Column given by its letters (A, B, ..., AA).
    ByLetter(String),
    /// Column given by its 1-based number.
    ByNumber(usize),
}

/// Unchecked wire form of [`ColumnSelector`].
#[derive(Deserialize)]
#[serde(tag = "type", content = "input")]
enum SelectorRecord {
    Specify(String),
    #[serde(alias = "Select Column Header")]
    ByHeader(String),
    #[serde(alias = "Select Column Letter")]
    ByLetter(String),
    #[serde(alias = "Select Column Number")]
    ByNumber(usize),
}

impl TryFrom<SelectorRecord> for ColumnSelector {
    type Error = MergeError;

    fn try_from(record: SelectorRecord) -> Result<Self, Self::Error> {
        let selector = match record {
            SelectorRecord::Specify(value) => ColumnSelector::Specify(value),
            SelectorRecord::ByHeader(name) => ColumnSelector::ByHeader(name),
            SelectorRecord::ByLetter(letters) => ColumnSelector::ByLetter(letters),
            SelectorRecord::ByNumber(number) => ColumnSelector::ByNumber(number),
        };
        selector.validate()?;
        Ok(selector)
    }
}

impl ColumnSelector {
    /// Build a selector from a kind string and a freeform input, as
    /// configuration forms submit them.
    pub fn from_parts(kind: &str, input: &str) -> MergeResult<Self> {
        let kind: SelectorKind = kind.parse()?;
        Ok(match kind {
            SelectorKind::Specify => ColumnSelector::Specify(input.to_string()),
            SelectorKind::ByHeader => ColumnSelector::ByHeader(input.to_string()),
            SelectorKind::ByLetter => {
                column_letters_to_number(input)?;
                ColumnSelector::ByLetter(input.trim().to_uppercase())
            }
            SelectorKind::ByNumber => {
                let number = input
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| MergeError::InvalidSelectorInput {
                        kind: SelectorKind::ByNumber.label(),
                        input: input.to_string(),
                    })?;
                ColumnSelector::ByNumber(number)
            }
        })
    }

    /// Check that a letter or number selector names a real column. Literal
    /// and header selectors are always well formed; a header is only known
    /// once a sheet is bound.
    pub fn validate(&self) -> MergeResult<()> {
        match self {
            ColumnSelector::Specify(_) | ColumnSelector::ByHeader(_) => Ok(()),
            ColumnSelector::ByLetter(letters) => {
                column_letters_to_number(letters)?;
                Ok(())
            }
            ColumnSelector::ByNumber(0) => Err(MergeError::InvalidSelectorInput {
                kind: SelectorKind::ByNumber.label(),
                input: "0".to_string(),
            }),
            ColumnSelector::ByNumber(_) => Ok(()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SelectorKind {
        match self {
            ColumnSelector::Specify(_) => SelectorKind::Specify,
            ColumnSelector::ByHeader(_) => SelectorKind::ByHeader,
            ColumnSelector::ByLetter(_) => SelectorKind::ByLetter,
            ColumnSelector::ByNumber(_) => SelectorKind::ByNumber,
        }
    }

    /// Resolve the 1-based column this selector points at.
    ///
    /// Literal selectors have no column and fail with
    /// [`MergeError::InvalidOperation`].
    pub fn resolve_column_number(&self, headers: &HeaderMap) -> MergeResult<usize> {
        match self {
            ColumnSelector::Specify(_) => Err(MergeError::InvalidOperation(format!(
                "column selector type {} has no column",
                SelectorKind::Specify
            ))),
            ColumnSelector::ByHeader(name) => Ok(headers.position_of(name)?),
            ColumnSelector::ByLetter(letters) => Ok(column_letters_to_number(letters)?),
            ColumnSelector::ByNumber(0) => Err(SheetError::InvalidColumnNumber(0).into()),
            ColumnSelector::ByNumber(number) => Ok(*number),
        }
    }

    /// Resolve the value for a 1-based sheet row of `grid`.
    pub fn resolve_value(
        &self,
        row: usize,
        grid: &DataGrid,
        headers: &HeaderMap,
    ) -> MergeResult<String> {
        match self {
            ColumnSelector::Specify(value) => Ok(value.clone()),
            _ => {
                let col = self.resolve_column_number(headers)?;
                Ok(grid.cell(row, col).to_string())
            }
        }
    }
}

/// A selector that can be switched off.
///
/// Callers check [`SwitchedSelector::active`] before resolving; a disabled
/// selector is never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchedSelector {
    enabled: bool,
    selector: Option<ColumnSelector>,
}

impl SwitchedSelector {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enabled(selector: ColumnSelector) -> Self {
        Self {
            enabled: true,
            selector: Some(selector),
        }
    }

    /// `None` switches the selector off.
    #[must_use]
    pub fn from_option(selector: Option<ColumnSelector>) -> Self {
        selector.map_or_else(Self::disabled, Self::enabled)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.active().is_some()
    }

    /// The selector, if switched on.
    #[must_use]
    pub fn active(&self) -> Option<&ColumnSelector> {
        if self.enabled {
            self.selector.as_ref()
        } else {
            None
        }
    }
}
