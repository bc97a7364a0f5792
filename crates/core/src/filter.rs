//! Row filters.
//!
//! A [`RowFilter`] is configured against a column selector; before a run every
//! filter is compiled into a [`RuntimeRowFilter`] with its column resolved once,
//! then [`passes`] evaluates the whole set against a row of the snapshot.

use crate::config::MERGE_STATUS_HEADER;
use crate::error::{MergeError, MergeResult};
use crate::selector::ColumnSelector;
use rowmerge_sheet::{DataGrid, HeaderMap};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison applied to a cell's display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    #[serde(alias = "Equal To")]
    Equal,
    #[serde(alias = "Not Equal To")]
    NotEqual,
    #[serde(alias = "Contains")]
    Contains,
    #[serde(alias = "Does Not Contain")]
    NotContains,
    #[serde(alias = "Is Empty")]
    IsEmpty,
    #[serde(alias = "Is Not Empty")]
    IsNotEmpty,
    #[serde(alias = "Less Than")]
    LessThan,
    #[serde(alias = "Greater Than")]
    GreaterThan,
}

impl FilterOperator {
    /// Label shown by configuration UIs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FilterOperator::Equal => "Equal To",
            FilterOperator::NotEqual => "Not Equal To",
            FilterOperator::Contains => "Contains",
            FilterOperator::NotContains => "Does Not Contain",
            FilterOperator::IsEmpty => "Is Empty",
            FilterOperator::IsNotEmpty => "Is Not Empty",
            FilterOperator::LessThan => "Less Than",
            FilterOperator::GreaterThan => "Greater Than",
        }
    }

    /// Apply the operator. Matching is case-sensitive.
    #[must_use]
    pub fn test(self, cell: &str, compare: &str) -> bool {
        match self {
            FilterOperator::Equal => cell == compare,
            FilterOperator::NotEqual => cell != compare,
            FilterOperator::Contains => cell.contains(compare),
            FilterOperator::NotContains => !cell.contains(compare),
            FilterOperator::IsEmpty => cell.trim().is_empty(),
            FilterOperator::IsNotEmpty => !cell.trim().is_empty(),
            FilterOperator::LessThan => compare_values(cell, compare) == Ordering::Less,
            FilterOperator::GreaterThan => compare_values(cell, compare) == Ordering::Greater,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterOperator {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "EQUAL" | "Equal To" => Ok(FilterOperator::Equal),
            "NOT_EQUAL" | "Not Equal To" => Ok(FilterOperator::NotEqual),
            "CONTAINS" | "Contains" => Ok(FilterOperator::Contains),
            "NOT_CONTAINS" | "Does Not Contain" => Ok(FilterOperator::NotContains),
            "IS_EMPTY" | "Is Empty" => Ok(FilterOperator::IsEmpty),
            "IS_NOT_EMPTY" | "Is Not Empty" => Ok(FilterOperator::IsNotEmpty),
            "LESS_THAN" | "Less Than" => Ok(FilterOperator::LessThan),
            "GREATER_THAN" | "Greater Than" => Ok(FilterOperator::GreaterThan),
            other => Err(MergeError::InvalidOperator(other.to_string())),
        }
    }
}

/// Finite numbers compare numerically when both sides parse, otherwise
/// lexically. `NaN` and `inf` are text.
fn compare_values(left: &str, right: &str) -> Ordering {
    match (finite_number(left), finite_number(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn finite_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A configured row filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub selector: ColumnSelector,
    pub operator: FilterOperator,
    #[serde(default)]
    pub compare_value: String,
}

impl RowFilter {
    pub fn new(
        selector: ColumnSelector,
        operator: FilterOperator,
        compare_value: impl Into<String>,
    ) -> Self {
        Self {
            selector,
            operator,
            compare_value: compare_value.into(),
        }
    }

    /// The filter every configuration starts with: skip rows whose merge
    /// status is already filled in.
    #[must_use]
    pub fn merge_status_is_empty() -> Self {
        Self::new(
            ColumnSelector::ByHeader(MERGE_STATUS_HEADER.to_string()),
            FilterOperator::IsEmpty,
            "",
        )
    }

    /// Resolve the column once for a run.
    pub fn compile(&self, headers: &HeaderMap) -> MergeResult<RuntimeRowFilter> {
        Ok(RuntimeRowFilter {
            column: self.selector.resolve_column_number(headers)?,
            operator: self.operator,
            compare_value: self.compare_value.clone(),
        })
    }
}

/// The default filter set.
#[must_use]
pub fn default_row_filters() -> Vec<RowFilter> {
    vec![RowFilter::merge_status_is_empty()]
}

/// A row filter with its column fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRowFilter {
    pub column: usize,
    pub operator: FilterOperator,
    pub compare_value: String,
}

impl RuntimeRowFilter {
    #[must_use]
    pub fn matches(&self, row: usize, grid: &DataGrid) -> bool {
        self.operator
            .test(grid.cell(row, self.column), &self.compare_value)
    }
}

/// Compile a filter set against the header map.
pub fn compile_filters(
    filters: &[RowFilter],
    headers: &HeaderMap,
) -> MergeResult<Vec<RuntimeRowFilter>> {
    filters.iter().map(|filter| filter.compile(headers)).collect()
}

/// True iff every filter matches the 1-based `row`. No filters pass every row.
#[must_use]
pub fn passes(row: usize, grid: &DataGrid, filters: &[RuntimeRowFilter]) -> bool {
    filters.iter().all(|filter| filter.matches(row, grid))
}
