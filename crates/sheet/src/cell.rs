use serde::{Deserialize, Serialize};
use std::fmt;

/// A single value held in a spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    /// Borrow the text of a string cell. Other kinds yield `None`, since
    /// only string cells can carry template tags.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as its display string
    #[must_use]
    pub fn as_str(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(fl) => write!(f, "{fl}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_values() {
        assert_eq!(CellValue::Null.as_str(), "");
        assert_eq!(CellValue::Bool(true).as_str(), "TRUE");
        assert_eq!(CellValue::Int(7).as_str(), "7");
        assert_eq!(CellValue::Float(1.5).as_str(), "1.5");
        assert_eq!(CellValue::from("x").as_str(), "x");
    }

    #[test]
    fn test_as_text_only_for_strings() {
        assert_eq!(CellValue::from("{{id}}").as_text(), Some("{{id}}"));
        assert_eq!(CellValue::Int(1).as_text(), None);
        assert_eq!(CellValue::Null.as_text(), None);
    }
}
