use crate::error::{Result, SheetError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based cell position, the way spreadsheet ranges address cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The top-left cell of a sheet
    #[must_use]
    pub fn origin() -> Self {
        Self { row: 1, col: 1 }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_a1_notation(self.row, self.col))
    }
}

/// Convert column letters to a 1-based column number
/// A=1, B=2, ... Z=26, AA=27, AB=28, ...
pub fn column_letters_to_number(letters: &str) -> Result<usize> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(SheetError::InvalidColumnLetters(letters.to_string()));
    }

    let mut col: usize = 0;
    for b in trimmed.bytes() {
        let b = b.to_ascii_uppercase();
        if !b.is_ascii_uppercase() {
            return Err(SheetError::InvalidColumnLetters(letters.to_string()));
        }
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add((b - b'A') as usize + 1))
            .ok_or_else(|| SheetError::InvalidColumnLetters(letters.to_string()))?;
    }

    Ok(col)
}

/// Convert a 1-based column number to column letters
/// 1=A, 2=B, ... 26=Z, 27=AA, 28=AB, ...
///
/// Column 0 has no letters and yields an empty string.
#[must_use]
pub fn column_number_to_letters(mut col: usize) -> String {
    let mut result = String::new();

    while col > 0 {
        col -= 1;
        result.insert(0, ((col % 26) as u8 + b'A') as char);
        col /= 26;
    }

    result
}

/// Convert a 1-based (row, col) pair to A1 notation
/// (1, 1) = "A1", (1, 2) = "B1", etc.
#[must_use]
pub fn to_a1_notation(row: usize, col: usize) -> String {
    format!("{}{}", column_number_to_letters(col), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_to_number() {
        assert_eq!(column_letters_to_number("A").unwrap(), 1);
        assert_eq!(column_letters_to_number("B").unwrap(), 2);
        assert_eq!(column_letters_to_number("Z").unwrap(), 26);
        assert_eq!(column_letters_to_number("AA").unwrap(), 27);
        assert_eq!(column_letters_to_number("AB").unwrap(), 28);
        assert_eq!(column_letters_to_number("AZ").unwrap(), 52);
        assert_eq!(column_letters_to_number("BA").unwrap(), 53);
        assert_eq!(column_letters_to_number("ZZ").unwrap(), 702);
        assert_eq!(column_letters_to_number("AAA").unwrap(), 703);

        // Test case insensitive
        assert_eq!(column_letters_to_number("a").unwrap(), 1);
        assert_eq!(column_letters_to_number("aB").unwrap(), 28);
    }

    #[test]
    fn test_column_letters_errors() {
        assert!(column_letters_to_number("").is_err());
        assert!(column_letters_to_number("A1").is_err());
        assert!(column_letters_to_number("1").is_err());
        assert!(matches!(
            column_letters_to_number("A-B"),
            Err(SheetError::InvalidColumnLetters(s)) if s == "A-B"
        ));
    }

    #[test]
    fn test_column_number_to_letters() {
        assert_eq!(column_number_to_letters(0), "");
        assert_eq!(column_number_to_letters(1), "A");
        assert_eq!(column_number_to_letters(2), "B");
        assert_eq!(column_number_to_letters(26), "Z");
        assert_eq!(column_number_to_letters(27), "AA");
        assert_eq!(column_number_to_letters(28), "AB");
        assert_eq!(column_number_to_letters(52), "AZ");
        assert_eq!(column_number_to_letters(53), "BA");
        assert_eq!(column_number_to_letters(702), "ZZ");
        assert_eq!(column_number_to_letters(703), "AAA");
    }

    #[test]
    fn test_to_a1_notation() {
        assert_eq!(to_a1_notation(1, 1), "A1");
        assert_eq!(to_a1_notation(1, 2), "B1");
        assert_eq!(to_a1_notation(2, 1), "A2");
        assert_eq!(to_a1_notation(100, 26), "Z100");
        assert_eq!(CellPos::new(3, 27).to_string(), "AA3");
    }

    #[test]
    fn test_roundtrip() {
        for n in 1..=1000 {
            let letters = column_number_to_letters(n);
            assert_eq!(column_letters_to_number(&letters).unwrap(), n, "{letters}");
        }
    }
}
