use thiserror::Error;

/// Errors that can occur while addressing cells and headers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("Invalid column letters: '{0}'")]
    InvalidColumnLetters(String),

    #[error("Column number must be 1 or greater, got {0}")]
    InvalidColumnNumber(usize),

    #[error("Unknown header: {name}")]
    UnknownHeader { name: String },

    #[error("Duplicate header name: {name} (columns {first} and {second})")]
    DuplicateHeader {
        name: String,
        first: usize,
        second: usize,
    },
}

pub type Result<T> = std::result::Result<T, SheetError>;
