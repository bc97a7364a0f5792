//! Error types for rowmerge.

use rowmerge_sheet::SheetError;
use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while configuring or running a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Column addressing failure (unknown header, bad letters, duplicate header).
    #[error(transparent)]
    Sheet(#[from] SheetError),

    /// An operation that is undefined for the given input, e.g. asking a
    /// literal selector for its column.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Selector kind string that is not one of the known kinds.
    #[error("Invalid column selector type: {0}")]
    InvalidSelectorType(String),

    /// Selector payload that does not fit its kind.
    #[error("Invalid column selector input for {kind}: '{input}'")]
    InvalidSelectorInput { kind: &'static str, input: String },

    /// Row filter operator string that is not one of the known operators.
    #[error("Invalid row filter operator: {0}")]
    InvalidOperator(String),

    /// Locator whose form does not identify a document kind.
    #[error("Can't identify file kind from locator: {0}")]
    UnrecognizedLocatorKind(String),

    /// Template locator that is neither a flow document nor a tabular document.
    #[error("Invalid template locator: {0}. Only document or spreadsheet files are allowed")]
    UnrecognizedTemplateKind(String),

    /// Artifact kind the requested operation cannot handle.
    #[error("Unsupported template kind for {operation}: {kind}")]
    UnsupportedTemplateKind {
        operation: &'static str,
        kind: String,
    },

    /// Malformed email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Configuration is missing requirements; one message per line.
    #[error("{}", missing.join("\n"))]
    NotReady { missing: Vec<String> },

    /// Failure reported by the storage, document, mail or rendering platform.
    #[error("{operation} failed: {message}")]
    Collaborator {
        operation: &'static str,
        message: String,
    },
}

impl MergeError {
    /// Create a collaborator error.
    pub fn collaborator(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            operation,
            message: message.into(),
        }
    }

    /// Create an unsupported-kind error.
    pub fn unsupported(operation: &'static str, kind: impl ToString) -> Self {
        Self::UnsupportedTemplateKind {
            operation,
            kind: kind.to_string(),
        }
    }
}
