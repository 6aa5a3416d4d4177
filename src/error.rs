//! Error types for docstream operations.

use thiserror::Error;

/// Errors that can occur while streaming or rendering a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[cfg(feature = "cli")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A consumer received an end event that does not match its open scope.
    #[error("{format}: unbalanced event stream (expected {expected}, found {found})")]
    Unbalanced {
        format: String,
        expected: String,
        found: String,
    },

    /// A format consumer failed; the whole fan-out was aborted.
    #[error("{format} output failed: {source}")]
    Consumer {
        format: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Streaming was cancelled")]
    Cancelled,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Build an [`Error::Unbalanced`] for `format`.
    pub(crate) fn unbalanced(
        format: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::Unbalanced {
            format: format.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
