//! Error types for quote operations

use networking::HttpError;
use storage::KvError;
use thiserror::Error;

/// Errors surfaced by user-facing quote operations
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Text or category was empty after trimming
    #[error("Validation error: {0}")]
    Validation(String),

    /// An entry with the same text and category already exists
    #[error("Duplicate quote: \"{text}\" ({category})")]
    Duplicate {
        /// Text of the rejected quote
        text: String,
        /// Category of the rejected quote
        category: String,
    },

    /// Import document was not JSON or not an array
    #[error("Format error: {0}")]
    Format(String),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error while writing an export artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for quote operations
pub type Result<T> = std::result::Result<T, QuoteError>;

/// Errors that end a sync cycle
///
/// None of these are fatal: the local collection is left untouched and the
/// failure is reported through the status stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The remote source could not be reached or returned an error status
    #[error("Network error: {0}")]
    Network(String),

    /// The remote response did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The merged collection could not be persisted
    #[error("Store error: {0}")]
    Store(String),

    /// Another sync cycle is still running
    #[error("Sync already in progress")]
    InProgress,
}

impl From<HttpError> for SyncError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Decode(msg) => SyncError::Malformed(msg),
            other => SyncError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_mapping() {
        let err: SyncError = HttpError::Decode("expected a sequence".to_string()).into();
        assert_eq!(err, SyncError::Malformed("expected a sequence".to_string()));

        let err: SyncError = HttpError::Status { status: 502, body: String::new() }.into();
        assert!(matches!(err, SyncError::Network(msg) if msg.contains("502")));
    }

    #[test]
    fn test_duplicate_display() {
        let err = QuoteError::Duplicate {
            text: "Keep going".to_string(),
            category: "Motivation".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate quote: \"Keep going\" (Motivation)");
    }
}
