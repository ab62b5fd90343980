// crates/feed-parser/src/error.rs
//! Error types for feed parsing

use thiserror::Error;

/// Result type for feed parser operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors that can occur during feed parsing
#[derive(Debug, Error)]
pub enum FeedError {
    /// Document is not valid JSON or does not match the feed shape
    #[error("Invalid feed document: {0}")]
    InvalidDocument(String),

    /// Document was empty
    #[error("Feed document is empty")]
    EmptyDocument,

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Entry could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            FeedError::InvalidDocument(err.to_string())
        } else {
            FeedError::Serialization(err.to_string())
        }
    }
}
