// crates/sync-engine/src/error.rs
//! Error types for background tasks

use lendshelf_core::{AcquisitionKind, BookId};
use lendshelf_feed_parser::FeedError;
use lendshelf_network::NetworkError;
use lendshelf_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors a task reports through its handle
#[derive(Debug, Error)]
pub enum TaskError {
    /// A record lock stayed busy past its timeout
    #[error("Record busy: timed out waiting for {path}")]
    LockTimeout { path: PathBuf },

    /// Record or credentials absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data could not be parsed
    #[error("Corrupt record at {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Store(#[source] StoreError),

    /// The credential prompt gave up, or the attempt limit was reached
    #[error("Authentication abandoned after {attempts} attempt(s)")]
    AuthenticationAbandoned { attempts: u32 },

    /// The server answered with an error other than 401
    #[error("Server returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// The server could not be reached
    #[error("Network transport failed: {0}")]
    Transport(String),

    /// A link or URI could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Local file I/O outside the record store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// None of the entry's acquisition links can be fulfilled
    #[error("Unsupported acquisition (offered: {kinds:?})")]
    UnsupportedAcquisition { kinds: Vec<AcquisitionKind> },

    /// The book's availability carries no revoke link
    #[error("Book {0} cannot be revoked")]
    NotRevocable(BookId),

    /// The rights provider could not fulfil downloaded content
    #[error("Rights fulfilment failed: {0}")]
    Rights(String),

    /// No credentials are stored
    #[error("Not signed in")]
    NotSignedIn,

    /// A catalog document could not be read
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// The task observed cancellation
    #[error("Task cancelled")]
    Cancelled,

    /// The task body panicked
    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Returns true if running the same task again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::LockTimeout { .. } | TaskError::Transport(_))
            || self.is_server_error()
    }

    /// Returns true if the patron needs to re-enter credentials
    pub fn is_credentials_rejected(&self) -> bool {
        matches!(self, TaskError::AuthenticationAbandoned { .. })
    }

    /// Returns true if the catalog could not serve the request
    pub fn is_server_unavailable(&self) -> bool {
        matches!(self, TaskError::Transport(_)) || self.is_server_error()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    fn is_server_error(&self) -> bool {
        matches!(self, TaskError::Remote { status: 500..=599, .. })
    }
}

impl From<StoreError> for TaskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout { path, .. } => TaskError::LockTimeout { path },
            StoreError::NotFound { what } => TaskError::NotFound(what),
            StoreError::CorruptRecord { path, reason } => TaskError::CorruptRecord { path, reason },
            other => TaskError::Store(other),
        }
    }
}

impl From<NetworkError> for TaskError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Status { status, message } => TaskError::Remote { status, message },
            NetworkError::Transport(message) => TaskError::Transport(message),
            NetworkError::Io(e) => TaskError::Io(e),
            NetworkError::InvalidUrl(url) => TaskError::InvalidUrl(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = TaskError::AuthenticationAbandoned { attempts: 2 };
        assert_eq!(err.to_string(), "Authentication abandoned after 2 attempt(s)");
    }

    #[test]
    fn test_store_errors_keep_their_kind() {
        let err: TaskError = StoreError::LockTimeout {
            path: PathBuf::from("/data/x/lock"),
            waited: Duration::from_secs(1),
        }
        .into();
        assert!(matches!(err, TaskError::LockTimeout { .. }));
        assert!(err.is_retryable());

        let err: TaskError = StoreError::NotFound {
            what: "book record".to_string(),
        }
        .into();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[test]
    fn test_network_errors_map_to_remote_and_transport() {
        let err: TaskError = NetworkError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
        .into();
        assert!(err.is_server_unavailable());
        assert!(err.is_retryable());

        let err: TaskError = NetworkError::Status {
            status: 404,
            message: "Not Found".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(!err.is_server_unavailable());
    }

    #[test]
    fn test_rejected_credentials_distinct_from_outage() {
        let rejected = TaskError::AuthenticationAbandoned { attempts: 1 };
        assert!(rejected.is_credentials_rejected());
        assert!(!rejected.is_server_unavailable());

        let outage = TaskError::Transport("connection refused".to_string());
        assert!(!outage.is_credentials_rejected());
        assert!(outage.is_server_unavailable());
    }
}
