//! Immutable reads of stored book records

use crate::types::{BookId, FeedEntry};
use serde::{Deserialize, Serialize};

/// Identifier of a download started for a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadHandle(String);

impl DownloadHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state of one stored book record at the moment it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    pub id: BookId,
    /// Latest catalog entry written for the book
    pub entry: FeedEntry,
    pub cover_present: bool,
    pub content_present: bool,
    pub rights: Option<Vec<u8>>,
    pub pending_download: Option<DownloadHandle>,
}

impl BookSnapshot {
    /// Creates a snapshot with no blobs present
    pub fn new(id: BookId, entry: FeedEntry) -> Self {
        Self {
            id,
            entry,
            cover_present: false,
            content_present: false,
            rights: None,
            pending_download: None,
        }
    }

    /// Sets whether the content blob is present
    pub fn with_content(mut self, present: bool) -> Self {
        self.content_present = present;
        self
    }
}
