// crates/feed-parser/src/parser.rs
//! Feed parsing logic

use crate::error::{FeedError, FeedResult};
use crate::feed::{FeedDocument, LoanFeed};
use lendshelf_core::FeedEntry;

/// Converts catalog documents to and from [`FeedEntry`] values
///
/// The sync engine only ever talks to this trait, so a different catalog
/// format can be supported by providing another implementation.
pub trait FeedParser: Send + Sync {
    /// Parses a loans feed into its entries
    fn parse_loan_feed(&self, bytes: &[u8]) -> FeedResult<Vec<FeedEntry>>;

    /// Parses a standalone entry document
    fn parse_entry(&self, bytes: &[u8]) -> FeedResult<FeedEntry>;

    /// Serializes one entry, the inverse of [`FeedParser::parse_entry`]
    fn serialize_entry(&self, entry: &FeedEntry) -> FeedResult<Vec<u8>>;

    /// Serializes a list of entries as a loans feed
    fn serialize_feed(&self, entries: &[FeedEntry]) -> FeedResult<Vec<u8>>;
}

/// JSON catalog documents
///
/// Loans feeds are accepted either as `{"entries": [...]}` or as a bare
/// array of entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFeedParser {
    pretty: bool,
}

impl JsonFeedParser {
    /// Creates a parser producing compact output
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser producing indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn check_not_empty(bytes: &[u8]) -> FeedResult<()> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(FeedError::EmptyDocument);
        }
        Ok(())
    }

    fn validate(entry: &FeedEntry) -> FeedResult<()> {
        if entry.id.trim().is_empty() {
            return Err(FeedError::MissingField("id".to_string()));
        }
        Ok(())
    }

    fn to_bytes<T: serde::Serialize>(&self, value: &T) -> FeedResult<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        bytes.map_err(|e| FeedError::Serialization(e.to_string()))
    }
}

impl FeedParser for JsonFeedParser {
    fn parse_loan_feed(&self, bytes: &[u8]) -> FeedResult<Vec<FeedEntry>> {
        Self::check_not_empty(bytes)?;

        let document: FeedDocument = serde_json::from_slice(bytes)?;
        let entries = document.into_entries();
        for entry in &entries {
            Self::validate(entry)?;
        }
        Ok(entries)
    }

    fn parse_entry(&self, bytes: &[u8]) -> FeedResult<FeedEntry> {
        Self::check_not_empty(bytes)?;

        let entry: FeedEntry = serde_json::from_slice(bytes)?;
        Self::validate(&entry)?;
        Ok(entry)
    }

    fn serialize_entry(&self, entry: &FeedEntry) -> FeedResult<Vec<u8>> {
        self.to_bytes(entry)
    }

    fn serialize_feed(&self, entries: &[FeedEntry]) -> FeedResult<Vec<u8>> {
        self.to_bytes(&LoanFeed::new(entries.to_vec()))
    }
}
