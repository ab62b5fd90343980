// crates/feed-parser/src/feed.rs
//! Feed document structures

use chrono::{DateTime, Utc};
use lendshelf_core::FeedEntry;
use serde::{Deserialize, Serialize};

/// A loans feed as published by the catalog, or generated locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanFeed {
    /// Feed title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Last update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Entries, one per book
    #[serde(default)]
    pub entries: Vec<FeedEntry>,
}

impl LoanFeed {
    /// Creates a feed from entries
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            title: None,
            updated: None,
            entries,
        }
    }

    /// Returns the number of entries in the feed
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the feed has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorts entries by title, then by ID for equal titles
    pub fn sort_by_title(&mut self) {
        self.entries.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Accepted on-the-wire shapes of a loans feed
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum FeedDocument {
    Wrapped(LoanFeed),
    Bare(Vec<FeedEntry>),
}

impl FeedDocument {
    pub(crate) fn into_entries(self) -> Vec<FeedEntry> {
        match self {
            FeedDocument::Wrapped(feed) => feed.entries,
            FeedDocument::Bare(entries) => entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendshelf_core::Availability;

    #[test]
    fn test_feed_creation() {
        let feed = LoanFeed::new(Vec::new());
        assert!(feed.is_empty());
        assert_eq!(feed.entry_count(), 0);
    }

    #[test]
    fn test_sort_by_title_is_case_insensitive() {
        let mut feed = LoanFeed::new(vec![
            FeedEntry::new("urn:3", "zebra", Availability::loanable()),
            FeedEntry::new("urn:1", "Apple", Availability::loanable()),
            FeedEntry::new("urn:2", "banana", Availability::loanable()),
        ]);
        feed.sort_by_title();

        let titles: Vec<&str> = feed.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple", "banana", "zebra"]);
    }
}
