//! Content-addressed book identifiers

use crate::types::FeedEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex encoded SHA-256 digest
const DIGEST_HEX_LEN: usize = 64;
/// Characters kept by [`BookId::short`]
const SHORT_LEN: usize = 12;

/// Unique identifier for a book
///
/// The identifier is the lowercase hex SHA-256 digest of the catalog entry's
/// unique ID, so the same catalog entry always maps to the same `BookId`
/// regardless of which feed it arrived in. It doubles as the name of the
/// book's record directory on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Computes the BookId for a catalog entry
    pub fn from_entry(entry: &FeedEntry) -> Self {
        Self::from_entry_id(&entry.id)
    }

    /// Computes the BookId for a raw catalog entry ID
    pub fn from_entry_id(entry_id: &str) -> Self {
        let digest = Sha256::digest(entry_id.as_bytes());
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Wraps an already computed identifier without rehashing
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns true if `s` has the shape of a BookId digest
    pub fn is_digest(s: &str) -> bool {
        s.len() == DIGEST_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Returns the BookId as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened form for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BookId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Availability;

    #[test]
    fn test_same_entry_id_same_book_id() {
        let a = BookId::from_entry_id("urn:librarysimplified.org/terms/id/Overdrive%20ID/1");
        let b = BookId::from_entry_id("urn:librarysimplified.org/terms/id/Overdrive%20ID/1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_entry_ids_differ() {
        let ids: Vec<BookId> = (0..200)
            .map(|i| BookId::from_entry_id(&format!("urn:isbn:{}", 9_780_000_000_000u64 + i)))
            .collect();

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        let id = BookId::from_entry_id("abc");
        assert_eq!(
            id.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(BookId::is_digest(id.as_str()));
    }

    #[test]
    fn test_from_entry_matches_entry_id() {
        let entry = FeedEntry::new("urn:book:1", "Book One", Availability::loanable());
        assert_eq!(BookId::from_entry(&entry), BookId::from_entry_id("urn:book:1"));
    }

    #[test]
    fn test_from_raw_does_not_rehash() {
        let id = BookId::from_entry_id("urn:book:2");
        let reopened = BookId::from_raw(id.as_str());
        assert_eq!(id, reopened);
    }

    #[test]
    fn test_short_counts_characters() {
        let digest = BookId::from_entry_id("urn:short");
        assert_eq!(digest.short(), &digest.as_str()[..12]);

        let raw = BookId::from_raw("bücher-über-alles");
        assert_eq!(raw.short(), "bücher-über-");
        assert_eq!(BookId::from_raw("ü").short(), "ü");
    }

    #[test]
    fn test_is_digest_rejects_other_names() {
        assert!(!BookId::is_digest(".staging"));
        assert!(!BookId::is_digest("credentials.json"));
        assert!(!BookId::is_digest(&"A".repeat(64)));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = BookId::from_raw("abcd");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abcd\"");
    }
}
