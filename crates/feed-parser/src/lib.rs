// crates/feed-parser/src/lib.rs
//! Catalog feed parsing for the lending engine
//!
//! The engine consumes catalog documents through the [`FeedParser`] trait:
//! loans feeds, standalone entry documents, and the serialized form written
//! to each book's metadata file. [`JsonFeedParser`] is the bundled
//! implementation.
//!
//! # Example
//!
//! ```rust
//! use lendshelf_feed_parser::{FeedParser, JsonFeedParser};
//!
//! let json = r#"{"entries": [
//!   {"id": "urn:book:1", "title": "Emma", "availability": {"state": "loanable"}}
//! ]}"#;
//!
//! let entries = JsonFeedParser::new()
//!     .parse_loan_feed(json.as_bytes())
//!     .expect("Failed to parse feed");
//! println!("{} entries", entries.len());
//! ```

mod error;
mod feed;
mod parser;

pub use error::{FeedError, FeedResult};
pub use feed::LoanFeed;
pub use parser::{FeedParser, JsonFeedParser};
