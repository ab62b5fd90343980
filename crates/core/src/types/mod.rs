//! Domain types for Lendshelf
//!
//! - `book_id`: content-addressed book identifiers
//! - `entry`: catalog entries, availability, acquisition links
//! - `account`: patron credentials
//! - `snapshot`: immutable reads of stored book records

mod account;
mod book_id;
mod entry;
mod snapshot;

pub use account::{AccountCredentials, DrmIdentity};
pub use book_id::BookId;
pub use entry::{Acquisition, AcquisitionKind, Availability, FeedEntry};
pub use snapshot::{BookSnapshot, DownloadHandle};
