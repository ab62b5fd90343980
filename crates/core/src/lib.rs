//! Core domain model for the Lendshelf lending engine
//!
//! Everything here is plain data plus pure functions: book identifiers,
//! catalog entries, credentials, record snapshots, and the status state
//! machine with its importance order.

pub mod status;
pub mod types;

pub use status::{derive_status, BookStatus, StatusKind};
pub use types::{
    AccountCredentials, Acquisition, AcquisitionKind, Availability, BookId, BookSnapshot,
    DownloadHandle, DrmIdentity, FeedEntry,
};
