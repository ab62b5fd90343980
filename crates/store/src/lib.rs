//! Lendshelf Local Store
//!
//! This crate keeps book records and patron credentials on local disk.
//! Records are plain files under one directory per book, each guarded by an
//! advisory lock and replaced atomically so a crash never leaves a
//! half-written file behind.

pub mod atomic;
pub mod book_store;
pub mod credentials;
pub mod error;
pub mod lock;

pub use book_store::{LocalBookStore, RecordHandle, STAGING_DIR};
pub use credentials::AccountCredentialStore;
pub use error::{StoreError, StoreResult};
pub use lock::{LockOptions, RecordLock};
