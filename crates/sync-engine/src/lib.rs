// crates/sync-engine/src/lib.rs
//! Book lifecycle engine
//!
//! Keeps the patron's local library in step with the catalog:
//! - Background tasks for login, sync, borrow, revoke and metadata refresh
//! - A status cache with change notification for every known book
//! - Authentication that re-prompts when the server rejects credentials
//! - Bulk cancellation on logout
//!
//! # Example
//!
//! ```rust,no_run
//! use lendshelf_feed_parser::JsonFeedParser;
//! use lendshelf_network::ReqwestTransport;
//! use lendshelf_store::{AccountCredentialStore, LocalBookStore, LockOptions};
//! use lendshelf_sync_engine::{EngineSettings, Library, LibraryContext, NoPrompt, TaskOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = LibraryContext::new(
//!     LocalBookStore::open_root("/tmp/lendshelf/books")?,
//!     AccountCredentialStore::open("/tmp/lendshelf", LockOptions::default())?,
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(JsonFeedParser::new()),
//!     Arc::new(NoPrompt),
//!     EngineSettings::new("https://circulation.example.org/loans"),
//! );
//! let library = Library::new(ctx, TaskOrchestrator::current());
//!
//! library.subscribe(|id| println!("{} changed", id));
//! let report = library.sync(None).join().await?;
//! println!("{} books synced", report.processed);
//! # Ok(())
//! # }
//! ```

mod auth_retry;
mod cancel;
mod context;
mod error;
mod library;
mod orchestrator;
mod rights;
mod status_cache;
pub mod tasks;

pub use auth_retry::{
    AuthOutcome, AuthRetryLoop, AuthState, CredentialPrompt, NoPrompt, PersistencePolicy,
    DEFAULT_MAX_ATTEMPTS,
};
pub use cancel::{run_until_cancelled, CancelToken};
pub use context::{EngineSettings, LibraryContext};
pub use error::{TaskError, TaskResult};
pub use library::Library;
pub use orchestrator::{TaskHandle, TaskId, TaskKind, TaskOrchestrator};
pub use rights::RightsProvider;
pub use status_cache::{Publisher, StatusCache, SubscriptionId};
pub use tasks::{EntryFailedCallback, EntryFailure, SyncReport, LOCAL_FEED_TITLE};
