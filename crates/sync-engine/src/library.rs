// crates/sync-engine/src/library.rs
//! The facade applications drive

use crate::context::LibraryContext;
use crate::error::TaskResult;
use crate::orchestrator::{TaskHandle, TaskKind, TaskOrchestrator};
use crate::status_cache::SubscriptionId;
use crate::tasks::{self, EntryFailedCallback, SyncReport};
use lendshelf_core::{derive_status, AccountCredentials, BookId, BookSnapshot, BookStatus, FeedEntry};
use lendshelf_feed_parser::LoanFeed;

/// A patron's library: local records, statuses, and background tasks
///
/// Every network operation is submitted to the orchestrator and returns a
/// [`TaskHandle`] immediately. Status changes are published through
/// [`Library::subscribe`].
#[derive(Debug, Clone)]
pub struct Library {
    ctx: LibraryContext,
    orchestrator: TaskOrchestrator,
}

impl Library {
    pub fn new(ctx: LibraryContext, orchestrator: TaskOrchestrator) -> Self {
        Self { ctx, orchestrator }
    }

    pub fn context(&self) -> &LibraryContext {
        &self.ctx
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    /// Loads every stored record into the status cache
    pub fn load_account_data(&self) -> TaskHandle<usize> {
        let ctx = self.ctx.clone();
        self.orchestrator
            .submit(TaskKind::LoadAccountData, move |token| {
                tasks::load_account_data(ctx, token)
            })
    }

    /// Verifies and stores new credentials
    pub fn login(&self, credentials: AccountCredentials) -> TaskHandle<AccountCredentials> {
        let ctx = self.ctx.clone();
        self.orchestrator.submit(TaskKind::Login, move |token| {
            tasks::login(ctx, token, credentials)
        })
    }

    /// Fetches the loans feed and stores every entry
    pub fn sync(&self, on_entry_failed: Option<EntryFailedCallback>) -> TaskHandle<SyncReport> {
        let ctx = self.ctx.clone();
        self.orchestrator.submit(TaskKind::Sync, move |token| {
            tasks::sync(ctx, token, on_entry_failed)
        })
    }

    /// Borrows, places a hold on, or downloads a catalog entry
    pub fn borrow(&self, entry: FeedEntry) -> TaskHandle<BookStatus> {
        let ctx = self.ctx.clone();
        self.orchestrator
            .submit(TaskKind::Borrow, move |token| tasks::borrow(ctx, token, entry))
    }

    /// Returns a loan or cancels a hold
    pub fn revoke(&self, id: BookId) -> TaskHandle<BookStatus> {
        let ctx = self.ctx.clone();
        self.orchestrator
            .submit(TaskKind::Revoke, move |token| tasks::revoke(ctx, token, id))
    }

    /// Refreshes a book's metadata from its alternate link
    pub fn update_metadata(&self, id: BookId) -> TaskHandle<BookStatus> {
        let ctx = self.ctx.clone();
        self.orchestrator.submit(TaskKind::UpdateMetadata, move |token| {
            tasks::update_metadata(ctx, token, id)
        })
    }

    /// Builds a loans feed from the local records
    pub fn generate_feed(&self) -> TaskHandle<LoanFeed> {
        let ctx = self.ctx.clone();
        self.orchestrator
            .submit(TaskKind::GenerateFeed, move |token| {
                tasks::generate_feed(ctx, token)
            })
    }

    /// Deletes a book's downloaded content, keeping its metadata
    ///
    /// Returns the re-derived status, which replaces the cached one.
    pub fn delete_local_content(&self, id: &BookId) -> TaskResult<BookStatus> {
        let handle = self.ctx.books.open(id);
        self.ctx.books.destroy_content_only(&handle)?;

        let snapshot = self.ctx.books.read_snapshot(&handle)?;
        let status = derive_status(&snapshot);
        self.ctx.cache.put_with_snapshot(status.clone(), snapshot);
        log::info!("Deleted local content of {}", id.short());
        Ok(status)
    }

    /// Signs out and forgets everything stored locally
    ///
    /// In-flight tasks are cancelled and the status cache is cleared before
    /// any disk cleanup. Cleanup failures are logged and do not stop the
    /// rest. Returns the number of tasks that were cancelled.
    pub fn logout(&self) -> usize {
        let cancelled = self.orchestrator.cancel_all();
        self.ctx.cache.clear_all();

        if let Err(e) = self.ctx.credentials.clear() {
            log::warn!("Failed to remove stored credentials: {}", e);
        }
        if let Err(e) = self.ctx.books.destroy_all() {
            log::warn!("Failed to remove book records: {}", e);
        }

        log::info!("Logged out ({} task(s) cancelled)", cancelled);
        cancelled
    }

    pub fn is_signed_in(&self) -> bool {
        self.ctx.credentials.is_signed_in()
    }

    pub fn credentials(&self) -> Option<AccountCredentials> {
        self.ctx.credentials.get()
    }

    pub fn status(&self, id: &BookId) -> Option<BookStatus> {
        self.ctx.cache.get(id)
    }

    pub fn snapshot(&self, id: &BookId) -> Option<BookSnapshot> {
        self.ctx.cache.snapshot(id)
    }

    /// Every cached status, ordered by book ID
    pub fn statuses(&self) -> Vec<BookStatus> {
        self.ctx.cache.statuses()
    }

    /// Registers an observer of status changes
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&BookId) + Send + Sync + 'static,
    {
        self.ctx.cache.subscribe(observer)
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.ctx.cache.unsubscribe(subscription)
    }
}
