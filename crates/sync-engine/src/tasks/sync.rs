use super::authenticated_get;
use crate::cancel::{run_until_cancelled, CancelToken};
use crate::context::LibraryContext;
use crate::error::{TaskError, TaskResult};
use crate::status_cache::Publisher;
use bytes::Bytes;
use lendshelf_core::{derive_status, Availability, BookId, FeedEntry};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One feed entry that could not be stored
#[derive(Debug)]
pub struct EntryFailure {
    pub entry_id: String,
    pub book_id: BookId,
    pub error: TaskError,
}

/// Called once for every entry that failed during a sync
pub type EntryFailedCallback = Arc<dyn Fn(&EntryFailure) + Send + Sync>;

/// Outcome of a completed sync
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Entries stored successfully
    pub processed: usize,
    pub failures: Vec<EntryFailure>,
    /// Local records the loans feed no longer lists
    pub stale: BTreeSet<BookId>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches the loans feed and stores every entry
///
/// A failing entry is reported through `on_entry_failed` and the report,
/// and the remaining entries are still processed. Only fetching or parsing
/// the feed itself, or cancellation, fails the whole sync.
///
/// Each stored entry's derived status replaces whatever finished outcome is
/// cached for it, but never the progress of a borrow still running.
pub async fn sync(
    ctx: LibraryContext,
    token: CancelToken,
    on_entry_failed: Option<EntryFailedCallback>,
) -> TaskResult<SyncReport> {
    let publisher = ctx.cache.publisher();
    token.check()?;
    log::info!("Syncing loans from {}", ctx.settings.loans_uri);
    let feed = authenticated_get(&ctx, &token, &ctx.settings.loans_uri).await?;
    let entries = ctx.parser.parse_loan_feed(&feed)?;
    log::debug!("Loans feed lists {} entries", entries.len());

    let mut report = SyncReport::default();
    let mut listed = BTreeSet::new();

    for entry in entries {
        token.check()?;

        let book_id = BookId::from_entry(&entry);
        listed.insert(book_id.clone());

        match sync_entry(&ctx, &publisher, &token, &book_id, &entry).await {
            Ok(()) => report.processed += 1,
            Err(TaskError::Cancelled) => return Err(TaskError::Cancelled),
            Err(error) => {
                log::warn!("Failed to store entry {}: {}", entry.id, error);
                let failure = EntryFailure {
                    entry_id: entry.id.clone(),
                    book_id,
                    error,
                };
                if let Some(callback) = &on_entry_failed {
                    callback(&failure);
                }
                report.failures.push(failure);
            }
        }
    }

    report.stale = stale_records(&ctx, &listed);
    log::info!(
        "Sync finished: {} stored, {} failed, {} stale",
        report.processed,
        report.failures.len(),
        report.stale.len()
    );
    Ok(report)
}

async fn sync_entry(
    ctx: &LibraryContext,
    publisher: &Publisher,
    token: &CancelToken,
    book_id: &BookId,
    entry: &FeedEntry,
) -> TaskResult<()> {
    let handle = ctx.books.open(book_id);
    ctx.books.create(&handle)?;
    ctx.books.write_metadata(&handle, entry)?;

    let mut snapshot = ctx.books.read_snapshot(&handle)?;
    if !snapshot.cover_present {
        if let Some(uri) = entry.image_uri() {
            // Cover problems never fail the entry; only cancellation escapes.
            match run_until_cancelled(token, fetch_cover(ctx, uri)).await? {
                Ok(cover) => match ctx.books.write_cover(&handle, Some(&cover)) {
                    Ok(()) => snapshot.cover_present = true,
                    Err(e) => log::warn!("Failed to store cover for {}: {}", book_id.short(), e),
                },
                Err(e) => log::debug!("No cover for {} from {}: {}", book_id.short(), uri, e),
            }
        }
    }

    let status = derive_status(&snapshot);
    publisher.refresh(status, snapshot);
    Ok(())
}

async fn fetch_cover(ctx: &LibraryContext, uri: &str) -> TaskResult<Bytes> {
    let response = ctx.transport.get(uri, None).await?;
    Ok(response.bytes().await?)
}

/// Stored records missing from the feed, other than downloaded open-access books
fn stale_records(ctx: &LibraryContext, listed: &BTreeSet<BookId>) -> BTreeSet<BookId> {
    let stored = match ctx.books.list_all() {
        Ok(stored) => stored,
        Err(e) => {
            log::warn!("Could not list stored records: {}", e);
            return BTreeSet::new();
        }
    };

    stored
        .difference(listed)
        .filter(|id| {
            match ctx.books.read_snapshot(&ctx.books.open(id)) {
                Ok(snapshot) => !(snapshot.content_present
                    && matches!(snapshot.entry.availability, Availability::OpenAccess { .. })),
                Err(_) => true,
            }
        })
        .cloned()
        .collect()
}
