use super::authenticated_get;
use crate::auth_retry::PersistencePolicy;
use crate::cancel::{run_until_cancelled, CancelToken};
use crate::context::LibraryContext;
use crate::error::{TaskError, TaskResult};
use crate::status_cache::Publisher;
use lendshelf_core::{
    derive_status, Acquisition, AcquisitionKind, BookId, BookStatus, DownloadHandle, FeedEntry,
};
use lendshelf_network::{download_to_file, HttpTransport, ProgressCallback};
use lendshelf_store::RecordHandle;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Acquisition kinds the engine can fulfil, best first
const PREFERRED_KINDS: [AcquisitionKind; 3] = [
    AcquisitionKind::OpenAccess,
    AcquisitionKind::Generic,
    AcquisitionKind::Borrow,
];

/// Picks the acquisition link a borrow will follow
///
/// Entries offering only links the engine cannot fulfil (buying,
/// subscribing, samples) fail with `UnsupportedAcquisition`.
pub fn select_acquisition(entry: &FeedEntry) -> TaskResult<&Acquisition> {
    PREFERRED_KINDS
        .iter()
        .find_map(|kind| entry.acquisition(*kind))
        .ok_or_else(|| TaskError::UnsupportedAcquisition {
            kinds: entry.acquisitions.iter().map(|a| a.kind).collect(),
        })
}

/// Borrows or places a hold on `entry`, downloading the content when possible
///
/// Returns the book's final status: `Downloaded` after a download, or the
/// derived status when the catalog answered with a hold. Once the task has
/// published a transient status, failures leave `DownloadFailed` in the
/// cache and cancellation leaves `Cancelled`, unless the cache was cleared
/// by a logout in the meantime. An entry without a usable link fails before
/// anything is stored.
pub async fn borrow(
    ctx: LibraryContext,
    token: CancelToken,
    entry: FeedEntry,
) -> TaskResult<BookStatus> {
    let publisher = ctx.cache.publisher();
    token.check()?;

    let acquisition = select_acquisition(&entry)?.clone();
    let book_id = BookId::from_entry(&entry);
    let handle = ctx.books.open(&book_id);
    ctx.books.create(&handle)?;
    ctx.books.write_metadata(&handle, &entry)?;
    log::info!(
        "Borrowing {} via {} link {}",
        entry.title,
        acquisition.kind,
        acquisition.href
    );

    match acquire(&ctx, &publisher, &token, &handle, acquisition).await {
        Ok(status) => Ok(status),
        Err(TaskError::Cancelled) => {
            publisher.put(BookStatus::Cancelled { id: book_id });
            Err(TaskError::Cancelled)
        }
        Err(e) => {
            publisher.put(BookStatus::DownloadFailed {
                id: book_id,
                cause: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn acquire(
    ctx: &LibraryContext,
    publisher: &Publisher,
    token: &CancelToken,
    handle: &RecordHandle,
    acquisition: Acquisition,
) -> TaskResult<BookStatus> {
    let id = handle.id().clone();

    let download = if acquisition.kind == AcquisitionKind::Borrow {
        publisher.put(BookStatus::RequestingLoan { id: id.clone() });
        let response = authenticated_get(ctx, token, &acquisition.href).await?;
        let loaned = ctx.parser.parse_entry(&response)?;
        ctx.books.write_metadata(handle, &loaned)?;

        let fulfilment = if loaned.availability.is_downloadable() {
            loaned
                .acquisition(AcquisitionKind::OpenAccess)
                .or_else(|| loaned.acquisition(AcquisitionKind::Generic))
                .cloned()
        } else {
            None
        };

        match fulfilment {
            Some(link) => link,
            // A hold, or a loan without a fulfilment link.
            None => {
                let snapshot = ctx.books.read_snapshot(handle)?;
                let status = derive_status(&snapshot);
                log::info!("{} is now {}", id.short(), status.kind());
                publisher.put_with_snapshot(status.clone(), snapshot);
                return Ok(status);
            }
        }
    } else {
        acquisition
    };

    publisher.put(BookStatus::RequestingDownload { id: id.clone() });
    let pending = DownloadHandle::new(Uuid::new_v4().to_string());
    ctx.books.write_pending_download(handle, Some(&pending))?;
    let staging = ctx.books.staging_path(pending.as_str());

    let result = download_content(ctx, publisher, token, handle, &download, &staging).await;
    if result.is_err() {
        discard_staging(ctx, handle, &staging);
    }
    result
}

async fn download_content(
    ctx: &LibraryContext,
    publisher: &Publisher,
    token: &CancelToken,
    handle: &RecordHandle,
    link: &Acquisition,
    staging: &Path,
) -> TaskResult<BookStatus> {
    let id = handle.id().clone();
    let progress: ProgressCallback = {
        let publisher = publisher.clone();
        let id = id.clone();
        Arc::new(move |bytes_so_far, bytes_expected| {
            publisher.put_if_more_important(BookStatus::DownloadInProgress {
                id: id.clone(),
                bytes_so_far,
                bytes_expected,
            });
        })
    };

    let transport: Arc<dyn HttpTransport> = Arc::clone(&ctx.transport);
    let bytes = if link.kind == AcquisitionKind::OpenAccess {
        let response = run_until_cancelled(token, transport.get(&link.href, None)).await??;
        run_until_cancelled(token, download_to_file(response, staging, Some(&progress))).await??
    } else {
        ctx.auth_loop(PersistencePolicy::Immediate)
            .run(token, None, |auth| {
                let transport = Arc::clone(&transport);
                let url = link.href.clone();
                let staging = staging.to_path_buf();
                let progress = Arc::clone(&progress);
                async move {
                    let response = transport.get(&url, Some(&auth)).await?;
                    download_to_file(response, &staging, Some(&progress)).await
                }
            })
            .await?
            .value
    };
    log::info!("Downloaded {} bytes for {}", bytes, id.short());

    if let Some(rights) = &ctx.rights {
        let blob = run_until_cancelled(token, rights.fulfil(&id, staging))
            .await?
            .map_err(TaskError::Rights)?;
        ctx.books.write_rights(handle, blob.as_deref())?;
    }

    ctx.books.write_content(handle, staging)?;
    ctx.books.write_pending_download(handle, None)?;

    let snapshot = ctx.books.read_snapshot(handle)?;
    let status = BookStatus::Downloaded {
        id,
        loan_end_date: snapshot.entry.availability.loan_end(),
    };
    publisher.put_with_snapshot(status.clone(), snapshot);
    Ok(status)
}

/// Best-effort cleanup after a failed or cancelled download
fn discard_staging(ctx: &LibraryContext, handle: &RecordHandle, staging: &Path) {
    if let Err(e) = std::fs::remove_file(staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
    if let Err(e) = ctx.books.write_pending_download(handle, None) {
        log::warn!(
            "Failed to clear pending download for {}: {}",
            handle.id().short(),
            e
        );
    }
}
