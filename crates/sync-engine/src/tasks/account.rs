use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::TaskResult;
use lendshelf_core::{derive_status, DownloadHandle};
use lendshelf_store::RecordHandle;

/// Populates the status cache from every stored record
///
/// Returns the number of records loaded. Unreadable records are logged and
/// skipped. Downloads left unfinished by a previous run are discarded.
pub async fn load_account_data(ctx: LibraryContext, token: CancelToken) -> TaskResult<usize> {
    let publisher = ctx.cache.publisher();
    token.check()?;

    let ids = ctx.books.list_all()?;
    log::info!("Loading {} stored book record(s)", ids.len());

    let mut loaded = 0;
    for id in ids {
        token.check()?;

        let handle = ctx.books.open(&id);
        let mut snapshot = match ctx.books.read_snapshot(&handle) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Skipping unreadable record {}: {}", id.short(), e);
                continue;
            }
        };

        if let Some(download) = snapshot.pending_download.take() {
            discard_interrupted_download(&ctx, &handle, &download);
        }

        publisher.put_with_snapshot(derive_status(&snapshot), snapshot);
        loaded += 1;
    }

    Ok(loaded)
}

fn discard_interrupted_download(
    ctx: &LibraryContext,
    handle: &RecordHandle,
    download: &DownloadHandle,
) {
    log::info!(
        "Discarding interrupted download {} for {}",
        download,
        handle.id().short()
    );

    let staging = ctx.books.staging_path(download.as_str());
    if let Err(e) = std::fs::remove_file(&staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
    if let Err(e) = ctx.books.write_pending_download(handle, None) {
        log::warn!("Failed to clear pending download for {}: {}", handle.id().short(), e);
    }
}
