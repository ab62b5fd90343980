use super::authenticated_get;
use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::{TaskError, TaskResult};
use lendshelf_core::{derive_status, BookId, BookStatus};

/// Refreshes one book's metadata from its alternate link
///
/// Returns the status cached afterwards, which stays the previous one while
/// another task is still borrowing or downloading the book.
pub async fn update_metadata(
    ctx: LibraryContext,
    token: CancelToken,
    id: BookId,
) -> TaskResult<BookStatus> {
    let publisher = ctx.cache.publisher();
    token.check()?;

    let handle = ctx.books.open(&id);
    let snapshot = ctx.books.read_snapshot(&handle)?;
    let uri = snapshot
        .entry
        .alternate_uri
        .clone()
        .ok_or_else(|| TaskError::NotFound(format!("alternate link for {}", id)))?;

    log::debug!("Refreshing metadata for {} from {}", id.short(), uri);
    let document = authenticated_get(&ctx, &token, &uri).await?;
    let entry = ctx.parser.parse_entry(&document)?;
    ctx.books.write_metadata(&handle, &entry)?;

    let snapshot = ctx.books.read_snapshot(&handle)?;
    let status = derive_status(&snapshot);
    publisher.refresh(status.clone(), snapshot);
    Ok(publisher.get(&id).unwrap_or(status))
}
