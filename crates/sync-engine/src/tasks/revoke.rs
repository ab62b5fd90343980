use super::authenticated_get;
use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::{TaskError, TaskResult};
use lendshelf_core::{BookId, BookStatus};

/// Returns a loan or cancels a hold
///
/// On success the local record is destroyed and the book leaves the status
/// cache. When the catalog refuses, the record is kept and `RevokeFailed`
/// is cached.
pub async fn revoke(ctx: LibraryContext, token: CancelToken, id: BookId) -> TaskResult<BookStatus> {
    let publisher = ctx.cache.publisher();
    token.check()?;

    let handle = ctx.books.open(&id);
    let snapshot = ctx.books.read_snapshot(&handle)?;
    let revoke_uri = snapshot
        .entry
        .availability
        .revoke_uri()
        .ok_or_else(|| TaskError::NotRevocable(id.clone()))?
        .to_string();

    log::info!(
        "Revoking {} ({}) via {}",
        snapshot.entry.title,
        snapshot.entry.availability.name(),
        revoke_uri
    );

    match authenticated_get(&ctx, &token, &revoke_uri).await {
        Ok(_) => {
            ctx.books.destroy(&handle)?;
            publisher.clear(&id);
            Ok(BookStatus::Revoked { id, revoke_uri })
        }
        Err(TaskError::Cancelled) => Err(TaskError::Cancelled),
        Err(e) => {
            log::warn!("Revoke of {} failed: {}", id.short(), e);
            publisher.put_with_snapshot(
                BookStatus::RevokeFailed {
                    id,
                    cause: e.to_string(),
                },
                snapshot,
            );
            Err(e)
        }
    }
}
