use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::TaskResult;
use lendshelf_feed_parser::LoanFeed;

/// Title of feeds generated from local records
pub const LOCAL_FEED_TITLE: &str = "Local loans";

/// Builds a loans feed from the stored metadata, sorted by title
///
/// Unreadable records are left out.
pub async fn generate_feed(ctx: LibraryContext, token: CancelToken) -> TaskResult<LoanFeed> {
    let mut entries = Vec::new();
    for id in ctx.books.list_all()? {
        token.check()?;
        match ctx.books.read_snapshot(&ctx.books.open(&id)) {
            Ok(snapshot) => entries.push(snapshot.entry),
            Err(e) => log::warn!("Leaving {} out of the local feed: {}", id.short(), e),
        }
    }

    let mut feed = LoanFeed::new(entries);
    feed.title = Some(LOCAL_FEED_TITLE.to_string());
    feed.sort_by_title();
    Ok(feed)
}
