// crates/sync-engine/src/tasks/mod.rs
//! Task bodies run by the orchestrator
//!
//! Each body takes a [`LibraryContext`] clone and the task's
//! [`CancelToken`], and reports through its `TaskResult`. Progress and
//! intermediate states are published through the status cache.

mod account;
mod borrow;
mod feed;
mod login;
mod metadata;
mod revoke;
mod sync;

pub use account::load_account_data;
pub use borrow::{borrow, select_acquisition};
pub use feed::{generate_feed, LOCAL_FEED_TITLE};
pub use login::login;
pub use metadata::update_metadata;
pub use revoke::revoke;
pub use sync::{sync, EntryFailedCallback, EntryFailure, SyncReport};

use crate::auth_retry::PersistencePolicy;
use crate::cancel::CancelToken;
use crate::context::LibraryContext;
use crate::error::TaskResult;
use bytes::Bytes;
use lendshelf_network::HttpTransport;
use std::sync::Arc;

/// GETs `url` through the authentication loop and collects the body
pub(crate) async fn authenticated_get(
    ctx: &LibraryContext,
    token: &CancelToken,
    url: &str,
) -> TaskResult<Bytes> {
    let transport: Arc<dyn HttpTransport> = Arc::clone(&ctx.transport);
    let outcome = ctx
        .auth_loop(PersistencePolicy::Immediate)
        .run(token, None, |auth| {
            let transport = Arc::clone(&transport);
            let url = url.to_string();
            async move { transport.get(&url, Some(&auth)).await?.bytes().await }
        })
        .await?;
    Ok(outcome.value)
}
