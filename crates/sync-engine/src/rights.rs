// crates/sync-engine/src/rights.rs
//! DRM fulfilment seam

use async_trait::async_trait;
use lendshelf_core::BookId;
use std::path::Path;

/// Produces the rights blob for freshly downloaded content
///
/// Called after the content has been staged and before it is moved into
/// the record. Returning `Ok(None)` means the content needs no rights.
#[async_trait]
pub trait RightsProvider: Send + Sync {
    async fn fulfil(&self, id: &BookId, content: &Path) -> Result<Option<Vec<u8>>, String>;
}
