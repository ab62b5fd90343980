//! Crash-safe file replacement
//!
//! Writes go to a temporary sibling of the destination, are flushed and
//! synced, then renamed over the destination. A reader therefore sees either
//! the previous file or the complete new one, never a truncated mix.

use crate::error::{StoreError, StoreResult};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replaces `dest` with `bytes`
///
/// The destination directory must already exist; a missing directory is an
/// error and nothing is written.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = dest.parent().ok_or_else(|| StoreError::NotFound {
        what: format!("parent directory of {}", dest.display()),
    })?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    temp_file
        .write_all(bytes)
        .map_err(|e| StoreError::io(temp_file.path(), e))?;
    temp_file
        .flush()
        .map_err(|e| StoreError::io(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| StoreError::io(temp_file.path(), e))?;

    temp_file
        .persist(dest)
        .map_err(|e| StoreError::io(dest, e.error))?;
    Ok(())
}

/// Atomically moves `source` to `dest` on the same volume
pub fn move_atomic(source: &Path, dest: &Path) -> StoreResult<()> {
    fs::rename(source, dest).map_err(|e| StoreError::io(dest, e))
}

/// Removes `path` if it exists, returning whether anything was removed
pub fn remove_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Reads `path`, mapping a missing file to `None`
pub fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
