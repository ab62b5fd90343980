//! Persisted patron credentials

use crate::atomic::{read_optional, remove_if_exists, write_atomic};
use crate::error::{StoreError, StoreResult};
use crate::lock::{LockOptions, RecordLock};
use lendshelf_core::AccountCredentials;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

const CREDENTIALS_FILE: &str = "credentials.json";
const CREDENTIALS_LOCK: &str = "credentials.lock";

/// Credentials file guarded by its own lock, with an in-memory copy
///
/// Reads are served from memory. Writes go to disk first and update the
/// in-memory copy only once the file has been replaced.
#[derive(Debug)]
pub struct AccountCredentialStore {
    record_path: PathBuf,
    lock_path: PathBuf,
    lock_options: LockOptions,
    cached: RwLock<Option<AccountCredentials>>,
}

impl AccountCredentialStore {
    /// Opens the credentials stored under `root`
    ///
    /// An unreadable credentials file is logged and treated as signed out.
    pub fn open(root: impl AsRef<Path>, lock_options: LockOptions) -> StoreResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;

        let store = Self {
            record_path: root.join(CREDENTIALS_FILE),
            lock_path: root.join(CREDENTIALS_LOCK),
            lock_options,
            cached: RwLock::new(None),
        };

        let loaded = match store.load() {
            Ok(loaded) => loaded,
            Err(StoreError::CorruptRecord { path, reason }) => {
                log::warn!(
                    "Ignoring unreadable credentials at {}: {}",
                    path.display(),
                    reason
                );
                None
            }
            Err(e) => return Err(e),
        };
        *store.cached.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        Ok(store)
    }

    fn load(&self) -> StoreResult<Option<AccountCredentials>> {
        let _lock = RecordLock::acquire(&self.lock_path, &self.lock_options)?;
        match read_optional(&self.record_path)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::corrupt(&self.record_path, e)),
            None => Ok(None),
        }
    }

    /// Current credentials, if signed in
    pub fn get(&self) -> Option<AccountCredentials> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Persists `credentials`, replacing any previous ones
    pub fn set(&self, credentials: &AccountCredentials) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(credentials)?;
        {
            let _lock = RecordLock::acquire(&self.lock_path, &self.lock_options)?;
            write_atomic(&self.record_path, &bytes)?;
        }

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        log::info!("Stored credentials for {}", credentials.barcode);
        Ok(())
    }

    /// Forgets the credentials
    ///
    /// The in-memory copy is cleared even if the file cannot be removed.
    pub fn clear(&self) -> StoreResult<()> {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;

        let _lock = RecordLock::acquire(&self.lock_path, &self.lock_options)?;
        remove_if_exists(&self.record_path)?;
        Ok(())
    }
}
