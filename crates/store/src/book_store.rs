//! Per-book records on local disk
//!
//! Every book owns a directory named by its [`BookId`] under the store root:
//!
//! ```text
//! <root>/<book-id>/lock            advisory lock, held for every operation
//! <root>/<book-id>/metadata.json   latest catalog entry
//! <root>/<book-id>/cover           cover image bytes
//! <root>/<book-id>/content         downloaded book file
//! <root>/<book-id>/rights          DRM rights blob
//! <root>/<book-id>/download.json   handle of an unfinished download
//! ```
//!
//! Each public operation takes the record lock, performs its file work, and
//! releases the lock before returning. Operations are not reentrant.

use crate::atomic::{move_atomic, read_optional, remove_if_exists, write_atomic};
use crate::error::{StoreError, StoreResult};
use crate::lock::{LockOptions, RecordLock};
use lendshelf_core::{BookId, BookSnapshot, DownloadHandle, FeedEntry};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "lock";
const METADATA_FILE: &str = "metadata.json";
const COVER_FILE: &str = "cover";
const CONTENT_FILE: &str = "content";
const RIGHTS_FILE: &str = "rights";
const DOWNLOAD_FILE: &str = "download.json";

/// Directory for in-progress downloads, on the same volume as the records
pub const STAGING_DIR: &str = ".staging";

/// Addresses one book record without touching the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    id: BookId,
    dir: PathBuf,
}

impl RecordHandle {
    pub fn id(&self) -> &BookId {
        &self.id
    }

    /// Record directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// File-backed storage for book records
#[derive(Debug, Clone)]
pub struct LocalBookStore {
    root: PathBuf,
    lock_options: LockOptions,
}

impl LocalBookStore {
    /// Opens the store at `root`, creating the root and staging directories
    pub fn open_root(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;

        log::debug!("Opened book store at {}", root.display());
        Ok(Self {
            root,
            lock_options: LockOptions::default(),
        })
    }

    /// Replaces the lock acquisition settings
    pub fn with_lock_options(mut self, lock_options: LockOptions) -> Self {
        self.lock_options = lock_options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_options(&self) -> &LockOptions {
        &self.lock_options
    }

    /// Returns a handle for `id`; the record need not exist
    pub fn open(&self, id: &BookId) -> RecordHandle {
        RecordHandle {
            id: id.clone(),
            dir: self.root.join(id.as_str()),
        }
    }

    /// Ensures the record directory exists
    pub fn create(&self, handle: &RecordHandle) -> StoreResult<()> {
        fs::create_dir_all(&handle.dir).map_err(|e| StoreError::io(&handle.dir, e))
    }

    /// Returns true if the record directory exists
    pub fn exists(&self, handle: &RecordHandle) -> bool {
        handle.dir.is_dir()
    }

    /// Path of the record's lock file
    pub fn lock_path(&self, handle: &RecordHandle) -> PathBuf {
        handle.file(LOCK_FILE)
    }

    /// Path of the downloaded content, which may not exist
    pub fn content_path(&self, handle: &RecordHandle) -> PathBuf {
        handle.file(CONTENT_FILE)
    }

    fn lock(&self, handle: &RecordHandle) -> StoreResult<RecordLock> {
        if !self.exists(handle) {
            return Err(StoreError::NotFound {
                what: format!("book record {}", handle.id),
            });
        }
        RecordLock::acquire(&self.lock_path(handle), &self.lock_options)
    }

    /// Reads everything stored for a book
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record or its metadata is missing
    /// - `CorruptRecord` if the metadata or download handle cannot be parsed
    pub fn read_snapshot(&self, handle: &RecordHandle) -> StoreResult<BookSnapshot> {
        let _lock = self.lock(handle)?;

        let metadata_path = handle.file(METADATA_FILE);
        let bytes = read_optional(&metadata_path)?.ok_or_else(|| StoreError::NotFound {
            what: format!("metadata for {}", handle.id),
        })?;
        let entry: FeedEntry = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupt(&metadata_path, e))?;

        let download_path = handle.file(DOWNLOAD_FILE);
        let pending_download = match read_optional(&download_path)? {
            Some(bytes) => Some(
                serde_json::from_slice::<DownloadHandle>(&bytes)
                    .map_err(|e| StoreError::corrupt(&download_path, e))?,
            ),
            None => None,
        };

        Ok(BookSnapshot {
            id: handle.id.clone(),
            entry,
            cover_present: handle.file(COVER_FILE).is_file(),
            content_present: handle.file(CONTENT_FILE).is_file(),
            rights: read_optional(&handle.file(RIGHTS_FILE))?,
            pending_download,
        })
    }

    /// Atomically replaces the stored catalog entry
    pub fn write_metadata(&self, handle: &RecordHandle, entry: &FeedEntry) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(entry)?;
        let _lock = self.lock(handle)?;
        write_atomic(&handle.file(METADATA_FILE), &bytes)
    }

    /// Replaces the cover image, or removes it on `None`
    pub fn write_cover(&self, handle: &RecordHandle, cover: Option<&[u8]>) -> StoreResult<()> {
        let _lock = self.lock(handle)?;
        self.write_or_remove(&handle.file(COVER_FILE), cover)
    }

    /// Returns the stored cover image, if any
    pub fn read_cover(&self, handle: &RecordHandle) -> StoreResult<Option<Vec<u8>>> {
        let _lock = self.lock(handle)?;
        read_optional(&handle.file(COVER_FILE))
    }

    /// Moves a finished download into the record as its content
    ///
    /// `source` must be on the same volume as the store; files under
    /// [`LocalBookStore::staging_dir`] always are.
    pub fn write_content(&self, handle: &RecordHandle, source: &Path) -> StoreResult<()> {
        let _lock = self.lock(handle)?;
        move_atomic(source, &handle.file(CONTENT_FILE))
    }

    /// Replaces the rights blob, or removes it on `None`
    pub fn write_rights(&self, handle: &RecordHandle, rights: Option<&[u8]>) -> StoreResult<()> {
        let _lock = self.lock(handle)?;
        self.write_or_remove(&handle.file(RIGHTS_FILE), rights)
    }

    /// Records, or clears on `None`, the handle of an unfinished download
    pub fn write_pending_download(
        &self,
        handle: &RecordHandle,
        download: Option<&DownloadHandle>,
    ) -> StoreResult<()> {
        let bytes = download.map(serde_json::to_vec).transpose()?;
        let _lock = self.lock(handle)?;
        self.write_or_remove(&handle.file(DOWNLOAD_FILE), bytes.as_deref())
    }

    fn write_or_remove(&self, path: &Path, bytes: Option<&[u8]>) -> StoreResult<()> {
        match bytes {
            Some(bytes) => write_atomic(path, bytes),
            None => remove_if_exists(path).map(|_| ()),
        }
    }

    /// Removes only the downloaded content and its rights
    pub fn destroy_content_only(&self, handle: &RecordHandle) -> StoreResult<()> {
        let _lock = self.lock(handle)?;
        remove_if_exists(&handle.file(CONTENT_FILE))?;
        remove_if_exists(&handle.file(RIGHTS_FILE))?;
        Ok(())
    }

    /// Removes the whole record
    ///
    /// Destroying a record that does not exist succeeds.
    pub fn destroy(&self, handle: &RecordHandle) -> StoreResult<()> {
        let lock = match self.lock(handle) {
            Ok(lock) => lock,
            Err(StoreError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        for name in [METADATA_FILE, COVER_FILE, CONTENT_FILE, RIGHTS_FILE, DOWNLOAD_FILE] {
            remove_if_exists(&handle.file(name))?;
        }
        remove_if_exists(lock.path())?;
        drop(lock);

        match fs::remove_dir_all(&handle.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&handle.dir, e)),
        }

        log::debug!("Destroyed record {}", handle.id.short());
        Ok(())
    }

    /// Lists the IDs of every stored record
    ///
    /// Directory entries whose names are not book IDs are skipped.
    pub fn list_all(&self) -> StoreResult<BTreeSet<BookId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if BookId::is_digest(&name) && entry.path().is_dir() {
                ids.insert(BookId::from_raw(name));
            }
        }
        Ok(ids)
    }

    /// Directory for in-progress downloads
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Path of a staging file named `name`
    pub fn staging_path(&self, name: &str) -> PathBuf {
        self.staging_dir().join(name)
    }

    /// Removes every record and staged download, leaving an empty store
    pub fn destroy_all(&self) -> StoreResult<()> {
        for id in self.list_all()? {
            self.destroy(&self.open(&id))?;
        }

        let staging = self.staging_dir();
        match fs::remove_dir_all(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&staging, e)),
        }
        fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;

        log::info!("Removed all book records under {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendshelf_core::Availability;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalBookStore) {
        let temp = TempDir::new().unwrap();
        let store = LocalBookStore::open_root(temp.path().join("books")).unwrap();
        (temp, store)
    }

    fn entry() -> FeedEntry {
        FeedEntry::new("urn:book:store", "Stored", Availability::loaned(None, None))
    }

    #[test]
    fn test_open_root_creates_staging() {
        let (_temp, store) = setup();
        assert!(store.staging_dir().is_dir());
    }

    #[test]
    fn test_snapshot_of_missing_record() {
        let (_temp, store) = setup();
        let handle = store.open(&BookId::from_entry(&entry()));

        let result = store.read_snapshot(&handle);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_metadata_and_snapshot() {
        let (_temp, store) = setup();
        let entry = entry();
        let handle = store.open(&BookId::from_entry(&entry));
        store.create(&handle).unwrap();
        store.write_metadata(&handle, &entry).unwrap();

        let snapshot = store.read_snapshot(&handle).unwrap();
        assert_eq!(snapshot.entry, entry);
        assert!(!snapshot.cover_present);
        assert!(!snapshot.content_present);
        assert!(snapshot.rights.is_none());
        assert!(snapshot.pending_download.is_none());
    }

    #[test]
    fn test_write_metadata_without_record_fails() {
        let (_temp, store) = setup();
        let entry = entry();
        let handle = store.open(&BookId::from_entry(&entry));

        assert!(store.write_metadata(&handle, &entry).is_err());
        assert!(!store.exists(&handle));
    }

    #[test]
    fn test_cover_write_and_remove() {
        let (_temp, store) = setup();
        let entry = entry();
        let handle = store.open(&BookId::from_entry(&entry));
        store.create(&handle).unwrap();
        store.write_metadata(&handle, &entry).unwrap();

        store.write_cover(&handle, Some(b"jpeg")).unwrap();
        assert_eq!(store.read_cover(&handle).unwrap(), Some(b"jpeg".to_vec()));
        assert!(store.read_snapshot(&handle).unwrap().cover_present);

        store.write_cover(&handle, None).unwrap();
        assert_eq!(store.read_cover(&handle).unwrap(), None);
    }

    #[test]
    fn test_pending_download_handle() {
        let (_temp, store) = setup();
        let entry = entry();
        let handle = store.open(&BookId::from_entry(&entry));
        store.create(&handle).unwrap();
        store.write_metadata(&handle, &entry).unwrap();

        let download = DownloadHandle::new("dl-7");
        store.write_pending_download(&handle, Some(&download)).unwrap();
        assert_eq!(
            store.read_snapshot(&handle).unwrap().pending_download,
            Some(download)
        );

        store.write_pending_download(&handle, None).unwrap();
        assert!(store.read_snapshot(&handle).unwrap().pending_download.is_none());
    }

    #[test]
    fn test_corrupt_metadata() {
        let (_temp, store) = setup();
        let handle = store.open(&BookId::from_entry(&entry()));
        store.create(&handle).unwrap();
        fs::write(handle.dir().join(METADATA_FILE), b"{not json").unwrap();

        let result = store.read_snapshot(&handle);
        assert!(matches!(result, Err(StoreError::CorruptRecord { .. })));
    }

    #[test]
    fn test_list_all_skips_foreign_names() {
        let (_temp, store) = setup();
        let entry = entry();
        let id = BookId::from_entry(&entry);
        store.create(&store.open(&id)).unwrap();
        fs::create_dir_all(store.root().join("not-a-book")).unwrap();
        fs::write(store.root().join("credentials.json"), b"{}").unwrap();

        let ids = store.list_all().unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&id));
    }

    #[test]
    fn test_destroy_missing_record_succeeds() {
        let (_temp, store) = setup();
        let handle = store.open(&BookId::from_entry(&entry()));
        assert!(store.destroy(&handle).is_ok());
    }
}
