//! Tests for record locking, atomicity and destruction

use lendshelf_core::{Availability, BookId, DownloadHandle, FeedEntry};
use lendshelf_store::{LocalBookStore, LockOptions, RecordLock, StoreError};
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn setup() -> (TempDir, LocalBookStore) {
    let temp = TempDir::new().unwrap();
    let store = LocalBookStore::open_root(temp.path()).unwrap();
    (temp, store)
}

fn loaned(id: &str) -> FeedEntry {
    FeedEntry::new(id, "Loaned Book", Availability::loaned(None, None))
}

#[test]
fn test_held_lock_blocks_store_operations() {
    let (_temp, store) = setup();
    let store = store.with_lock_options(
        LockOptions::default()
            .with_timeout(Duration::from_millis(80))
            .with_poll_interval(Duration::from_millis(5)),
    );
    let entry = loaned("urn:lock:1");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();

    let _held = RecordLock::acquire(&store.lock_path(&handle), store.lock_options()).unwrap();

    let result = store.write_cover(&handle, Some(b"cover"));
    assert!(matches!(result, Err(StoreError::LockTimeout { .. })));
    assert!(result.unwrap_err().is_retryable());
}

#[test]
fn test_operation_waits_for_release() {
    let (_temp, store) = setup();
    let entry = loaned("urn:lock:2");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();

    let held = RecordLock::acquire(&store.lock_path(&handle), store.lock_options()).unwrap();
    let started = Instant::now();

    let worker_store = store.clone();
    let worker_handle = handle.clone();
    let worker = thread::spawn(move || worker_store.write_rights(&worker_handle, Some(b"rights")));

    thread::sleep(Duration::from_millis(150));
    drop(held);

    worker.join().unwrap().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(
        store.read_snapshot(&handle).unwrap().rights,
        Some(b"rights".to_vec())
    );
}

#[test]
fn test_concurrent_writers_never_interleave() {
    let (_temp, store) = setup();
    let entry = loaned("urn:lock:3");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let workers: Vec<_> = (0..4u8)
        .map(|n| {
            let store = store.clone();
            let handle = handle.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let blob = vec![n; 64 * 1024];
                barrier.wait();
                for _ in 0..10 {
                    store.write_cover(&handle, Some(&blob)).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let cover = store.read_cover(&handle).unwrap().unwrap();
    assert_eq!(cover.len(), 64 * 1024);
    assert!(cover.iter().all(|b| *b == cover[0]));
}

#[test]
fn test_leftover_temp_file_is_ignored() {
    let (_temp, store) = setup();
    let entry = loaned("urn:crash:1");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();

    // A write that died before its rename leaves a stray temp file.
    fs::write(handle.dir().join(".tmpXk2c9a"), b"{\"id\": \"urn:cr").unwrap();

    let snapshot = store.read_snapshot(&handle).unwrap();
    assert_eq!(snapshot.entry, entry);
}

#[test]
fn test_write_content_moves_staged_file() {
    let (_temp, store) = setup();
    let entry = loaned("urn:content:1");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();

    let staged = store.staging_path("download-1");
    fs::write(&staged, b"epub bytes").unwrap();
    store.write_content(&handle, &staged).unwrap();

    assert!(!staged.exists());
    assert_eq!(fs::read(store.content_path(&handle)).unwrap(), b"epub bytes");
    assert!(store.read_snapshot(&handle).unwrap().content_present);
}

#[test]
fn test_destroy_content_only_keeps_metadata() {
    let (_temp, store) = setup();
    let entry = loaned("urn:content:2");
    let handle = store.open(&BookId::from_entry(&entry));
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();
    store.write_rights(&handle, Some(b"license")).unwrap();
    let staged = store.staging_path("download-2");
    fs::write(&staged, b"epub").unwrap();
    store.write_content(&handle, &staged).unwrap();

    store.destroy_content_only(&handle).unwrap();

    let snapshot = store.read_snapshot(&handle).unwrap();
    assert!(!snapshot.content_present);
    assert!(snapshot.rights.is_none());
    assert_eq!(snapshot.entry, entry);
}

#[test]
fn test_destroy_removes_record() {
    let (_temp, store) = setup();
    let entry = loaned("urn:destroy:1");
    let id = BookId::from_entry(&entry);
    let handle = store.open(&id);
    store.create(&handle).unwrap();
    store.write_metadata(&handle, &entry).unwrap();
    store
        .write_pending_download(&handle, Some(&DownloadHandle::new("dl")))
        .unwrap();

    store.destroy(&handle).unwrap();

    assert!(!handle.dir().exists());
    assert!(!store.list_all().unwrap().contains(&id));
    assert!(matches!(
        store.read_snapshot(&handle),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_destroy_all_empties_store() {
    let (_temp, store) = setup();
    for n in 0..3 {
        let entry = loaned(&format!("urn:all:{}", n));
        let handle = store.open(&BookId::from_entry(&entry));
        store.create(&handle).unwrap();
        store.write_metadata(&handle, &entry).unwrap();
    }
    fs::write(store.staging_path("partial"), b"half").unwrap();

    store.destroy_all().unwrap();

    assert!(store.list_all().unwrap().is_empty());
    assert!(store.staging_dir().is_dir());
    assert!(!store.staging_path("partial").exists());
}
