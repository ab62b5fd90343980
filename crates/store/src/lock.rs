//! Advisory file locks with bounded retry
//!
//! Every record owns a lock file. [`RecordLock::acquire`] opens it and polls
//! a non-blocking exclusive lock until it succeeds or the timeout elapses.
//! Each acquisition opens its own file description, so two threads of the
//! same process contend exactly like two processes do, and a thread that
//! already holds a record's lock will time out if it tries to take it again.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default delay between lock attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default time to wait for a busy lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Lock acquisition settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Delay between attempts
    pub poll_interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl LockOptions {
    /// Creates options with a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates options with a custom poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// A held exclusive lock, released on drop
#[derive(Debug)]
pub struct RecordLock {
    file: File,
    path: PathBuf,
}

impl RecordLock {
    /// Acquires the lock file at `path`, creating it if needed
    ///
    /// # Errors
    ///
    /// - `LockTimeout` if another holder keeps the lock past `options.timeout`
    /// - `Io` if the lock file cannot be opened (for example when the record
    ///   directory does not exist)
    pub fn acquire(path: &Path, options: &LockOptions) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }

            let waited = started.elapsed();
            if waited >= options.timeout {
                log::debug!("Lock {} still busy after {:?}", path.display(), waited);
                return Err(StoreError::LockTimeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            std::thread::sleep(options.poll_interval);
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
