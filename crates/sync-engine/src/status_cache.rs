// crates/sync-engine/src/status_cache.rs
//! In-memory book statuses with change notification

use lendshelf_core::{BookId, BookSnapshot, BookStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&BookId) + Send + Sync>;

#[derive(Debug, Clone)]
struct CachedEntry {
    status: BookStatus,
    snapshot: Option<BookSnapshot>,
}

/// When an incoming status replaces the cached one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Always,
    /// Importance order, for updates from a running task
    IfMoreImportant,
    /// Status derived from the stored record
    Refresh,
}

impl Rule {
    fn admits(self, incoming: &BookStatus, cached: &BookStatus) -> bool {
        match self {
            Rule::Always => true,
            Rule::IfMoreImportant => incoming.supersedes(cached),
            Rule::Refresh => incoming.refreshes(cached),
        }
    }
}

struct Entries {
    map: HashMap<BookId, CachedEntry>,
    /// Bumped by every [`StatusCache::clear_all`]
    generation: u64,
}

/// The current status of every known book
///
/// Observers receive only the affected [`BookId`] and re-query [`StatusCache::get`].
/// They run on the thread that made the change, after the map lock has been
/// released, so an observer may call back into the cache.
pub struct StatusCache {
    entries: Mutex<Entries>,
    observers: Mutex<BTreeMap<SubscriptionId, Observer>>,
    next_subscription: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                generation: 0,
            }),
            observers: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn get(&self, id: &BookId) -> Option<BookStatus> {
        lock(&self.entries).map.get(id).map(|entry| entry.status.clone())
    }

    /// Last snapshot stored beside the status, if any
    pub fn snapshot(&self, id: &BookId) -> Option<BookSnapshot> {
        lock(&self.entries)
            .map
            .get(id)
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Every cached status, ordered by book ID
    pub fn statuses(&self) -> Vec<BookStatus> {
        let mut statuses: Vec<BookStatus> = lock(&self.entries)
            .map
            .values()
            .map(|entry| entry.status.clone())
            .collect();
        statuses.sort_by(|a, b| a.id().cmp(b.id()));
        statuses
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).map.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).map.is_empty()
    }

    /// Number of times the cache has been cleared wholesale
    pub fn generation(&self) -> u64 {
        lock(&self.entries).generation
    }

    /// Replaces the status, keeping any stored snapshot
    pub fn put(&self, status: BookStatus) {
        self.apply(status, None, Rule::Always, None);
    }

    /// Replaces both the status and the snapshot
    pub fn put_with_snapshot(&self, status: BookStatus, snapshot: BookSnapshot) {
        self.apply(status, Some(snapshot), Rule::Always, None);
    }

    /// Applies `status` unless the cached status is more important
    ///
    /// Returns whether the update was applied. Observers are notified only
    /// when it was.
    pub fn put_if_more_important(&self, status: BookStatus) -> bool {
        self.apply(status, None, Rule::IfMoreImportant, None)
    }

    /// Applies a status derived from the stored record
    ///
    /// It replaces any cached status except one published by a task that is
    /// still running. Returns whether the update was applied.
    pub fn refresh(&self, status: BookStatus, snapshot: BookSnapshot) -> bool {
        self.apply(status, Some(snapshot), Rule::Refresh, None)
    }

    /// A writer whose updates are dropped once the cache has been cleared
    pub fn publisher(self: &Arc<Self>) -> Publisher {
        Publisher {
            generation: self.generation(),
            cache: Arc::clone(self),
        }
    }

    fn apply(
        &self,
        status: BookStatus,
        snapshot: Option<BookSnapshot>,
        rule: Rule,
        generation: Option<u64>,
    ) -> bool {
        let id = status.id().clone();
        {
            let mut entries = lock(&self.entries);
            if let Some(expected) = generation {
                if entries.generation != expected {
                    log::debug!(
                        "Dropped {} for {} from before the cache was cleared",
                        status.kind(),
                        id.short()
                    );
                    return false;
                }
            }

            match entries.map.get_mut(&id) {
                Some(cached) if !rule.admits(&status, &cached.status) => {
                    log::trace!(
                        "Kept {} for {} over incoming {}",
                        cached.status.kind(),
                        id.short(),
                        status.kind()
                    );
                    return false;
                }
                Some(cached) => {
                    cached.status = status;
                    if snapshot.is_some() {
                        cached.snapshot = snapshot;
                    }
                }
                None => {
                    entries.map.insert(id.clone(), CachedEntry { status, snapshot });
                }
            }
        }
        self.notify(&[id]);
        true
    }

    /// Forgets one book, notifying observers if it was cached
    pub fn clear(&self, id: &BookId) {
        let removed = lock(&self.entries).map.remove(id).is_some();
        if removed {
            self.notify(std::slice::from_ref(id));
        }
    }

    /// Forgets every book, notifying observers once per removed book
    ///
    /// Publishers created before the call stop writing.
    pub fn clear_all(&self) {
        let removed: Vec<BookId> = {
            let mut entries = lock(&self.entries);
            entries.generation += 1;
            entries.map.drain().map(|(id, _)| id).collect()
        };
        self.notify(&removed);
    }

    /// Registers an observer called with the ID of every changed book
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&BookId) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).insert(id, Arc::new(observer));
        id
    }

    /// Removes an observer, returning whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.observers).remove(&id).is_some()
    }

    fn notify(&self, ids: &[BookId]) {
        if ids.is_empty() {
            return;
        }
        let observers: Vec<Observer> = lock(&self.observers).values().cloned().collect();
        for id in ids {
            for observer in &observers {
                observer(id);
            }
        }
    }
}

/// Status updates on behalf of one task
///
/// Bound to the cache generation current when it was created. After a
/// [`StatusCache::clear_all`] every write is dropped and returns `false`, so
/// a task outliving a logout cannot repopulate the cache.
#[derive(Clone)]
pub struct Publisher {
    cache: Arc<StatusCache>,
    generation: u64,
}

impl Publisher {
    /// Returns false once the cache has been cleared since creation
    pub fn is_current(&self) -> bool {
        self.cache.generation() == self.generation
    }

    pub fn put(&self, status: BookStatus) -> bool {
        self.cache
            .apply(status, None, Rule::Always, Some(self.generation))
    }

    pub fn put_with_snapshot(&self, status: BookStatus, snapshot: BookSnapshot) -> bool {
        self.cache
            .apply(status, Some(snapshot), Rule::Always, Some(self.generation))
    }

    pub fn put_if_more_important(&self, status: BookStatus) -> bool {
        self.cache
            .apply(status, None, Rule::IfMoreImportant, Some(self.generation))
    }

    pub fn refresh(&self, status: BookStatus, snapshot: BookSnapshot) -> bool {
        self.cache
            .apply(status, Some(snapshot), Rule::Refresh, Some(self.generation))
    }

    pub fn clear(&self, id: &BookId) {
        if self.is_current() {
            self.cache.clear(id);
        }
    }

    pub fn get(&self, id: &BookId) -> Option<BookStatus> {
        self.cache.get(id)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache")
            .field("entries", &self.len())
            .field("observers", &lock(&self.observers).len())
            .finish()
    }
}
