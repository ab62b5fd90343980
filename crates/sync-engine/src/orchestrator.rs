// crates/sync-engine/src/orchestrator.rs
//! Background task submission and bulk cancellation

use crate::cancel::CancelToken;
use crate::error::{TaskError, TaskResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

/// Monotonic identifier of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// What a background task does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    LoadAccountData,
    Login,
    Sync,
    Borrow,
    Revoke,
    UpdateMetadata,
    GenerateFeed,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskKind::LoadAccountData => "load-account-data",
            TaskKind::Login => "login",
            TaskKind::Sync => "sync",
            TaskKind::Borrow => "borrow",
            TaskKind::Revoke => "revoke",
            TaskKind::UpdateMetadata => "update-metadata",
            TaskKind::GenerateFeed => "generate-feed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
struct InFlightTask {
    kind: TaskKind,
    token: CancelToken,
}

type Registry = Arc<Mutex<HashMap<TaskId, InFlightTask>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<TaskId, InFlightTask>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a task from the registry when its future finishes or is dropped
struct Deregister {
    registry: Registry,
    id: TaskId,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.id);
    }
}

/// Runs tasks on a shared runtime and tracks the ones still in flight
#[derive(Debug, Clone)]
pub struct TaskOrchestrator {
    runtime: Handle,
    next_id: Arc<AtomicU64>,
    registry: Registry,
}

impl TaskOrchestrator {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: Arc::new(AtomicU64::new(1)),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Uses the runtime the caller is running on
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Submits a task and returns immediately
    ///
    /// `body` receives the task's cancellation token. The task is registered
    /// before it is spawned, so [`TaskOrchestrator::cancel_all`] can always
    /// reach it.
    pub fn submit<T, F, Fut>(&self, kind: TaskKind, body: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancelToken::new();

        lock(&self.registry).insert(
            id,
            InFlightTask {
                kind,
                token: token.clone(),
            },
        );

        let guard = Deregister {
            registry: Arc::clone(&self.registry),
            id,
        };
        let future = body(token);

        log::debug!("Submitting {} ({})", id, kind);
        let join = self.runtime.spawn(async move {
            let _guard = guard;
            let result = future.await;
            match &result {
                Ok(_) => log::debug!("{} ({}) finished", id, kind),
                Err(TaskError::Cancelled) => log::debug!("{} ({}) cancelled", id, kind),
                Err(e) => log::warn!("{} ({}) failed: {}", id, kind, e),
            }
            result
        });

        TaskHandle { id, kind, join }
    }

    /// Cancels every in-flight task, returning how many were signalled
    ///
    /// The registry is emptied before any token is cancelled, so it is empty
    /// when this returns even if the tasks take a while to wind down.
    pub fn cancel_all(&self) -> usize {
        let cancelled = std::mem::take(&mut *lock(&self.registry));
        for task in cancelled.values() {
            task.token.cancel();
        }
        if !cancelled.is_empty() {
            log::info!("Cancelled {} in-flight task(s)", cancelled.len());
        }
        cancelled.len()
    }

    /// Tasks submitted and not yet finished, ordered by ID
    pub fn in_flight(&self) -> Vec<(TaskId, TaskKind)> {
        let mut tasks: Vec<(TaskId, TaskKind)> = lock(&self.registry)
            .iter()
            .map(|(id, task)| (*id, task.kind))
            .collect();
        tasks.sort_by_key(|(id, _)| *id);
        tasks
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.registry).len()
    }
}

/// The result side of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    kind: TaskKind,
    join: JoinHandle<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task's result
    pub async fn join(self) -> TaskResult<T> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(join_error(e)),
        }
    }
}

fn join_error(err: JoinError) -> TaskError {
    if !err.is_panic() {
        return TaskError::Cancelled;
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    TaskError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_and_join() {
        let orchestrator = TaskOrchestrator::current();
        let handle = orchestrator.submit(TaskKind::Sync, |_token| async { Ok(7) });

        assert_eq!(handle.kind(), TaskKind::Sync);
        assert_eq!(handle.join().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let orchestrator = TaskOrchestrator::current();
        let first = orchestrator.submit(TaskKind::Login, |_| async { Ok(()) });
        let second = orchestrator.submit(TaskKind::Login, |_| async { Ok(()) });

        assert!(second.id() > first.id());
        first.join().await.unwrap();
        second.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_finished_task_deregisters() {
        let orchestrator = TaskOrchestrator::current();
        let handle = orchestrator.submit(TaskKind::GenerateFeed, |_| async { Ok(()) });
        handle.join().await.unwrap();

        assert_eq!(orchestrator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_empties_registry() {
        let orchestrator = TaskOrchestrator::current();
        let handle = orchestrator.submit(TaskKind::Sync, |token| async move {
            token.cancelled().await;
            Err::<(), _>(TaskError::Cancelled)
        });

        assert_eq!(orchestrator.in_flight(), vec![(handle.id(), TaskKind::Sync)]);
        assert_eq!(orchestrator.cancel_all(), 1);
        assert_eq!(orchestrator.in_flight_count(), 0);

        let result = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap();
        assert!(matches!(result, Err(TaskError::Cancelled)));
    }

    #[tokio::test]
    async fn test_panic_surfaces_through_handle() {
        let orchestrator = TaskOrchestrator::current();
        let handle = orchestrator.submit(TaskKind::Borrow, |_| async {
            if true {
                panic!("record exploded");
            }
            Ok(())
        });

        match handle.join().await {
            Err(TaskError::Panicked(message)) => assert!(message.contains("record exploded")),
            other => panic!("expected panic, got {:?}", other),
        }
        assert_eq!(orchestrator.in_flight_count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskKind::LoadAccountData.to_string(), "load-account-data");
        assert_eq!(TaskId(3).to_string(), "task-3");
    }
}
