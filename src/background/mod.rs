//! Background tasks: operations that outlive the response they belong to.
//!
//! A strategy that starts work it does not wait for (populating the cache
//! after a response has been handed back, revalidating a stale entry) hands
//! that work to [`BackgroundTasks`]. The host owns the registrar and must call
//! [`BackgroundTasks::settle`] before tearing down the execution context;
//! anything registered but never settled is a lost cache update.
//!
//! Failures of background work never reach the original caller. They are
//! logged here and collected into the [`SettleReport`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;

struct Registered {
    label: String,
    handle: JoinHandle<()>,
}

/// Why a background task did not complete cleanly.
#[derive(Debug)]
pub enum TaskFailure {
    /// The task ran to completion and returned an error.
    Failed { label: String, error: Error },
    /// The task panicked or was cancelled by the runtime.
    Aborted { label: String, reason: String },
}

impl TaskFailure {
    pub fn label(&self) -> &str {
        match self {
            Self::Failed { label, .. } | Self::Aborted { label, .. } => label,
        }
    }
}

/// Outcome of [`BackgroundTasks::settle`].
#[derive(Debug, Default)]
pub struct SettleReport {
    /// Tasks that finished with `Ok(())`.
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

impl SettleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry state. A task that returns removes its own handle from `running`
/// and folds its outcome into `finished`, so only in-flight work (and tasks
/// that panicked) keep a handle.
#[derive(Default)]
struct State {
    next_id: u64,
    running: HashMap<u64, Registered>,
    finished: SettleReport,
}

/// A shared registrar of in-flight background work.
///
/// Cloning produces another handle to the same registrar. Registered futures
/// are spawned immediately onto the current tokio runtime, so they make
/// progress whether or not anybody is settling yet. Finished tasks release
/// their handles right away; only their outcome is kept until the next
/// [`settle`](Self::settle), so one registrar can serve a long-lived host.
///
/// # Examples
///
/// ```
/// use rtcache::background::BackgroundTasks;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tasks = BackgroundTasks::new();
/// tasks.register("warm-up", async { Ok(()) });
/// assert_eq!(tasks.pending(), 1);
///
/// let report = tasks.settle().await;
/// assert_eq!(report.completed, 1);
/// assert!(report.is_clean());
/// assert_eq!(tasks.pending(), 0);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<State>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` and tracks it until it finishes.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn register<F>(&self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let label = label.into();
        debug!(task = %label, "background task registered");

        // Held across the spawn so the task cannot finish before its handle is recorded.
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;

        let shared = Arc::clone(&self.inner);
        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let outcome = task.await;
            let mut state = shared.lock();
            state.running.remove(&id);
            match outcome {
                Ok(()) => state.finished.completed += 1,
                Err(error) => {
                    warn!(task = %task_label, error = %error, "background task failed");
                    state.finished.failures.push(TaskFailure::Failed {
                        label: task_label,
                        error,
                    });
                }
            }
        });
        state.running.insert(id, Registered { label, handle });
    }

    /// Number of registered tasks still running or not yet collected.
    pub fn pending(&self) -> usize {
        self.inner.lock().running.len()
    }

    /// Waits for every registered task, including tasks registered while
    /// settling, and reports how they ended since the previous settle.
    pub async fn settle(&self) -> SettleReport {
        loop {
            let batch: Vec<Registered> = {
                let mut state = self.inner.lock();
                state.running.drain().map(|(_, registered)| registered).collect()
            };
            if batch.is_empty() {
                break;
            }
            for Registered { label, handle } in batch {
                if let Err(join_error) = handle.await {
                    warn!(task = %label, error = %join_error, "background task aborted");
                    self.inner.lock().finished.failures.push(TaskFailure::Aborted {
                        label,
                        reason: join_error.to_string(),
                    });
                }
            }
        }
        std::mem::take(&mut self.inner.lock().finished)
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[tokio::test]
    async fn failures_are_collected_not_raised() {
        let tasks = BackgroundTasks::new();
        tasks.register("ok", async { Ok(()) });
        tasks.register("bad", async { Err(StorageError::new("c", "disk full").into()) });

        let report = tasks.settle().await;
        assert_eq!(report.completed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label(), "bad");
        assert!(matches!(
            report.failures[0],
            TaskFailure::Failed {
                error: Error::Storage(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let tasks = BackgroundTasks::new();
        tasks.register("explodes", async { panic!("boom") });
        let report = tasks.settle().await;
        assert!(matches!(report.failures[0], TaskFailure::Aborted { .. }));
    }

    #[tokio::test]
    async fn settle_includes_tasks_registered_by_tasks() {
        let tasks = BackgroundTasks::new();
        let nested = tasks.clone();
        tasks.register("outer", async move {
            nested.register("inner", async { Ok(()) });
            Ok(())
        });

        let report = tasks.settle().await;
        assert_eq!(report.completed, 2);
    }

    #[tokio::test]
    async fn clones_share_registrations() {
        let tasks = BackgroundTasks::new();
        let other = tasks.clone();
        other.register("shared", async { Ok(()) });
        assert_eq!(tasks.pending(), 1);
        tasks.settle().await;
        assert_eq!(other.pending(), 0);
    }

    #[tokio::test]
    async fn finished_tasks_release_their_handles_before_settle() {
        let tasks = BackgroundTasks::new();
        for i in 0..16 {
            tasks.register(format!("job-{i}"), async { Ok(()) });
        }
        tasks.register("bad", async { Err(StorageError::new("c", "disk full").into()) });
        assert_eq!(tasks.pending(), 17);

        // Let every spawned task run to completion without settling.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(tasks.pending(), 0);

        let report = tasks.settle().await;
        assert_eq!(report.completed, 16);
        assert_eq!(report.failures.len(), 1);
        assert!(tasks.settle().await.is_clean());
    }
}
