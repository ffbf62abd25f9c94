//! Task executor implementation.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, warn};

use crate::metrics;

use super::types::{ExecutorStatus, SubmitOutcome};

/// Counters for finished and dropped executions.
#[derive(Default)]
struct ExecutorStats {
    total_started: AtomicU64,
    total_succeeded: AtomicU64,
    total_failed: AtomicU64,
    total_deduplicated: AtomicU64,
}

struct Inner {
    running: Mutex<HashSet<String>>,
    /// Present when concurrency is bounded.
    slots: Option<Arc<Semaphore>>,
    max_concurrent: usize,
    stats: ExecutorStats,
    idle: Notify,
}

impl Inner {
    fn running(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases a task id when its execution ends, however it ends.
struct RunningGuard {
    inner: Arc<Inner>,
    id: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let now_idle = {
            let mut running = self.inner.running();
            running.remove(&self.id);
            running.is_empty()
        };
        metrics::TASKS_ACTIVE.dec();
        if now_idle {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Runs task routines concurrently, at most one per task id.
///
/// Cloning yields another handle to the same executor.
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TaskExecutor {
    /// Create an executor running at most `max_concurrent` executions at
    /// once (0 = unlimited).
    pub fn new(max_concurrent: usize) -> Self {
        let slots = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));

        Self {
            inner: Arc::new(Inner {
                running: Mutex::new(HashSet::new()),
                slots,
                max_concurrent,
                stats: ExecutorStats::default(),
                idle: Notify::new(),
            }),
        }
    }

    /// Spawn `work` for `id` unless an execution for `id` is already in flight.
    ///
    /// Returns without waiting for the work. Errors returned by the work are
    /// logged and counted; a panic is contained. Either way `id` is released
    /// when the execution ends. Must be called within a tokio runtime.
    pub fn submit<F, E>(&self, id: impl Into<String>, work: F) -> SubmitOutcome
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let id = id.into();

        {
            let mut running = self.inner.running();
            if !running.insert(id.clone()) {
                self.inner
                    .stats
                    .total_deduplicated
                    .fetch_add(1, Ordering::Relaxed);
                metrics::TASKS_DEDUPLICATED.inc();
                debug!(task_id = %id, "Task already running, dropping submission");
                return SubmitOutcome::AlreadyRunning;
            }
        }

        self.inner.stats.total_started.fetch_add(1, Ordering::Relaxed);
        metrics::TASKS_STARTED.inc();
        metrics::TASKS_ACTIVE.inc();

        let guard = RunningGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let _permit = match &inner.slots {
                Some(slots) => match Arc::clone(slots).acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        error!(task_id = %guard.id, "Executor slots closed, abandoning task");
                        inner.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                },
                None => None,
            };

            let start = Instant::now();
            // Run on its own task so a panic surfaces as a JoinError here
            let result = match tokio::spawn(work).await {
                Ok(Ok(())) => {
                    inner.stats.total_succeeded.fetch_add(1, Ordering::Relaxed);
                    debug!(task_id = %guard.id, "Task execution finished");
                    "success"
                }
                Ok(Err(e)) => {
                    inner.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(task_id = %guard.id, error = %e, "Task execution failed");
                    "failed"
                }
                Err(e) => {
                    inner.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    error!(task_id = %guard.id, error = %e, "Task execution panicked");
                    "panicked"
                }
            };

            metrics::TASK_RUNS.with_label_values(&[result]).inc();
            metrics::TASK_DURATION
                .with_label_values(&[result])
                .observe(start.elapsed().as_secs_f64());
            drop(guard);
        });

        SubmitOutcome::Started
    }

    /// Whether an execution for `id` is in flight.
    pub fn is_running(&self, id: &str) -> bool {
        self.inner.running().contains(id)
    }

    /// Ids with an execution in flight, sorted.
    pub fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.running().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Current activity snapshot.
    pub fn status(&self) -> ExecutorStatus {
        let stats = &self.inner.stats;
        ExecutorStatus {
            active: self.inner.running().len(),
            max_concurrent: self.inner.max_concurrent,
            total_started: stats.total_started.load(Ordering::Relaxed),
            total_succeeded: stats.total_succeeded.load(Ordering::Relaxed),
            total_failed: stats.total_failed.load(Ordering::Relaxed),
            total_deduplicated: stats.total_deduplicated.load(Ordering::Relaxed),
        }
    }

    /// Resolve once no execution is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();

            if self.inner.running().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_duplicate_submission_runs_once() {
        let executor = TaskExecutor::new(0);
        let runs = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let counter = Arc::clone(&runs);
        let first = executor.submit("abc123", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = release_rx.await;
            Ok::<(), String>(())
        });
        assert_eq!(first, SubmitOutcome::Started);
        assert!(executor.is_running("abc123"));

        let counter = Arc::clone(&runs);
        let second = executor.submit("abc123", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        });
        assert_eq!(second, SubmitOutcome::AlreadyRunning);

        release_tx.send(()).unwrap();
        executor.wait_idle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let status = executor.status();
        assert_eq!(status.total_started, 1);
        assert_eq!(status.total_succeeded, 1);
        assert_eq!(status.total_deduplicated, 1);
        assert_eq!(status.active, 0);
    }

    #[tokio::test]
    async fn test_id_released_after_completion() {
        let executor = TaskExecutor::new(0);
        executor.submit("a", async { Ok::<(), String>(()) });
        executor.wait_idle().await;

        assert!(!executor.is_running("a"));
        assert_eq!(
            executor.submit("a", async { Ok::<(), String>(()) }),
            SubmitOutcome::Started
        );
        executor.wait_idle().await;
        assert_eq!(executor.status().total_started, 2);
    }

    #[tokio::test]
    async fn test_failed_work_is_released_and_counted() {
        let executor = TaskExecutor::new(0);
        executor.submit("a", async { Err::<(), _>("stage failed".to_string()) });
        executor.wait_idle().await;

        let status = executor.status();
        assert_eq!(status.total_failed, 1);
        assert_eq!(status.total_succeeded, 0);
        assert!(!executor.is_running("a"));
    }

    #[tokio::test]
    async fn test_panicking_work_is_contained() {
        let executor = TaskExecutor::new(0);
        executor.submit("a", async {
            if true {
                panic!("boom");
            }
            Ok::<(), String>(())
        });
        executor.wait_idle().await;

        assert_eq!(executor.status().total_failed, 1);
        assert!(!executor.is_running("a"));
        assert_eq!(
            executor.submit("a", async { Ok::<(), String>(()) }),
            SubmitOutcome::Started
        );
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_distinct_ids_run_concurrently() {
        let executor = TaskExecutor::new(0);
        let (tx_a, rx_a) = oneshot::channel::<()>();
        let (tx_b, rx_b) = oneshot::channel::<()>();

        executor.submit("a", async move {
            let _ = rx_a.await;
            Ok::<(), String>(())
        });
        executor.submit("b", async move {
            let _ = rx_b.await;
            Ok::<(), String>(())
        });

        assert_eq!(executor.running_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(executor.status().active, 2);

        tx_b.send(()).unwrap();
        tx_a.send(()).unwrap();
        executor.wait_idle().await;
        assert!(executor.running_ids().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let executor = TaskExecutor::new(1);
        let started = Arc::new(AtomicUsize::new(0));
        let (tx_a, rx_a) = oneshot::channel::<()>();

        let counter = Arc::clone(&started);
        executor.submit("a", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = rx_a.await;
            Ok::<(), String>(())
        });
        let counter = Arc::clone(&started);
        executor.submit("b", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        });

        eventually(|| started.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // Waiting work still counts as running for deduplication
        assert!(executor.is_running("b"));
        assert_eq!(
            executor.submit("b", async { Ok::<(), String>(()) }),
            SubmitOutcome::AlreadyRunning
        );

        tx_a.send(()).unwrap();
        executor.wait_idle().await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(executor.status().max_concurrent, 1);
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_empty() {
        let executor = TaskExecutor::default();
        tokio::time::timeout(Duration::from_secs(1), executor.wait_idle())
            .await
            .unwrap();
    }
}
