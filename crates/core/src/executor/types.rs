//! Types for the task executor.

use serde::{Deserialize, Serialize};

/// Result of submitting work for a task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The work was spawned.
    Started,
    /// An execution for this id is in flight; the work was dropped.
    AlreadyRunning,
}

/// Snapshot of executor activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStatus {
    /// Executions currently registered (running or waiting for a slot).
    pub active: usize,
    /// Maximum executions running at once (0 = unlimited).
    pub max_concurrent: usize,
    /// Executions started since startup.
    pub total_started: u64,
    /// Executions that finished with `Ok`.
    pub total_succeeded: u64,
    /// Executions that returned an error or panicked.
    pub total_failed: u64,
    /// Submissions dropped because the id was already running.
    pub total_deduplicated: u64,
}
