//! Concurrent task executor with per-identity deduplication.
//!
//! At most one execution per task id runs at any time. Submitting an id that
//! is already running drops the new work; it is not queued.

mod runner;
mod types;

pub use runner::TaskExecutor;
pub use types::{ExecutorStatus, SubmitOutcome};
