//! Task status storage trait and types.

use thiserror::Error;

use super::{TaskRecord, TaskStatus};

/// Error type for task status store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the task.
    #[error("task not found: {0}")]
    NotFound(String),

    /// A record already exists for the task.
    #[error("task already exists: {0}")]
    AlreadyExists(String),

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),
}

/// Filter for listing task records.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    /// Only records with this `done` flag.
    pub done: Option<bool>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            done: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by completion.
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Durable mapping from task identity to task status.
///
/// Every `create`/`update` either persists fully or leaves the previous
/// value untouched. Calls on the same key are serialized.
pub trait TaskStatusStore: Send + Sync {
    /// Whether a record exists for the task.
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Create the initial record. Fails with `AlreadyExists` if present.
    fn create(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, StoreError>;

    /// Get a record. Fails with `NotFound` if absent.
    fn get(&self, id: &str) -> Result<TaskRecord, StoreError>;

    /// Replace the full status. Fails with `NotFound` if absent.
    fn update(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, StoreError>;

    /// List records matching the filter, most recently updated first.
    fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError>;

    /// Count records matching the filter.
    fn count(&self, filter: &TaskFilter) -> Result<i64, StoreError>;
}
