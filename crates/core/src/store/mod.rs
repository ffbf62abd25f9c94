//! Durable task status store.
//!
//! Records which pipeline checkpoints each task has reached, keyed by task
//! identity. Records are never deleted and double as the completion ledger.

mod sqlite_store;
mod traits;
mod types;

pub use sqlite_store::SqliteTaskStore;
pub use traits::{StoreError, TaskFilter, TaskStatusStore};
pub use types::{TaskRecord, TaskStatus};
