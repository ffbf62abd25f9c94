//! Task status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checkpoints reached by a task.
///
/// Fields only ever move forward in stage order: a task is acquired, then
/// transcoded, then published, then done. Each set field is the resumption
/// point for a restarted pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Local path of the downloaded source artifact.
    #[serde(default)]
    pub acquired_path: Option<String>,
    /// Local path of the encoded artifact, after renaming.
    #[serde(default)]
    pub transcoded_path: Option<String>,
    /// Whether the encoded artifact has been delivered to the channel.
    #[serde(default)]
    pub published: bool,
    /// Whether the whole pipeline has completed.
    #[serde(default)]
    pub done: bool,
}

impl TaskStatus {
    /// A fresh status with no checkpoint reached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the checkpoint fields respect stage order.
    ///
    /// `done` without `published` is accepted only when publishing is disabled.
    pub fn is_monotonic(&self, publish_enabled: bool) -> bool {
        if self.transcoded_path.is_some() && self.acquired_path.is_none() {
            return false;
        }
        if self.published && self.transcoded_path.is_none() {
            return false;
        }
        if self.done {
            if self.transcoded_path.is_none() {
                return false;
            }
            if publish_enabled && !self.published {
                return false;
            }
        }
        true
    }
}

/// A stored task status together with bookkeeping timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identity (info hash of the discovered release).
    pub id: String,
    /// Current checkpoints.
    pub status: TaskStatus,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}
