//! Mock publisher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::publisher::Publisher;
use crate::stage_client::StageClientError;

/// A recorded publish for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPublish {
    pub path: PathBuf,
    pub caption: String,
}

/// Mock implementation of the Publisher trait.
#[derive(Debug, Default)]
pub struct MockPublisher {
    sent: Arc<RwLock<Vec<RecordedPublish>>>,
    next_error: Arc<RwLock<Option<StageClientError>>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded publishes.
    pub async fn sent(&self) -> Vec<RecordedPublish> {
        self.sent.read().await.clone()
    }

    /// Configure the next send to fail with the given error.
    pub async fn set_next_error(&self, error: StageClientError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, path: &Path, caption: &str) -> Result<(), StageClientError> {
        if let Some(e) = self.next_error.write().await.take() {
            return Err(e);
        }
        self.sent.write().await.push(RecordedPublish {
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}
