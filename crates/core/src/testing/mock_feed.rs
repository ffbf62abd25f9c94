//! Mock discovery feed for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::FeedEntry;
use crate::feed::{DiscoveryFeed, FeedError, FeedItem};

/// Mock implementation of the DiscoveryFeed trait.
///
/// `list` returns whatever was last set with `set_items`, regardless of the
/// entries passed to `refresh`.
#[derive(Debug, Default)]
pub struct MockFeed {
    items: Arc<RwLock<Vec<FeedItem>>>,
    /// Entries passed to each `refresh` call.
    refreshes: Arc<RwLock<Vec<Vec<FeedEntry>>>>,
    next_error: Arc<RwLock<Option<FeedError>>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a feed that lists `items`.
    pub fn with_items(items: Vec<FeedItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            ..Self::default()
        }
    }

    /// Replace the listed items.
    pub async fn set_items(&self, items: Vec<FeedItem>) {
        *self.items.write().await = items;
    }

    /// Entries passed to each `refresh` call, oldest first.
    pub async fn refreshes(&self) -> Vec<Vec<FeedEntry>> {
        self.refreshes.read().await.clone()
    }

    /// Configure the next refresh to fail with the given error.
    pub async fn set_next_error(&self, error: FeedError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl DiscoveryFeed for MockFeed {
    fn name(&self) -> &str {
        "mock"
    }

    async fn refresh(&self, entries: &[FeedEntry]) -> Result<(), FeedError> {
        self.refreshes.write().await.push(entries.to_vec());
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn list(&self) -> Vec<FeedItem> {
        self.items.read().await.clone()
    }
}
