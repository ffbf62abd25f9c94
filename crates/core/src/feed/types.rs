//! Types for discovery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FeedEntry;

/// A discovered release of one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Series name (matches `FeedEntry::name`).
    pub name: String,
    /// Episode number.
    pub episode: u32,
    /// Release title as published.
    pub title: String,
    /// Magnet URI or torrent URL.
    pub link: String,
    /// Info hash (lowercase hex). Used as the task identity.
    pub hash: String,
    pub published_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
}

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_connect() {
            FeedError::ConnectionFailed(e.to_string())
        } else {
            FeedError::Api(e.to_string())
        }
    }
}

/// Source of candidate work items.
#[async_trait]
pub trait DiscoveryFeed: Send + Sync {
    /// Returns the backend name (e.g., "jackett").
    fn name(&self) -> &str;

    /// Re-query the backend for every entry, replacing the current item list.
    async fn refresh(&self, entries: &[FeedEntry]) -> Result<(), FeedError>;

    /// Items found by the last refresh.
    async fn list(&self) -> Vec<FeedItem>;
}
