//! Types for the acquisition stage.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::stage_client::StageClientError;

/// Fetches the content behind a discovered item.
///
/// Items are keyed by their info hash. "Not finished yet" is reported as
/// `Ok(false)`, never as an error.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the backend name (e.g., "qbittorrent").
    fn name(&self) -> &str;

    /// Whether the backend knows about this item.
    async fn exists(&self, hash: &str) -> Result<bool, StageClientError>;

    /// Hand the item's link to the backend.
    async fn start(&self, hash: &str, link: &str) -> Result<(), StageClientError>;

    /// Whether the item has been fully downloaded.
    async fn is_complete(&self, hash: &str) -> Result<bool, StageClientError>;

    /// Local path of the downloaded content.
    async fn local_path(&self, hash: &str) -> Result<PathBuf, StageClientError>;
}
