//! Mock downloader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::downloader::Downloader;
use crate::stage_client::StageClientError;

/// A recorded downloader call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloaderCall {
    Exists(String),
    Start { hash: String, link: String },
    IsComplete(String),
    LocalPath(String),
}

/// Internal state for a mock download.
#[derive(Debug, Clone)]
struct MockDownload {
    /// Completion checks answered so far.
    checks: u32,
    path: PathBuf,
}

/// Mock implementation of the Downloader trait.
///
/// Provides controllable behavior for testing:
/// - Record every call for assertions
/// - Complete a download after a set number of completion checks
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// let downloader = MockDownloader::new().with_checks_until_complete(3);
/// downloader.start("abc123", "magnet:?xt=urn:btih:abc123").await?;
///
/// assert!(!downloader.is_complete("abc123").await?);
/// assert!(!downloader.is_complete("abc123").await?);
/// assert!(downloader.is_complete("abc123").await?);
/// assert_eq!(downloader.local_path("abc123").await?, PathBuf::from("/data/abc123.mkv"));
/// ```
#[derive(Debug)]
pub struct MockDownloader {
    calls: Arc<RwLock<Vec<DownloaderCall>>>,
    downloads: Arc<RwLock<HashMap<String, MockDownload>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<StageClientError>>>,
    /// Completion checks needed before a download reports complete.
    checks_until_complete: u32,
    /// Directory that downloads land in.
    download_dir: PathBuf,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloader {
    /// Create a mock downloader saving to `/data` that completes on the first check.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            downloads: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            checks_until_complete: 1,
            download_dir: PathBuf::from("/data"),
        }
    }

    /// Downloads land in `dir` as `{hash}.mkv`.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Report complete only on the `checks`-th completion check.
    pub fn with_checks_until_complete(mut self, checks: u32) -> Self {
        self.checks_until_complete = checks.max(1);
        self
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<DownloaderCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Number of `start` calls.
    pub async fn start_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, DownloaderCall::Start { .. }))
            .count()
    }

    /// Pre-populate a download at a specific path.
    pub async fn add_download(&self, hash: &str, path: impl Into<PathBuf>) {
        self.downloads.write().await.insert(
            hash.to_string(),
            MockDownload {
                checks: 0,
                path: path.into(),
            },
        );
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: StageClientError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, call: DownloaderCall) -> Result<(), StageClientError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn require(&self, hash: &str) -> Result<MockDownload, StageClientError> {
        self.downloads
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| StageClientError::Api(format!("torrent not found: {}", hash)))
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn exists(&self, hash: &str) -> Result<bool, StageClientError> {
        self.record(DownloaderCall::Exists(hash.to_string())).await?;
        Ok(self.downloads.read().await.contains_key(hash))
    }

    async fn start(&self, hash: &str, link: &str) -> Result<(), StageClientError> {
        self.record(DownloaderCall::Start {
            hash: hash.to_string(),
            link: link.to_string(),
        })
        .await?;

        let path = self.download_dir.join(format!("{}.mkv", hash));
        self.downloads
            .write()
            .await
            .entry(hash.to_string())
            .or_insert(MockDownload { checks: 0, path });
        Ok(())
    }

    async fn is_complete(&self, hash: &str) -> Result<bool, StageClientError> {
        self.record(DownloaderCall::IsComplete(hash.to_string()))
            .await?;

        let mut downloads = self.downloads.write().await;
        let download = downloads
            .get_mut(hash)
            .ok_or_else(|| StageClientError::Api(format!("torrent not found: {}", hash)))?;
        download.checks += 1;
        Ok(download.checks >= self.checks_until_complete)
    }

    async fn local_path(&self, hash: &str) -> Result<PathBuf, StageClientError> {
        self.record(DownloaderCall::LocalPath(hash.to_string()))
            .await?;
        Ok(self.require(hash).await?.path)
    }
}
