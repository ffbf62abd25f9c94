//! Types for the transcode stage.

use std::path::Path;

use async_trait::async_trait;

use crate::stage_client::StageClientError;

/// Extensions accepted for upload to an encode service.
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "flv", "mov", "wmv", "webm", "m2ts", "ts"];

/// Whether `path` has a known video extension (case-insensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Remote encode service.
///
/// Jobs are keyed by a video key: the file name of the uploaded source.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the backend name (e.g., "finalrip").
    fn name(&self) -> &str;

    /// Whether a job for this key has been registered.
    async fn exists(&self, key: &str) -> Result<bool, StageClientError>;

    /// Upload a local source file and register a job for it. Returns the key.
    async fn register_upload(&self, path: &Path) -> Result<String, StageClientError>;

    /// Start encoding a registered job.
    async fn start(&self, key: &str, param: &str, script: &str) -> Result<(), StageClientError>;

    /// Whether the encoded output is ready.
    async fn is_complete(&self, key: &str) -> Result<bool, StageClientError>;

    /// Download the encoded output to `dest`.
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StageClientError>;
}
