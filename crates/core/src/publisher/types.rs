//! Types for the publish stage.

use std::path::Path;

use async_trait::async_trait;

use crate::stage_client::StageClientError;

/// Posts a finished file to its destination.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the backend name (e.g., "telegram").
    fn name(&self) -> &str;

    /// Publish `path` with `caption`.
    async fn send(&self, path: &Path, caption: &str) -> Result<(), StageClientError>;
}

/// Caption for a published episode: `"{translation} | EP {episode} | {file name}"`.
pub fn episode_caption(translation: &str, episode: u32, path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{} | EP {} | {}", translation, episode, file_name)
}
