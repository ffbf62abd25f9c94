//! Types for the task pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, FeedEntry, Profile};
use crate::feed::{FeedError, FeedItem};
use crate::stage_client::StageClientError;
use crate::store::StoreError;

use super::state::{Stage, TransitionError};

/// A discovered item with its routing resolved. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Task identity (info hash).
    pub id: String,
    /// Series name.
    pub name: String,
    pub episode: u32,
    /// Release title as discovered.
    pub title: String,
    /// Magnet URI or torrent URL.
    pub link: String,
    /// Release group tag for the output file name.
    pub uploader: String,
    /// Display name used in the publish caption.
    pub translation: String,
    /// Encode script body.
    pub script: String,
    /// Encode parameter body.
    pub param: String,
}

impl TaskDescriptor {
    /// Combine a feed item with its entry and resolved profile.
    pub fn build(item: &FeedItem, entry: &FeedEntry, profile: Profile) -> Self {
        Self {
            id: item.hash.clone(),
            name: item.name.clone(),
            episode: item.episode,
            title: item.title.clone(),
            link: item.link.clone(),
            uploader: entry.uploader.clone(),
            translation: entry.display_name().to_string(),
            script: profile.script,
            param: profile.param,
        }
    }
}

/// Errors that abort one execution of a task.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("discovery error: {0}")]
    Feed(#[from] FeedError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageClientError,
    },

    #[error("invalid transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("gave up waiting for {what} after {attempts} checks")]
    PollExhausted { what: String, attempts: u32 },

    #[error("missing checkpoint: {0}")]
    MissingCheckpoint(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Wrap a stage client error with the stage it happened in.
    pub fn stage(stage: Stage) -> impl FnOnce(StageClientError) -> Self {
        move |source| PipelineError::Stage { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EPISODE_PATTERN;

    #[test]
    fn test_build_descriptor() {
        let item = FeedItem {
            name: "Frieren".to_string(),
            episode: 3,
            title: "[SubsPlease] Frieren - 03 (1080p).mkv".to_string(),
            link: "magnet:?xt=urn:btih:abc123".to_string(),
            hash: "abc123".to_string(),
            published_at: None,
            size_bytes: None,
        };
        let entry = FeedEntry {
            name: "Frieren".to_string(),
            translation: Some("Frieren: Beyond Journey's End".to_string()),
            uploader: "SubsPlease".to_string(),
            query: "SubsPlease Frieren".to_string(),
            indexer: "nyaasi".to_string(),
            episode_pattern: DEFAULT_EPISODE_PATTERN.to_string(),
            script: "default".to_string(),
            param: "x265".to_string(),
        };
        let profile = Profile {
            script: "clip = core.lsmas.LWLibavSource(source)".to_string(),
            param: "--crf 18".to_string(),
        };

        let descriptor = TaskDescriptor::build(&item, &entry, profile);
        assert_eq!(descriptor.id, "abc123");
        assert_eq!(descriptor.uploader, "SubsPlease");
        assert_eq!(descriptor.translation, "Frieren: Beyond Journey's End");
        assert_eq!(descriptor.param, "--crf 18");
    }

    #[test]
    fn test_stage_error_display() {
        let err = PipelineError::stage(Stage::Transcode)(StageClientError::Timeout);
        assert_eq!(err.to_string(), "transcode stage failed: Request timeout");
    }
}
