//! Testing utilities and mock implementations of the pipeline collaborators.
//!
//! This module provides mock implementations of every external service trait,
//! so the pipeline and discovery loop can be exercised without real services.
//!
//! # Example
//!
//! ```rust,ignore
//! use animepipe_core::testing::{fixtures, MockDownloader, MockFeed, MockTranscoder};
//!
//! let feed = MockFeed::with_items(vec![fixtures::feed_item("Frieren", 1, "abc123")]);
//! let downloader = MockDownloader::new().with_checks_until_complete(3);
//! let transcoder = MockTranscoder::new();
//!
//! // Wire into a TaskPipeline / PipelineLoop...
//! ```

mod mock_downloader;
mod mock_feed;
mod mock_publisher;
mod mock_transcoder;

pub use mock_downloader::{DownloaderCall, MockDownloader};
pub use mock_feed::MockFeed;
pub use mock_publisher::{MockPublisher, RecordedPublish};
pub use mock_transcoder::{MockTranscoder, TranscoderCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use crate::config::{FeedEntry, RoutingConfig, DEFAULT_EPISODE_PATTERN};
    use crate::feed::FeedItem;
    use crate::pipeline::TaskDescriptor;

    /// Script profile registered by [`routing`].
    pub const SCRIPT_NAME: &str = "default";
    /// Script body registered by [`routing`].
    pub const SCRIPT_BODY: &str = "clip = core.lsmas.LWLibavSource(source)";
    /// Parameter profile registered by [`routing`].
    pub const PARAM_NAME: &str = "x265";
    /// Parameter body registered by [`routing`].
    pub const PARAM_BODY: &str = "--preset slow --crf 18";

    /// A feed entry for `name` using the given profile names.
    pub fn feed_entry(name: &str, script: &str, param: &str) -> FeedEntry {
        FeedEntry {
            name: name.to_string(),
            translation: Some(format!("{} (EN)", name)),
            uploader: "SubGroup".to_string(),
            query: format!("SubGroup {} 1080p", name),
            indexer: "nyaasi".to_string(),
            episode_pattern: DEFAULT_EPISODE_PATTERN.to_string(),
            script: script.to_string(),
            param: param.to_string(),
        }
    }

    /// A routing config with one script, one param set, and the given entries.
    pub fn routing(feeds: Vec<FeedEntry>) -> RoutingConfig {
        RoutingConfig {
            scripts: HashMap::from([(SCRIPT_NAME.to_string(), SCRIPT_BODY.to_string())]),
            params: HashMap::from([(PARAM_NAME.to_string(), PARAM_BODY.to_string())]),
            feeds,
        }
    }

    /// A discovered release of `name` episode `episode`.
    pub fn feed_item(name: &str, episode: u32, hash: &str) -> FeedItem {
        FeedItem {
            name: name.to_string(),
            episode,
            title: format!("[SubGroup] {} - {:02} (1080p).mkv", name, episode),
            link: format!("magnet:?xt=urn:btih:{}", hash),
            hash: hash.to_string(),
            published_at: None,
            size_bytes: Some(1024 * 1024 * 1400),
        }
    }

    /// A task descriptor with resolved profile bodies.
    pub fn task_descriptor(id: &str) -> TaskDescriptor {
        TaskDescriptor {
            id: id.to_string(),
            name: "Frieren".to_string(),
            episode: 1,
            title: "[SubGroup] Frieren - 01 (1080p).mkv".to_string(),
            link: format!("magnet:?xt=urn:btih:{}", id),
            uploader: "SubGroup".to_string(),
            translation: "Frieren: Beyond Journey's End".to_string(),
            script: SCRIPT_BODY.to_string(),
            param: PARAM_BODY.to_string(),
        }
    }
}
