pub mod config;
pub mod downloader;
pub mod executor;
pub mod feed;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod stage_client;
pub mod store;
pub mod testing;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, load_routing, validate_config, Config, ConfigError,
    FeedEntry, FileRoutingSource, ProfileTable, RoutingConfig, RoutingSource, SanitizedConfig,
};
pub use downloader::{Downloader, QBittorrentDownloader};
pub use executor::{ExecutorStatus, SubmitOutcome, TaskExecutor};
pub use feed::{DiscoveryFeed, FeedError, FeedItem, JackettFeed};
pub use pipeline::{
    PipelineError, PipelineLoop, PipelineState, PollPolicy, Stage, TaskDescriptor, TaskPipeline,
    TickReport,
};
pub use publisher::{Publisher, TelegramPublisher};
pub use stage_client::StageClientError;
pub use store::{SqliteTaskStore, StoreError, TaskFilter, TaskRecord, TaskStatus, TaskStatusStore};
pub use transcoder::{FinalRipTranscoder, Transcoder};
