mod loader;
mod routing;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, load_routing, load_routing_from_str};
pub use routing::{
    validate_routing, FeedEntry, FileRoutingSource, Profile, ProfileTable, RoutingConfig,
    RoutingSource, StaticRoutingSource, DEFAULT_EPISODE_PATTERN,
};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown {kind} profile: {name}")]
    UnknownProfile { kind: &'static str, name: String },
}
