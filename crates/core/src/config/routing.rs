//! Routing configuration: encode profiles and feed entries.
//!
//! The routing file is re-read on every discovery cycle so feeds and
//! profiles can be edited without restarting.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Episode pattern used when a feed entry does not set one.
pub const DEFAULT_EPISODE_PATTERN: &str = r"- (\d{1,4})";

/// Profiles and feed entries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Encode scripts by profile name.
    #[serde(default)]
    pub scripts: HashMap<String, String>,
    /// Encode parameter sets by profile name.
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Series to watch.
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

/// One watched series.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeedEntry {
    /// Series name, used in file names and to route discovered items.
    pub name: String,
    /// Display name used in publish captions.
    #[serde(default)]
    pub translation: Option<String>,
    /// Release group tag written into file names.
    pub uploader: String,
    /// Search query sent to the indexer.
    pub query: String,
    /// Indexer id to search.
    #[serde(default = "default_indexer")]
    pub indexer: String,
    /// Regex with one capture group extracting the episode number.
    #[serde(default = "default_episode_pattern")]
    pub episode_pattern: String,
    /// Script profile name.
    pub script: String,
    /// Parameter profile name.
    pub param: String,
}

fn default_indexer() -> String {
    "nyaasi".to_string()
}

fn default_episode_pattern() -> String {
    DEFAULT_EPISODE_PATTERN.to_string()
}

impl FeedEntry {
    /// Caption prefix, falling back to the series name.
    pub fn display_name(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.name)
    }
}

/// A resolved script + parameter pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub script: String,
    pub param: String,
}

/// Validated lookup of profiles and feed entries, built once per refresh.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    scripts: HashMap<String, String>,
    params: HashMap<String, String>,
    feeds: HashMap<String, FeedEntry>,
}

impl ProfileTable {
    /// Validate a routing config and index it.
    pub fn build(routing: &RoutingConfig) -> Result<Self, ConfigError> {
        validate_routing(routing)?;

        let feeds = routing
            .feeds
            .iter()
            .map(|entry| (entry.name.clone(), entry.clone()))
            .collect();

        Ok(Self {
            scripts: routing.scripts.clone(),
            params: routing.params.clone(),
            feeds,
        })
    }

    /// Look up the feed entry that produced items named `name`.
    pub fn feed(&self, name: &str) -> Result<&FeedEntry, ConfigError> {
        self.feeds.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            kind: "feed",
            name: name.to_string(),
        })
    }

    /// Resolve the script and parameter set named by a feed entry.
    pub fn resolve(&self, entry: &FeedEntry) -> Result<Profile, ConfigError> {
        let script = self
            .scripts
            .get(&entry.script)
            .ok_or_else(|| ConfigError::UnknownProfile {
                kind: "script",
                name: entry.script.clone(),
            })?;
        let param = self
            .params
            .get(&entry.param)
            .ok_or_else(|| ConfigError::UnknownProfile {
                kind: "param",
                name: entry.param.clone(),
            })?;

        Ok(Profile {
            script: script.clone(),
            param: param.clone(),
        })
    }
}

/// Structural checks on a routing config.
///
/// Dangling script/param references are not rejected here; they only drop
/// the affected items when resolved.
pub fn validate_routing(routing: &RoutingConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in &routing.feeds {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "feed name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate feed name: {}",
                entry.name
            )));
        }
        let pattern = regex_lite::Regex::new(&entry.episode_pattern).map_err(|e| {
            ConfigError::ValidationError(format!(
                "feed {}: invalid episode_pattern: {}",
                entry.name, e
            ))
        })?;
        if pattern.captures_len() < 2 {
            return Err(ConfigError::ValidationError(format!(
                "feed {}: episode_pattern needs a capture group",
                entry.name
            )));
        }
    }
    Ok(())
}

/// Where the discovery loop gets its routing config from.
pub trait RoutingSource: Send + Sync {
    /// Produce the current routing config.
    fn load(&self) -> Result<RoutingConfig, ConfigError>;
}

/// Re-reads a TOML routing file on every load.
#[derive(Debug, Clone)]
pub struct FileRoutingSource {
    path: PathBuf,
}

impl FileRoutingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RoutingSource for FileRoutingSource {
    fn load(&self) -> Result<RoutingConfig, ConfigError> {
        super::load_routing(&self.path)
    }
}

/// In-memory routing config, replaceable at runtime (useful for testing).
#[derive(Debug, Default)]
pub struct StaticRoutingSource {
    routing: RwLock<RoutingConfig>,
}

impl StaticRoutingSource {
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            routing: RwLock::new(routing),
        }
    }

    /// Replace the config returned by subsequent loads.
    pub fn set(&self, routing: RoutingConfig) {
        if let Ok(mut guard) = self.routing.write() {
            *guard = routing;
        }
    }
}

impl RoutingSource for StaticRoutingSource {
    fn load(&self) -> Result<RoutingConfig, ConfigError> {
        self.routing
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| ConfigError::ParseError("routing lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, script: &str, param: &str) -> FeedEntry {
        FeedEntry {
            name: name.to_string(),
            translation: None,
            uploader: "SubGroup".to_string(),
            query: format!("SubGroup {}", name),
            indexer: default_indexer(),
            episode_pattern: default_episode_pattern(),
            script: script.to_string(),
            param: param.to_string(),
        }
    }

    fn routing() -> RoutingConfig {
        RoutingConfig {
            scripts: HashMap::from([("default".to_string(), "core.std.Trim()".to_string())]),
            params: HashMap::from([("x265".to_string(), "--crf 18".to_string())]),
            feeds: vec![entry("Show A", "default", "x265")],
        }
    }

    #[test]
    fn test_resolve_known_profile() {
        let table = ProfileTable::build(&routing()).unwrap();
        let feed = table.feed("Show A").unwrap();
        let profile = table.resolve(feed).unwrap();
        assert_eq!(profile.script, "core.std.Trim()");
        assert_eq!(profile.param, "--crf 18");
    }

    #[test]
    fn test_resolve_unknown_script() {
        let table = ProfileTable::build(&routing()).unwrap();
        let result = table.resolve(&entry("Show B", "missing", "x265"));
        assert!(matches!(
            result,
            Err(ConfigError::UnknownProfile { kind: "script", ref name }) if name == "missing"
        ));
    }

    #[test]
    fn test_resolve_unknown_param() {
        let table = ProfileTable::build(&routing()).unwrap();
        let result = table.resolve(&entry("Show B", "default", "av1"));
        assert!(matches!(
            result,
            Err(ConfigError::UnknownProfile { kind: "param", .. })
        ));
    }

    #[test]
    fn test_unknown_feed() {
        let table = ProfileTable::build(&routing()).unwrap();
        assert!(matches!(
            table.feed("Nope"),
            Err(ConfigError::UnknownProfile { kind: "feed", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_feed() {
        let mut config = routing();
        config.feeds.push(entry("Show A", "default", "x265"));
        assert!(matches!(
            validate_routing(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_pattern_without_group() {
        let mut config = routing();
        config.feeds[0].episode_pattern = r"\d+".to_string();
        assert!(validate_routing(&config).is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let mut feed = entry("Show A", "default", "x265");
        assert_eq!(feed.display_name(), "Show A");
        feed.translation = Some("Show A (EN)".to_string());
        assert_eq!(feed.display_name(), "Show A (EN)");
    }

    #[test]
    fn test_static_source_replace() {
        let source = StaticRoutingSource::new(routing());
        assert_eq!(source.load().unwrap().feeds.len(), 1);
        source.set(RoutingConfig::default());
        assert!(source.load().unwrap().feeds.is_empty());
    }
}
