use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default, rename = "loop")]
    pub pipeline_loop: LoopConfig,
    pub qbittorrent: QBittorrentConfig,
    pub finalrip: FinalRipConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub jackett: JackettConfig,
    /// Routing file (profiles and feeds), re-read on every discovery cycle.
    #[serde(default = "default_routing_path")]
    pub routing_path: PathBuf,
}

fn default_routing_path() -> PathBuf {
    PathBuf::from("routing.toml")
}

/// Status API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("animepipe.db")
}

/// Discovery loop and task execution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoopConfig {
    /// Seconds between discovery cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds between stage existence/completion checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Give up a poll after this many checks (None = wait forever).
    #[serde(default)]
    pub poll_max_attempts: Option<u32>,
    /// Maximum tasks executing at once (0 = unlimited).
    #[serde(default)]
    pub max_concurrent_tasks: usize,
    /// Seconds to wait for in-flight tasks on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_max_attempts: None,
            max_concurrent_tasks: 0,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// qBittorrent WebUI configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// WebUI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Save path for new torrents (qBittorrent default if unset)
    #[serde(default)]
    pub download_path: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// FinalRip encode service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FinalRipConfig {
    /// Service base URL
    pub url: String,
    /// Access token sent in the `token` header
    pub token: String,
    #[serde(default = "default_transfer_timeout")]
    pub timeout_secs: u32,
}

/// Telegram channel publishing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Channel username ("@channel") or numeric chat id
    #[serde(default)]
    pub channel_id: String,
    /// Bot API base, overridable for a self-hosted Bot API server
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_transfer_timeout")]
    pub timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enable: false,
            bot_token: String::new(),
            channel_id: String::new(),
            api_base: default_telegram_api_base(),
            timeout_secs: default_transfer_timeout(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Jackett discovery backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettConfig {
    /// Jackett server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// Jackett API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

fn default_transfer_timeout() -> u32 {
    6000
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(rename = "loop")]
    pub pipeline_loop: LoopConfig,
    pub routing_path: PathBuf,
    pub qbittorrent: SanitizedServiceConfig,
    pub finalrip: SanitizedServiceConfig,
    pub jackett: SanitizedServiceConfig,
    pub telegram_enabled: bool,
}

/// Endpoint of an external service, credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceConfig {
    pub url: String,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            pipeline_loop: config.pipeline_loop.clone(),
            routing_path: config.routing_path.clone(),
            qbittorrent: SanitizedServiceConfig {
                url: config.qbittorrent.url.clone(),
                credentials_configured: !config.qbittorrent.password.is_empty(),
            },
            finalrip: SanitizedServiceConfig {
                url: config.finalrip.url.clone(),
                credentials_configured: !config.finalrip.token.is_empty(),
            },
            jackett: SanitizedServiceConfig {
                url: config.jackett.url.clone(),
                credentials_configured: !config.jackett.api_key.is_empty(),
            },
            telegram_enabled: config.telegram.enable,
        }
    }
}
