//! qBittorrent WebUI downloader implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;
use crate::stage_client::{http_client, StageClientError};

use super::Downloader;

/// qBittorrent downloader.
pub struct QBittorrentDownloader {
    client: Client,
    config: QBittorrentConfig,
    /// Set once logged in; cleared when the session expires.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentDownloader {
    /// Create a new qBittorrent downloader.
    pub fn new(config: QBittorrentConfig) -> Result<Self, StageClientError> {
        let client = http_client(config.timeout_secs, true)?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), StageClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(StageClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(StageClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), StageClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Send an authenticated request, logging in again once if the session expired.
    async fn execute<F>(&self, build: F) -> Result<String, StageClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let response = build(&self.client).send().await?;
        if response.status().as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = build(&self.client).send().await?;
            return read_body(response).await;
        }

        read_body(response).await
    }

    /// Look up a single torrent by hash.
    async fn torrent(&self, hash: &str) -> Result<Option<QBTorrentInfo>, StageClientError> {
        let url = format!(
            "{}/api/v2/torrents/info?hashes={}",
            self.base_url(),
            hash.to_lowercase()
        );
        let body = self.execute(|client| client.get(&url)).await?;

        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&body).map_err(|e| {
            StageClientError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        Ok(torrents.into_iter().next())
    }

    async fn require_torrent(&self, hash: &str) -> Result<QBTorrentInfo, StageClientError> {
        self.torrent(hash)
            .await?
            .ok_or_else(|| StageClientError::Api(format!("torrent not found: {}", hash)))
    }
}

async fn read_body(response: Response) -> Result<String, StageClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(StageClientError::Api(format!("HTTP {}", status)));
    }
    Ok(response.text().await?)
}

/// qBittorrent torrent info response (fields used by the pipeline).
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    name: String,
    state: String,
    progress: f64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    content_path: String,
}

impl QBTorrentInfo {
    fn is_complete(&self) -> bool {
        self.progress >= 1.0 || is_seeding_state(&self.state)
    }

    fn content_path(&self) -> PathBuf {
        if self.content_path.is_empty() {
            PathBuf::from(&self.save_path).join(&self.name)
        } else {
            PathBuf::from(&self.content_path)
        }
    }
}

/// States in which qBittorrent has every piece on disk.
fn is_seeding_state(state: &str) -> bool {
    matches!(
        state,
        "uploading" | "forcedUP" | "stalledUP" | "queuedUP" | "pausedUP" | "stoppedUP"
    )
}

#[async_trait]
impl Downloader for QBittorrentDownloader {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn exists(&self, hash: &str) -> Result<bool, StageClientError> {
        Ok(self.torrent(hash).await?.is_some())
    }

    async fn start(&self, hash: &str, link: &str) -> Result<(), StageClientError> {
        debug!(hash = %hash, "Adding torrent to qBittorrent");

        let url = format!("{}/api/v2/torrents/add", self.base_url());
        let mut params = vec![("urls", link.to_string())];
        if let Some(path) = &self.config.download_path {
            params.push(("savepath", path.clone()));
        }

        let body = self.execute(|client| client.post(&url).form(&params)).await?;
        if body.contains("Fails.") {
            return Err(StageClientError::Api(format!(
                "qBittorrent rejected torrent {}",
                hash
            )));
        }
        Ok(())
    }

    async fn is_complete(&self, hash: &str) -> Result<bool, StageClientError> {
        let torrent = self.require_torrent(hash).await?;
        debug!(
            hash = %hash,
            state = %torrent.state,
            progress = torrent.progress,
            "qBittorrent progress"
        );
        Ok(torrent.is_complete())
    }

    async fn local_path(&self, hash: &str) -> Result<PathBuf, StageClientError> {
        Ok(self.require_torrent(hash).await?.content_path())
    }
}
