//! Telegram Bot API publisher.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use serde::Deserialize;
use tracing::info;

use crate::config::TelegramConfig;
use crate::stage_client::{http_client, StageClientError};

use super::Publisher;

/// Sends videos to a Telegram channel.
pub struct TelegramPublisher {
    client: Client,
    config: TelegramConfig,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

impl TelegramPublisher {
    /// Create a new Telegram publisher.
    pub fn new(config: TelegramConfig) -> Result<Self, StageClientError> {
        let client = http_client(config.timeout_secs, false)?;
        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }
}

fn check_response(body: &str) -> Result<(), StageClientError> {
    let response: BotResponse = serde_json::from_str(body)
        .map_err(|e| StageClientError::InvalidResponse(format!("sendVideo: {}", e)))?;
    if response.ok {
        return Ok(());
    }

    let description = response
        .description
        .unwrap_or_else(|| "unknown error".to_string());
    match response.error_code {
        Some(401) | Some(403) => Err(StageClientError::AuthenticationFailed(description)),
        _ => Err(StageClientError::Api(description)),
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, path: &Path, caption: &str) -> Result<(), StageClientError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StageClientError::Api(format!("invalid file name: {}", path.display()))
            })?;

        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();

        let video = multipart::Part::stream_with_length(Body::from(file), length)
            .file_name(file_name.clone());
        let form = multipart::Form::new()
            .text("chat_id", self.config.channel_id.clone())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .part("video", video);

        info!(file = %file_name, bytes = length, "Sending video to Telegram");
        let response = self
            .client
            .post(self.method_url("sendVideo"))
            .multipart(form)
            .send()
            .await?;
        let body = response.text().await?;

        check_response(&body)
    }
}
