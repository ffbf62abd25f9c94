//! FinalRip encode service implementation.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Body, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::FinalRipConfig;
use crate::stage_client::{http_client, StageClientError};

use super::{is_video_file, Transcoder};

/// FinalRip transcoder.
pub struct FinalRipTranscoder {
    client: Client,
    config: FinalRipConfig,
}

/// Envelope shared by every FinalRip endpoint.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    error: Option<ApiErrorBody>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl<T> ApiResponse<T> {
    fn into_result(self, action: &str) -> Result<Option<T>, StageClientError> {
        if self.success {
            Ok(self.data)
        } else {
            let message = self
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_string());
            Err(StageClientError::Api(format!("{}: {}", action, message)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PresignedData {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProgressData {
    #[serde(default)]
    encode_url: String,
}

impl FinalRipTranscoder {
    /// Create a new FinalRip transcoder.
    pub fn new(config: FinalRipConfig) -> Result<Self, StageClientError> {
        let client = http_client(config.timeout_secs, false)?;
        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url(), endpoint))
            .header("token", &self.config.token)
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url(), endpoint))
            .header("token", &self.config.token)
    }

    /// Send a request and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<Option<T>, StageClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status, &body, action)
    }

    async fn progress(&self, key: &str) -> Result<ProgressData, StageClientError> {
        let data: Option<ProgressData> = self
            .call(
                self.get("/api/v1/task/progress").query(&[("video_key", key)]),
                "get task progress",
            )
            .await?;
        Ok(data.unwrap_or_default())
    }
}

/// Decode a response body and unwrap its envelope.
fn parse_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    action: &str,
) -> Result<Option<T>, StageClientError> {
    let envelope: ApiResponse<T> = serde_json::from_str(body).map_err(|e| {
        StageClientError::InvalidResponse(format!("{} (HTTP {}): {}", action, status, e))
    })?;
    envelope.into_result(action)
}

/// Content type sent with the upload.
fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mkv") => "video/x-matroska",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("flv") => "video/x-flv",
        Some("wmv") => "video/x-ms-wmv",
        Some("ts") | Some("m2ts") => "video/mp2t",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Transcoder for FinalRipTranscoder {
    fn name(&self) -> &str {
        "finalrip"
    }

    async fn exists(&self, key: &str) -> Result<bool, StageClientError> {
        match self.progress(key).await {
            Ok(_) => Ok(true),
            Err(StageClientError::Api(message)) => {
                debug!(key = %key, error = %message, "FinalRip task not registered");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn register_upload(&self, path: &Path) -> Result<String, StageClientError> {
        if !is_video_file(path) {
            return Err(StageClientError::Api(format!(
                "not a supported video file: {}",
                path.display()
            )));
        }
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StageClientError::Api(format!("invalid file name: {}", path.display()))
            })?
            .to_string();

        let presigned: PresignedData = self
            .call(
                self.get("/api/v1/task/oss/presigned")
                    .query(&[("video_key", key.as_str())]),
                "get presigned URL",
            )
            .await?
            .ok_or_else(|| StageClientError::InvalidResponse("missing presigned URL".to_string()))?;

        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();

        info!(key = %key, bytes = length, "Uploading source to FinalRip");
        let response = self
            .client
            .put(&presigned.url)
            .header(header::CONTENT_TYPE, content_type(path))
            .header(header::CONTENT_LENGTH, length)
            .body(Body::from(file))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StageClientError::Api(format!(
                "upload failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        self.call::<serde_json::Value>(
            self.post("/api/v1/task/new")
                .query(&[("video_key", key.as_str())]),
            "create task",
        )
        .await?;

        Ok(key)
    }

    async fn start(&self, key: &str, param: &str, script: &str) -> Result<(), StageClientError> {
        info!(key = %key, "Starting FinalRip encode");
        self.call::<serde_json::Value>(
            self.post("/api/v1/task/start").query(&[
                ("encode_param", param),
                ("script", script),
                ("video_key", key),
            ]),
            "start task",
        )
        .await?;
        Ok(())
    }

    async fn is_complete(&self, key: &str) -> Result<bool, StageClientError> {
        Ok(!self.progress(key).await?.encode_url.is_empty())
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), StageClientError> {
        let progress = self.progress(key).await?;
        if progress.encode_url.is_empty() {
            return Err(StageClientError::Api(format!(
                "task {} has no encoded output yet",
                key
            )));
        }

        let response = self
            .client
            .get(&progress.encode_url)
            .header("token", &self.config.token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StageClientError::Api(format!(
                "download failed: HTTP {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        info!(key = %key, dest = %dest.display(), "Downloaded encoded output");
        Ok(())
    }
}
