//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::stage_client::StageClientError;
use crate::transcoder::Transcoder;

/// A recorded transcoder call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscoderCall {
    Exists(String),
    RegisterUpload(PathBuf),
    Start {
        key: String,
        param: String,
        script: String,
    },
    IsComplete(String),
    Download { key: String, dest: PathBuf },
}

/// Mock implementation of the Transcoder trait.
///
/// Registered jobs complete after a set number of completion checks.
/// `download` writes real bytes to the destination so callers can rename it.
#[derive(Debug)]
pub struct MockTranscoder {
    calls: Arc<RwLock<Vec<TranscoderCall>>>,
    /// Completion checks answered per key.
    jobs: Arc<RwLock<HashMap<String, u32>>>,
    next_error: Arc<RwLock<Option<StageClientError>>>,
    checks_until_complete: u32,
    output: Vec<u8>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a mock transcoder whose jobs complete on the first check.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            checks_until_complete: 1,
            output: b"encoded".to_vec(),
        }
    }

    /// Report complete only on the `checks`-th completion check.
    pub fn with_checks_until_complete(mut self, checks: u32) -> Self {
        self.checks_until_complete = checks.max(1);
        self
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<TranscoderCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Recorded `start` calls as (key, param, script).
    pub async fn started(&self) -> Vec<(String, String, String)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                TranscoderCall::Start { key, param, script } => {
                    Some((key.clone(), param.clone(), script.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of `register_upload` calls.
    pub async fn upload_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, TranscoderCall::RegisterUpload(_)))
            .count()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: StageClientError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, call: TranscoderCall) -> Result<(), StageClientError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn not_found(key: &str) -> StageClientError {
    StageClientError::Api(format!("task not found: {}", key))
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn exists(&self, key: &str) -> Result<bool, StageClientError> {
        self.record(TranscoderCall::Exists(key.to_string())).await?;
        Ok(self.jobs.read().await.contains_key(key))
    }

    async fn register_upload(&self, path: &Path) -> Result<String, StageClientError> {
        self.record(TranscoderCall::RegisterUpload(path.to_path_buf()))
            .await?;

        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StageClientError::Api(format!("invalid file name: {}", path.display())))?;
        self.jobs.write().await.entry(key.clone()).or_insert(0);
        Ok(key)
    }

    async fn start(&self, key: &str, param: &str, script: &str) -> Result<(), StageClientError> {
        self.record(TranscoderCall::Start {
            key: key.to_string(),
            param: param.to_string(),
            script: script.to_string(),
        })
        .await?;

        if self.jobs.read().await.contains_key(key) {
            Ok(())
        } else {
            Err(not_found(key))
        }
    }

    async fn is_complete(&self, key: &str) -> Result<bool, StageClientError> {
        self.record(TranscoderCall::IsComplete(key.to_string()))
            .await?;

        let mut jobs = self.jobs.write().await;
        let checks = jobs.get_mut(key).ok_or_else(|| not_found(key))?;
        *checks += 1;
        Ok(*checks >= self.checks_until_complete)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), StageClientError> {
        self.record(TranscoderCall::Download {
            key: key.to_string(),
            dest: dest.to_path_buf(),
        })
        .await?;

        if !self.jobs.read().await.contains_key(key) {
            return Err(not_found(key));
        }
        tokio::fs::write(dest, &self.output).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_start_download() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("show - 01.mkv");
        let transcoder = MockTranscoder::new();

        assert!(!transcoder.exists("show - 01.mkv").await.unwrap());
        let key = transcoder.register_upload(&source).await.unwrap();
        assert_eq!(key, "show - 01.mkv");
        assert!(transcoder.exists(&key).await.unwrap());

        transcoder.start(&key, "--crf 18", "script").await.unwrap();
        assert!(transcoder.is_complete(&key).await.unwrap());

        let dest = dir.path().join("out.mkv");
        transcoder.download(&key, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"encoded");
        assert_eq!(
            transcoder.started().await,
            vec![(key, "--crf 18".to_string(), "script".to_string())]
        );
    }

    #[tokio::test]
    async fn test_start_unknown_key_fails() {
        let transcoder = MockTranscoder::new();
        assert!(transcoder.start("missing", "", "").await.is_err());
    }
}
