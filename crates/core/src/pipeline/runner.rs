//! Per-task pipeline execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::ConfigError;
use crate::downloader::Downloader;
use crate::metrics;
use crate::publisher::{episode_caption, Publisher};
use crate::stage_client::StageClientError;
use crate::store::{StoreError, TaskStatus, TaskStatusStore};
use crate::transcoder::Transcoder;

use super::naming::canonical_file_name;
use super::poll::{poll_until, PollPolicy};
use super::state::{self, PipelineState, Stage, StageOutcome};
use super::types::{PipelineError, TaskDescriptor};

/// Drives one task from its last checkpoint to done.
///
/// Running a task that is already done performs no client calls and no
/// store writes. Any error leaves the task at its last checkpoint.
pub struct TaskPipeline {
    store: Arc<dyn TaskStatusStore>,
    downloader: Arc<dyn Downloader>,
    transcoder: Arc<dyn Transcoder>,
    /// `None` disables the publish stage.
    publisher: Option<Arc<dyn Publisher>>,
    poll: PollPolicy,
}

impl TaskPipeline {
    /// Create a pipeline with publishing disabled and the default poll policy.
    pub fn new(
        store: Arc<dyn TaskStatusStore>,
        downloader: Arc<dyn Downloader>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            store,
            downloader,
            transcoder,
            publisher: None,
            poll: PollPolicy::default(),
        }
    }

    /// Enable the publish stage.
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn publish_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    /// Advance `task` through every remaining stage, checkpointing each one.
    pub async fn run(&self, task: &TaskDescriptor) -> Result<(), PipelineError> {
        let mut status = self.load_or_create(&task.id)?;
        if status.done {
            debug!(task_id = %task.id, "Task already done");
            return Ok(());
        }

        info!(
            task_id = %task.id,
            name = %task.name,
            episode = task.episode,
            state = %PipelineState::from_status(&status),
            "Starting pipeline"
        );

        while let Some(stage) = state::next_stage(&status, self.publish_enabled()) {
            debug!(task_id = %task.id, state = %stage.in_flight_state(), "Stage started");

            let outcome = match self.run_stage(stage, task, &status).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics::STAGES_FAILED.with_label_values(&[stage.as_str()]).inc();
                    return Err(e);
                }
            };

            let next = state::apply(&status, outcome, self.publish_enabled())?;
            self.store.update(&task.id, next.clone()).map_err(|e| {
                error!(task_id = %task.id, stage = %stage, error = %e, "Failed to persist checkpoint");
                e
            })?;
            metrics::STAGES_COMPLETED
                .with_label_values(&[stage.as_str()])
                .inc();
            status = next;
        }

        info!(
            task_id = %task.id,
            name = %task.name,
            episode = task.episode,
            "Pipeline finished"
        );
        Ok(())
    }

    /// Load the task's status, creating an empty record on first sight.
    fn load_or_create(&self, id: &str) -> Result<TaskStatus, PipelineError> {
        let result = if self.store.exists(id)? {
            self.store.get(id)
        } else {
            match self.store.create(id, TaskStatus::new()) {
                Err(StoreError::AlreadyExists(_)) => self.store.get(id),
                other => other,
            }
        };

        result.map(|record| record.status).map_err(|e| {
            error!(task_id = %id, error = %e, "Failed to load task status");
            e.into()
        })
    }

    async fn run_stage(
        &self,
        stage: Stage,
        task: &TaskDescriptor,
        status: &TaskStatus,
    ) -> Result<StageOutcome, PipelineError> {
        match stage {
            Stage::Acquire => self.acquire(task).await,
            Stage::Transcode => {
                let acquired = status
                    .acquired_path
                    .as_deref()
                    .ok_or(PipelineError::MissingCheckpoint("acquired_path"))?;
                self.transcode(task, Path::new(acquired)).await
            }
            Stage::Publish => {
                let transcoded = status
                    .transcoded_path
                    .as_deref()
                    .ok_or(PipelineError::MissingCheckpoint("transcoded_path"))?;
                self.publish(task, Path::new(transcoded)).await
            }
            Stage::Finish => Ok(StageOutcome::Finished),
        }
    }

    async fn acquire(&self, task: &TaskDescriptor) -> Result<StageOutcome, PipelineError> {
        info!(task_id = %task.id, name = %task.name, episode = task.episode, "Starting download");

        let downloader = self.downloader.as_ref();
        let id = task.id.as_str();
        let link = task.link.as_str();

        poll_until(&self.poll, Stage::Acquire, "download registration", move || async move {
            if downloader.exists(id).await? {
                return Ok(true);
            }
            downloader.start(id, link).await?;
            Ok::<_, StageClientError>(false)
        })
        .await?;

        poll_until(&self.poll, Stage::Acquire, "download completion", move || {
            downloader.is_complete(id)
        })
        .await?;

        let path = downloader
            .local_path(id)
            .await
            .map_err(PipelineError::stage(Stage::Acquire))?;

        info!(task_id = %task.id, path = %path.display(), "Download complete");
        Ok(StageOutcome::Acquired(path.to_string_lossy().into_owned()))
    }

    async fn transcode(
        &self,
        task: &TaskDescriptor,
        source: &Path,
    ) -> Result<StageOutcome, PipelineError> {
        info!(task_id = %task.id, name = %task.name, episode = task.episode, "Starting encode");

        let key = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(PipelineError::MissingCheckpoint("acquired file name"))?;
        let transcoder = self.transcoder.as_ref();

        poll_until(&self.poll, Stage::Transcode, "encode registration", move || async move {
            if transcoder.exists(key).await? {
                return Ok(true);
            }
            transcoder.register_upload(source).await?;
            Ok::<_, StageClientError>(false)
        })
        .await?;

        transcoder
            .start(key, &task.param, &task.script)
            .await
            .map_err(PipelineError::stage(Stage::Transcode))?;

        poll_until(&self.poll, Stage::Transcode, "encode completion", move || {
            transcoder.is_complete(key)
        })
        .await?;

        let parent = source.parent().unwrap_or_else(|| Path::new("."));
        let temp_path = parent.join(format!("{}-encoded.mkv", key));
        transcoder
            .download(key, &temp_path)
            .await
            .map_err(PipelineError::stage(Stage::Transcode))?;

        let final_path: PathBuf = parent.join(canonical_file_name(
            &task.uploader,
            &task.name,
            task.episode,
            &temp_path,
        ));
        tokio::fs::rename(&temp_path, &final_path).await?;

        info!(task_id = %task.id, path = %final_path.display(), "Encode complete");
        Ok(StageOutcome::Transcoded(
            final_path.to_string_lossy().into_owned(),
        ))
    }

    async fn publish(
        &self,
        task: &TaskDescriptor,
        path: &Path,
    ) -> Result<StageOutcome, PipelineError> {
        let publisher = self.publisher.as_ref().ok_or_else(|| {
            ConfigError::ValidationError("publish stage reached with publishing disabled".to_string())
        })?;

        info!(task_id = %task.id, name = %task.name, episode = task.episode, "Publishing");
        let caption = episode_caption(&task.translation, task.episode, path);
        publisher
            .send(path, &caption)
            .await
            .map_err(PipelineError::stage(Stage::Publish))?;

        Ok(StageOutcome::Published)
    }
}
