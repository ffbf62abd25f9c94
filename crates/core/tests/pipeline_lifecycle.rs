//! Pipeline lifecycle integration tests.
//!
//! These tests drive `TaskPipeline` with mock stage clients and a real
//! SQLite store:
//! - Full acquire -> transcode -> publish -> done runs
//! - Resumption from each checkpoint
//! - Failure semantics (no checkpoint past the failed stage)
//! - Deduplicated execution through the executor

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use animepipe_core::{
    pipeline::{PipelineError, PollPolicy, Stage, TaskPipeline},
    testing::{fixtures, DownloaderCall, MockDownloader, MockPublisher, MockTranscoder},
    SqliteTaskStore, StageClientError, SubmitOutcome, TaskExecutor, TaskStatus, TaskStatusStore,
};

/// Test helper wiring a pipeline to mocks.
struct TestHarness {
    store: Arc<SqliteTaskStore>,
    downloader: Arc<MockDownloader>,
    transcoder: Arc<MockTranscoder>,
    publisher: Arc<MockPublisher>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_downloader(|d| d)
    }

    fn with_downloader(configure: impl FnOnce(MockDownloader) -> MockDownloader) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteTaskStore::new(&temp_dir.path().join("tasks.db"))
                .expect("Failed to create task store"),
        );
        let downloader =
            Arc::new(configure(MockDownloader::new().with_download_dir(temp_dir.path())));

        Self {
            store,
            downloader,
            transcoder: Arc::new(MockTranscoder::new()),
            publisher: Arc::new(MockPublisher::new()),
            temp_dir,
        }
    }

    fn pipeline(&self, publish: bool) -> TaskPipeline {
        let pipeline = TaskPipeline::new(
            Arc::clone(&self.store) as Arc<dyn TaskStatusStore>,
            self.downloader.clone(),
            self.transcoder.clone(),
        )
        .with_poll_policy(PollPolicy::new(Duration::ZERO));

        if publish {
            pipeline.with_publisher(self.publisher.clone())
        } else {
            pipeline
        }
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn status(&self, id: &str) -> TaskStatus {
        self.store.get(id).expect("task should exist").status
    }

    fn expected_output(&self) -> PathBuf {
        self.dir().join("[SubGroup] Frieren [01].mkv")
    }
}

#[tokio::test]
async fn test_new_task_runs_every_stage() {
    let harness = TestHarness::with_downloader(|d| d.with_checks_until_complete(3));
    let task = fixtures::task_descriptor("abc123");

    harness.pipeline(true).run(&task).await.unwrap();

    let status = harness.status("abc123");
    let source = harness.dir().join("abc123.mkv");
    let output = harness.expected_output();
    assert_eq!(status.acquired_path.as_deref(), source.to_str());
    assert_eq!(status.transcoded_path.as_deref(), output.to_str());
    assert!(status.published);
    assert!(status.done);
    assert!(status.is_monotonic(true));

    // Temp download was renamed to the canonical name
    assert!(output.exists());
    assert!(!harness.dir().join("abc123.mkv-encoded.mkv").exists());

    // Encode used the resolved profile bodies
    assert_eq!(
        harness.transcoder.started().await,
        vec![(
            "abc123.mkv".to_string(),
            fixtures::PARAM_BODY.to_string(),
            fixtures::SCRIPT_BODY.to_string()
        )]
    );

    let sent = harness.publisher.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].path, output);
    assert_eq!(
        sent[0].caption,
        "Frieren: Beyond Journey's End | EP 1 | [SubGroup] Frieren [01].mkv"
    );
}

#[tokio::test]
async fn test_acquisition_polls_until_complete_then_checkpoints() {
    let harness = TestHarness::with_downloader(|d| {
        d.with_download_dir("/data").with_checks_until_complete(3)
    });
    // Stop the run right after acquisition
    harness
        .transcoder
        .set_next_error(StageClientError::ConnectionFailed("refused".to_string()))
        .await;

    let task = fixtures::task_descriptor("abc123");
    let result = harness.pipeline(true).run(&task).await;
    assert!(matches!(
        result,
        Err(PipelineError::Stage {
            stage: Stage::Transcode,
            ..
        })
    ));

    let status = harness.status("abc123");
    assert_eq!(status.acquired_path.as_deref(), Some("/data/abc123.mkv"));
    assert!(status.transcoded_path.is_none());
    assert!(!status.published);
    assert!(!status.done);

    let calls = harness.downloader.calls().await;
    assert_eq!(
        calls[..2],
        [
            DownloaderCall::Exists("abc123".to_string()),
            DownloaderCall::Start {
                hash: "abc123".to_string(),
                link: "magnet:?xt=urn:btih:abc123".to_string(),
            },
        ]
    );
    let completion_checks = calls
        .iter()
        .filter(|c| matches!(c, DownloaderCall::IsComplete(_)))
        .count();
    assert_eq!(completion_checks, 3);
}

#[tokio::test]
async fn test_done_task_is_a_no_op() {
    let harness = TestHarness::new();
    let done = TaskStatus {
        acquired_path: Some("/data/abc123.mkv".to_string()),
        transcoded_path: Some("/data/[SubGroup] Frieren [01].mkv".to_string()),
        published: true,
        done: true,
    };
    let before = harness.store.create("abc123", done.clone()).unwrap();

    harness
        .pipeline(true)
        .run(&fixtures::task_descriptor("abc123"))
        .await
        .unwrap();

    assert_eq!(harness.downloader.call_count().await, 0);
    assert_eq!(harness.transcoder.call_count().await, 0);
    assert!(harness.publisher.sent().await.is_empty());

    let after = harness.store.get("abc123").unwrap();
    assert_eq!(after.status, done);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn test_restart_after_acquisition_skips_download() {
    let harness = TestHarness::new();
    let source = harness.dir().join("abc123.mkv");
    harness
        .store
        .create(
            "abc123",
            TaskStatus {
                acquired_path: Some(source.to_string_lossy().into_owned()),
                ..TaskStatus::new()
            },
        )
        .unwrap();

    harness
        .pipeline(true)
        .run(&fixtures::task_descriptor("abc123"))
        .await
        .unwrap();

    assert_eq!(harness.downloader.call_count().await, 0);
    assert_eq!(harness.transcoder.upload_count().await, 1);

    let status = harness.status("abc123");
    assert_eq!(status.acquired_path.as_deref(), source.to_str());
    assert!(status.transcoded_path.is_some());
    assert!(status.done);
}

#[tokio::test]
async fn test_publish_only_when_transcoded() {
    let harness = TestHarness::new();
    let output = harness.expected_output();
    harness
        .store
        .create(
            "abc123",
            TaskStatus {
                acquired_path: Some("/data/abc123.mkv".to_string()),
                transcoded_path: Some(output.to_string_lossy().into_owned()),
                published: false,
                done: false,
            },
        )
        .unwrap();

    harness
        .pipeline(true)
        .run(&fixtures::task_descriptor("abc123"))
        .await
        .unwrap();

    assert_eq!(harness.downloader.call_count().await, 0);
    assert_eq!(harness.transcoder.call_count().await, 0);
    assert_eq!(harness.publisher.sent().await.len(), 1);

    let status = harness.status("abc123");
    assert!(status.published);
    assert!(status.done);
}

#[tokio::test]
async fn test_publish_disabled_finishes_without_publishing() {
    let harness = TestHarness::new();

    harness
        .pipeline(false)
        .run(&fixtures::task_descriptor("abc123"))
        .await
        .unwrap();

    let status = harness.status("abc123");
    assert!(status.done);
    assert!(!status.published);
    assert!(status.is_monotonic(false));
    assert!(harness.publisher.sent().await.is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_transcode_checkpoint() {
    let harness = TestHarness::new();
    harness
        .publisher
        .set_next_error(StageClientError::Api("Bad Request: chat not found".to_string()))
        .await;
    let task = fixtures::task_descriptor("abc123");
    let pipeline = harness.pipeline(true);

    let result = pipeline.run(&task).await;
    assert!(matches!(
        result,
        Err(PipelineError::Stage {
            stage: Stage::Publish,
            ..
        })
    ));
    let status = harness.status("abc123");
    assert!(status.transcoded_path.is_some());
    assert!(!status.published);
    assert!(!status.done);

    // The next run resumes at publishing
    pipeline.run(&task).await.unwrap();
    assert_eq!(harness.transcoder.upload_count().await, 1);
    assert_eq!(harness.publisher.sent().await.len(), 1);
    assert!(harness.status("abc123").done);
}

#[tokio::test]
async fn test_bounded_poll_gives_up() {
    let harness = TestHarness::with_downloader(|d| d.with_checks_until_complete(100));
    let pipeline = harness
        .pipeline(true)
        .with_poll_policy(PollPolicy::new(Duration::ZERO).with_max_attempts(5));

    let result = pipeline.run(&fixtures::task_descriptor("abc123")).await;
    assert!(matches!(
        result,
        Err(PipelineError::PollExhausted { attempts: 5, .. })
    ));
    assert_eq!(harness.status("abc123"), TaskStatus::new());
}

#[tokio::test]
async fn test_double_submission_runs_once() {
    let harness = TestHarness::with_downloader(|d| d.with_checks_until_complete(20));
    let pipeline = Arc::new(
        harness
            .pipeline(true)
            .with_poll_policy(PollPolicy::new(Duration::from_millis(2))),
    );
    let executor = TaskExecutor::new(0);
    let task = fixtures::task_descriptor("abc123");

    let first = {
        let pipeline = Arc::clone(&pipeline);
        let task = task.clone();
        executor.submit("abc123", async move { pipeline.run(&task).await })
    };
    let second = {
        let pipeline = Arc::clone(&pipeline);
        let task = task.clone();
        executor.submit("abc123", async move { pipeline.run(&task).await })
    };

    assert_eq!(first, SubmitOutcome::Started);
    assert_eq!(second, SubmitOutcome::AlreadyRunning);

    executor.wait_idle().await;
    assert_eq!(harness.downloader.start_count().await, 1);
    assert_eq!(harness.transcoder.upload_count().await, 1);
    assert_eq!(harness.publisher.sent().await.len(), 1);
    assert!(harness.status("abc123").done);

    let status = executor.status();
    assert_eq!(status.total_started, 1);
    assert_eq!(status.total_deduplicated, 1);
    assert_eq!(status.total_succeeded, 1);
}
