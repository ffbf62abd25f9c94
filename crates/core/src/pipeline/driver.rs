//! Discovery loop: turn feed items into task executions.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ProfileTable, RoutingSource};
use crate::executor::{SubmitOutcome, TaskExecutor};
use crate::feed::DiscoveryFeed;
use crate::metrics;

use super::runner::TaskPipeline;
use super::types::{PipelineError, TaskDescriptor};

/// What one discovery cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Items returned by the feed.
    pub discovered: usize,
    /// Items handed to the executor.
    pub submitted: usize,
    /// Items whose task was already executing.
    pub already_running: usize,
    /// Items dropped because their routing could not be resolved.
    pub dropped: usize,
}

/// Periodically discovers items and submits a pipeline run for each.
///
/// The loop never waits for submitted tasks; resubmitting an item that is
/// already done or running is cheap.
pub struct PipelineLoop {
    routing: Arc<dyn RoutingSource>,
    feed: Arc<dyn DiscoveryFeed>,
    executor: TaskExecutor,
    pipeline: Arc<TaskPipeline>,
    interval: Duration,
}

impl PipelineLoop {
    pub fn new(
        routing: Arc<dyn RoutingSource>,
        feed: Arc<dyn DiscoveryFeed>,
        executor: TaskExecutor,
        pipeline: Arc<TaskPipeline>,
        interval: Duration,
    ) -> Self {
        Self {
            routing,
            feed,
            executor,
            pipeline,
            interval,
        }
    }

    /// The executor tasks are submitted to.
    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Run one discovery cycle.
    ///
    /// Fails without submitting anything if the routing config cannot be
    /// loaded or the feed cannot be refreshed.
    pub async fn tick(&self) -> Result<TickReport, PipelineError> {
        let routing = self.routing.load()?;
        let table = ProfileTable::build(&routing)?;

        self.feed.refresh(&routing.feeds).await?;
        let items = self.feed.list().await;

        let mut report = TickReport {
            discovered: items.len(),
            ..TickReport::default()
        };
        metrics::ITEMS_DISCOVERED.inc_by(items.len() as u64);

        for item in items {
            let resolved = table
                .feed(&item.name)
                .and_then(|entry| table.resolve(entry).map(|profile| (entry, profile)));
            let (entry, profile) = match resolved {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(
                        task_id = %item.hash,
                        name = %item.name,
                        episode = item.episode,
                        error = %e,
                        "Dropping item with unresolved routing"
                    );
                    metrics::ITEMS_DROPPED
                        .with_label_values(&["unknown_profile"])
                        .inc();
                    report.dropped += 1;
                    continue;
                }
            };

            let task = TaskDescriptor::build(&item, entry, profile);
            let pipeline = Arc::clone(&self.pipeline);
            let id = task.id.clone();

            match self
                .executor
                .submit(id, async move { pipeline.run(&task).await })
            {
                SubmitOutcome::Started => report.submitted += 1,
                SubmitOutcome::AlreadyRunning => report.already_running += 1,
            }
        }

        Ok(report)
    }

    /// Run discovery cycles until `shutdown` is cancelled.
    ///
    /// A failed cycle is logged and the loop carries on. In-flight tasks are
    /// left running; use [`TaskExecutor::wait_idle`] to drain them.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Pipeline loop started");

        while !shutdown.is_cancelled() {
            match self.tick().await {
                Ok(report) => {
                    metrics::DISCOVERY_CYCLES.with_label_values(&["ok"]).inc();
                    info!(
                        discovered = report.discovered,
                        submitted = report.submitted,
                        already_running = report.already_running,
                        dropped = report.dropped,
                        "Discovery cycle complete"
                    );
                }
                Err(e) => {
                    let result = match &e {
                        PipelineError::Feed(_) => "feed_error",
                        _ => "routing_error",
                    };
                    metrics::DISCOVERY_CYCLES.with_label_values(&[result]).inc();
                    warn!(error = %e, "Discovery cycle failed");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Pipeline loop received shutdown signal");
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Pipeline loop stopped");
    }
}
