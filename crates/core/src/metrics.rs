//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery (cycles, items seen, items dropped)
//! - Executor (submissions, deduplication, active tasks)
//! - Pipeline (stage completions and failures, run durations)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Discovery cycles by result.
pub static DISCOVERY_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animepipe_discovery_cycles_total", "Total discovery cycles"),
        &["result"], // "ok", "routing_error", "feed_error"
    )
    .unwrap()
});

/// Items returned by the discovery feed.
pub static ITEMS_DISCOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "animepipe_items_discovered_total",
        "Total items returned by the discovery feed",
    )
    .unwrap()
});

/// Items dropped before submission.
pub static ITEMS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "animepipe_items_dropped_total",
            "Discovered items dropped before submission",
        ),
        &["reason"], // "unknown_profile"
    )
    .unwrap()
});

// =============================================================================
// Executor Metrics
// =============================================================================

/// Task executions started.
pub static TASKS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("animepipe_tasks_started_total", "Total task executions started").unwrap()
});

/// Submissions dropped because the task was already running.
pub static TASKS_DEDUPLICATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "animepipe_tasks_deduplicated_total",
        "Submissions dropped because the task was already running",
    )
    .unwrap()
});

/// Task executions currently running.
pub static TASKS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("animepipe_tasks_active", "Task executions currently running").unwrap()
});

/// Finished task executions by result.
pub static TASK_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animepipe_task_runs_total", "Finished task executions"),
        &["result"], // "success", "failed", "panicked"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Stage checkpoints persisted.
pub static STAGES_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "animepipe_stages_completed_total",
            "Stage checkpoints persisted",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Stage attempts aborted by an error.
pub static STAGES_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animepipe_stages_failed_total", "Stage attempts aborted"),
        &["stage"],
    )
    .unwrap()
});

/// Duration of one pipeline run for a task.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "animepipe_task_duration_seconds",
            "Duration of one task execution",
        )
        .buckets(vec![
            1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0, 43200.0,
        ]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Discovery
        Box::new(DISCOVERY_CYCLES.clone()),
        Box::new(ITEMS_DISCOVERED.clone()),
        Box::new(ITEMS_DROPPED.clone()),
        // Executor
        Box::new(TASKS_STARTED.clone()),
        Box::new(TASKS_DEDUPLICATED.clone()),
        Box::new(TASKS_ACTIVE.clone()),
        Box::new(TASK_RUNS.clone()),
        // Pipeline
        Box::new(STAGES_COMPLETED.clone()),
        Box::new(STAGES_FAILED.clone()),
        Box::new(TASK_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_once() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        STAGES_COMPLETED.with_label_values(&["acquire"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "animepipe_stages_completed_total"));
    }
}
