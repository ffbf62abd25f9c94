//! Executor status endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Response for the executor status endpoint.
#[derive(Debug, Serialize)]
pub struct ExecutorStatusResponse {
    /// Executions currently registered (running or waiting for a slot).
    pub active: usize,
    /// Maximum executions running at once (0 = unlimited).
    pub max_concurrent: usize,
    pub total_started: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_deduplicated: u64,
    /// Task ids with an execution in flight, sorted.
    pub running: Vec<String>,
}

/// Get executor counters and the ids currently running.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ExecutorStatusResponse> {
    let executor = state.executor();
    let status = executor.status();

    Json(ExecutorStatusResponse {
        active: status.active,
        max_concurrent: status.max_concurrent,
        total_started: status.total_started,
        total_succeeded: status.total_succeeded,
        total_failed: status.total_failed,
        total_deduplicated: status.total_deduplicated,
        running: executor.running_ids(),
    })
}
