//! Task status API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use animepipe_core::{PipelineState, StoreError, TaskFilter, TaskRecord};

use crate::state::AppState;

/// Maximum allowed limit for task queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for task queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    /// Filter by completion
    pub done: Option<bool>,
    /// Maximum number of tasks to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for a single task
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub state: PipelineState,
    /// Whether an execution is in flight right now
    pub running: bool,
    pub acquired_path: Option<String>,
    pub transcoded_path: Option<String>,
    pub published: bool,
    pub done: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskResponse {
    fn new(record: TaskRecord, running: bool) -> Self {
        Self {
            state: PipelineState::from_status(&record.status),
            running,
            id: record.id,
            acquired_path: record.status.acquired_path,
            transcoded_path: record.status.transcoded_path,
            published: record.status.published,
            done: record.status.done,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TaskErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<TaskErrorResponse>);

fn internal_error(e: StoreError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(TaskErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Get a task by ID
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    match state.store().get(&id) {
        Ok(record) => {
            let running = state.executor().is_running(&id);
            Ok(Json(TaskResponse::new(record, running)))
        }
        Err(StoreError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(TaskErrorResponse {
                error: format!("Task not found: {}", id),
            }),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// List tasks with optional filters
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TaskFilter::new().with_limit(limit).with_offset(offset);
    if let Some(done) = params.done {
        filter = filter.with_done(done);
    }

    let records = state.store().list(&filter).map_err(internal_error)?;
    let total = state.store().count(&filter).map_err(internal_error)?;

    let executor = state.executor();
    let tasks = records
        .into_iter()
        .map(|record| {
            let running = executor.is_running(&record.id);
            TaskResponse::new(record, running)
        })
        .collect();

    Ok(Json(ListTasksResponse {
        tasks,
        total,
        limit,
        offset,
    }))
}
