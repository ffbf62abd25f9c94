//! Common test utilities for API testing.
//!
//! This module provides a test fixture that builds the router in-process over
//! a real SQLite store and executor, so handlers can be exercised with
//! `tower::ServiceExt::oneshot` without binding a port.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use animepipe_core::{load_config_from_str, SqliteTaskStore, TaskExecutor, TaskStatusStore};

/// Re-export fixtures for test convenience
pub use animepipe_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/api/v1/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Store backing the task endpoints
    pub store: Arc<SqliteTaskStore>,
    /// Executor backing the executor endpoint
    pub executor: TaskExecutor,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with an unlimited executor.
    pub fn new() -> Self {
        Self::with_max_concurrent(0)
    }

    /// Create a test fixture whose executor runs at most `max` tasks.
    pub fn with_max_concurrent(max: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = load_config_from_str(&format!(
            r#"
routing_path = "/etc/animepipe/routing.toml"

[server]
host = "127.0.0.1"
port = 8080

[database]
path = "{}"

[loop]
max_concurrent_tasks = {}

[qbittorrent]
url = "http://localhost:8081"
username = "admin"
password = "qbit-secret"

[finalrip]
url = "http://localhost:8848"
token = "finalrip-secret"

[jackett]
url = "http://localhost:9117"
api_key = "jackett-secret"
"#,
            db_path.display(),
            max
        ))
        .expect("Failed to parse test config");

        let store = Arc::new(SqliteTaskStore::new(&db_path).expect("Failed to create task store"));
        let executor = TaskExecutor::new(max);

        let state = Arc::new(animepipe_server::state::AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn TaskStatusStore>,
            executor.clone(),
        ));
        let router = animepipe_server::api::create_router(state);

        Self {
            router,
            store,
            executor,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request with an empty body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
