use std::sync::Arc;

use animepipe_core::{Config, SanitizedConfig, TaskExecutor, TaskStatusStore};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn TaskStatusStore>,
    executor: TaskExecutor,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TaskStatusStore>, executor: TaskExecutor) -> Self {
        Self {
            config,
            store,
            executor,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn TaskStatusStore {
        self.store.as_ref()
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }
}
