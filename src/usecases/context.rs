use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;

use crate::{api::ApiClient, infra::config::AppConfig};

pub struct AppContext {
    pub config: AppConfig,
    pub api: Arc<ApiClient>,
    /// Flushes buffered log lines when dropped; lives as long as the context.
    pub log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, api: Arc<ApiClient>, log_guard: Option<WorkerGuard>) -> Self {
        Self {
            config,
            api,
            log_guard,
        }
    }
}
