use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::llm::LlmManager;
use crate::pipeline::QueryPipeline;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub executor: Arc<dyn QueryExecutor>,
    pub pipeline: QueryPipeline,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, llm: LlmManager, executor: Arc<dyn QueryExecutor>) -> Self {
        let pipeline = QueryPipeline::new(Arc::new(llm), Arc::clone(&executor));

        Self {
            config,
            executor,
            pipeline,
            startup_time: chrono::Utc::now(),
        }
    }
}
