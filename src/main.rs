use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod ingest;
mod llm;
mod pipeline;
mod transform;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::db_pool::build_pool;
use crate::db::executor::DuckDbExecutor;
use crate::ingest::csv::UnicornCsvIngestor;
use crate::ingest::schema::TableSchema;
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing DuckDB connection pool at {}", config.database.connection_string);
    let pool = build_pool(&config.database.connection_string, config.database.pool_size)
        .context("Failed to build DuckDB connection pool")?;

    if let Some(csv_path) = &args.seed {
        let mut conn = pool.get().context("Failed to get a connection for seeding")?;
        let count = UnicornCsvIngestor::new(&config.database.table)
            .ingest(&mut conn, csv_path)
            .with_context(|| format!("Failed to seed from {}", csv_path.display()))?;
        info!("Seeded {} records from {}", count, csv_path.display());
    }

    // Initialize LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let table_ddl = TableSchema::unicorns(&config.database.table).to_ddl();
    let llm_manager = LlmManager::new(&config.llm, table_ddl)?;

    let executor = Arc::new(DuckDbExecutor::new(pool));
    let app_state = Arc::new(AppState::new(config.clone(), llm_manager, executor));

    // Start the web server
    info!("Starting unicorn-query server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
