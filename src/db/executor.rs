use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use super::db_pool::DuckDbPool;
use crate::transform::Row;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Only SELECT queries are allowed")]
    NotSelect,
    #[error("SQL must not contain NUL bytes")]
    InvalidSql,
    #[error("Table does not exist: {0}")]
    MissingRelation(String),
    #[error("SQL error: {0}")]
    Database(String),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Query task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Columns come from the first row's keys.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self { columns, rows }
    }
}

/// Accepts only statements that begin with SELECT, ignoring case and
/// surrounding whitespace. Returns the trimmed statement.
///
/// DuckDB hands SQL to C as a NUL-terminated string, so an interior NUL is
/// rejected here.
pub fn guard_select(sql: &str) -> Result<&str, QueryError> {
    let trimmed = sql.trim();
    let is_select = trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if !is_select {
        return Err(QueryError::NotSelect);
    }
    if trimmed.contains('\0') {
        return Err(QueryError::InvalidSql);
    }
    Ok(trimmed)
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn run(&self, sql: &str) -> Result<QueryResult, QueryError>;
}

fn missing_relation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:Table|relation) (?:with name )?"?([A-Za-z0-9_.]+)"? does not exist"#)
            .expect("static regex")
    })
}

fn classify(err: duckdb::Error) -> QueryError {
    let message = err.to_string();
    match missing_relation_pattern().captures(&message) {
        Some(caps) => QueryError::MissingRelation(caps[1].to_string()),
        None => QueryError::Database(message),
    }
}

fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, QueryError> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, JsonArray>(&mut buffer);
        let refs: Vec<&RecordBatch> = batches.iter().collect();
        writer
            .write_batches(&refs)
            .map_err(|e| QueryError::Database(format!("Failed to encode rows: {}", e)))?;
        writer
            .finish()
            .map_err(|e| QueryError::Database(format!("Failed to encode rows: {}", e)))?;
    }

    if buffer.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&buffer)
        .map_err(|e| QueryError::Database(format!("Failed to decode rows: {}", e)))
}

pub struct DuckDbExecutor {
    pool: DuckDbPool,
}

impl DuckDbExecutor {
    pub fn new(pool: DuckDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for DuckDbExecutor {
    async fn run(&self, sql: &str) -> Result<QueryResult, QueryError> {
        let sql = guard_select(sql)?.to_string();
        let pool = self.pool.clone();
        info!("Executing SQL query: {}", sql);

        tokio::task::spawn_blocking(move || -> Result<QueryResult, QueryError> {
            let start_time = Instant::now();
            let conn = pool.get()?;

            let mut stmt = conn.prepare(&sql).map_err(|e| {
                error!("Failed to prepare query: {}", e);
                classify(e)
            })?;

            let arrow_batch = stmt.query_arrow([]).map_err(|e| {
                error!("Failed to execute query: {}", e);
                classify(e)
            })?;

            let columns = arrow_batch
                .get_schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect::<Vec<String>>();

            let record_batches: Vec<RecordBatch> = arrow_batch.collect();
            let rows = batches_to_rows(&record_batches)?;

            info!(
                "Query executed successfully. Row count: {}, Execution time: {}ms",
                rows.len(),
                start_time.elapsed().as_millis()
            );
            debug!("Columns: {:?}", columns);

            Ok(QueryResult { columns, rows })
        })
        .await
        .map_err(|e| QueryError::Task(e.to_string()))?
    }
}
