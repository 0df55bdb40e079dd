pub mod state;

use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::executor::{QueryError, QueryExecutor};
use crate::llm::{LlmError, LlmManager};
use crate::transform::chart::prepare_chart;
use crate::transform::pivot::PivotError;
use state::{Event, Lifecycle, TransitionError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Pivot(#[from] PivotError),
    #[error("the query returned no rows to chart")]
    NothingToChart,
}

/// Drives a [`Lifecycle`] through the model and the database.
#[derive(Clone)]
pub struct QueryPipeline {
    llm: Arc<LlmManager>,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryPipeline {
    pub fn new(llm: Arc<LlmManager>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { llm, executor }
    }

    fn fail<E>(lifecycle: &mut Lifecycle, err: E) -> PipelineError
    where
        E: Into<PipelineError> + Display,
    {
        warn!("Request failed while {:?}: {}", lifecycle.phase, err);
        if let Err(e) = lifecycle.apply(Event::Failed(err.to_string())) {
            warn!("Could not record failure: {}", e);
        }
        err.into()
    }

    /// Question to rows: generate SQL, then run it.
    pub async fn ask(
        &self,
        lifecycle: &mut Lifecycle,
        question: &str,
    ) -> Result<(), PipelineError> {
        lifecycle.apply(Event::Submit(question.to_string()))?;
        info!("Generating query for: {}", question);

        let sql = match self.llm.generate_query(question).await {
            Ok(sql) => sql,
            Err(e) => return Err(Self::fail(lifecycle, e)),
        };
        lifecycle.apply(Event::QueryGenerated(sql.clone()))?;

        let result = match self.executor.run(&sql).await {
            Ok(result) => result,
            Err(e) => return Err(Self::fail(lifecycle, e)),
        };
        info!("Query returned {} rows", result.rows.len());
        lifecycle.apply(Event::RowsFetched(result))?;
        Ok(())
    }

    pub async fn chart(&self, lifecycle: &mut Lifecycle) -> Result<(), PipelineError> {
        let rows = lifecycle
            .result
            .as_ref()
            .map(|r| r.rows.clone())
            .unwrap_or_default();
        lifecycle.apply(Event::ChartRequested)?;
        if rows.is_empty() {
            return Err(Self::fail(lifecycle, PipelineError::NothingToChart));
        }

        let config = match self.llm.generate_chart_config(&lifecycle.question, &rows).await {
            Ok(config) => config,
            Err(e) => return Err(Self::fail(lifecycle, e)),
        };
        let view = match prepare_chart(config, rows) {
            Ok(view) => view,
            Err(e) => return Err(Self::fail(lifecycle, e)),
        };
        lifecycle.apply(Event::ChartReady(view))?;
        Ok(())
    }

    pub async fn explain(&self, lifecycle: &mut Lifecycle) -> Result<(), PipelineError> {
        lifecycle.apply(Event::ExplainRequested)?;
        let sql = lifecycle.sql.clone().unwrap_or_default();

        let explanations = match self.llm.explain_query(&lifecycle.question, &sql).await {
            Ok(list) => list,
            Err(e) => return Err(Self::fail(lifecycle, e)),
        };
        lifecycle.apply(Event::Explained(explanations))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::executor::QueryResult;
    use crate::transform::Row;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves fixed rows and remembers the SQL it was asked to run.
    pub struct FixedExecutor {
        rows: Vec<Row>,
        pub seen: Mutex<Vec<String>>,
    }

    impl FixedExecutor {
        pub fn new(rows: serde_json::Value) -> Self {
            Self {
                rows: serde_json::from_value(rows).unwrap(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for FixedExecutor {
        async fn run(&self, sql: &str) -> Result<QueryResult, QueryError> {
            self.seen.lock().unwrap().push(sql.to_string());
            let sql = crate::db::executor::guard_select(sql)?;
            if sql.contains("dragons") {
                return Err(QueryError::MissingRelation("dragons".into()));
            }
            Ok(QueryResult::from_rows(self.rows.clone()))
        }
    }
}
