//! The lifecycle of one natural-language request.
//!
//! ```text
//! Idle/Ready/Failed --Submit--> GeneratingQuery --QueryGenerated--> Executing --RowsFetched--> Ready
//! Ready --ChartRequested--> GeneratingChart --ChartReady--> Ready
//! Ready --ExplainRequested--> Explaining --Explained--> Ready
//! GeneratingQuery/Executing/GeneratingChart/Explaining --Failed--> Failed
//! any --Clear--> Idle
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::db::executor::QueryResult;
use crate::llm::models::QueryExplanation;
use crate::transform::chart::ChartView;
use crate::transform::overlay::{overlay_explanations, Span};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    GeneratingQuery,
    Executing,
    Ready,
    GeneratingChart,
    Explaining,
    Failed,
}

impl Phase {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Phase::GeneratingQuery | Phase::Executing | Phase::GeneratingChart | Phase::Explaining
        )
    }
}

#[derive(Debug)]
pub enum Event {
    Submit(String),
    QueryGenerated(String),
    RowsFetched(QueryResult),
    ChartRequested,
    ChartReady(ChartView),
    ExplainRequested,
    Explained(Vec<QueryExplanation>),
    Failed(String),
    Clear,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Submit(_) => "submit",
            Event::QueryGenerated(_) => "query_generated",
            Event::RowsFetched(_) => "rows_fetched",
            Event::ChartRequested => "chart_requested",
            Event::ChartReady(_) => "chart_ready",
            Event::ExplainRequested => "explain_requested",
            Event::Explained(_) => "explained",
            Event::Failed(_) => "failed",
            Event::Clear => "clear",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("question must not be blank")]
    BlankQuestion,
    #[error("cannot apply '{event}' while {phase:?}")]
    Illegal { phase: Phase, event: &'static str },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Lifecycle {
    pub phase: Phase,
    pub question: String,
    pub sql: Option<String>,
    pub result: Option<QueryResult>,
    pub chart: Option<ChartView>,
    pub explanations: Vec<QueryExplanation>,
    pub spans: Vec<Span>,
    pub error: Option<String>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lifecycle resumed at `Ready` from a query that already ran.
    pub fn ready(question: &str, sql: &str, result: QueryResult) -> Self {
        Self {
            phase: Phase::Ready,
            question: question.to_string(),
            sql: Some(sql.to_string()),
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let name = event.name();
        let illegal = |phase| TransitionError::Illegal { phase, event: name };

        match (self.phase, event) {
            (_, Event::Clear) => *self = Self::default(),
            (Phase::Idle | Phase::Ready | Phase::Failed, Event::Submit(question)) => {
                if question.trim().is_empty() {
                    return Err(TransitionError::BlankQuestion);
                }
                *self = Self {
                    phase: Phase::GeneratingQuery,
                    question,
                    ..Self::default()
                };
            }
            (Phase::GeneratingQuery, Event::QueryGenerated(sql)) => {
                self.sql = Some(sql);
                self.phase = Phase::Executing;
            }
            (Phase::Executing, Event::RowsFetched(result)) => {
                self.result = Some(result);
                self.phase = Phase::Ready;
            }
            (Phase::Ready, Event::ChartRequested) => self.phase = Phase::GeneratingChart,
            (Phase::GeneratingChart, Event::ChartReady(view)) => {
                self.chart = Some(view);
                self.phase = Phase::Ready;
            }
            (Phase::Ready, Event::ExplainRequested) => self.phase = Phase::Explaining,
            (Phase::Explaining, Event::Explained(explanations)) => {
                let sql = self.sql.as_deref().unwrap_or_default();
                self.spans = overlay_explanations(sql, &explanations);
                self.explanations = explanations;
                self.phase = Phase::Ready;
            }
            (phase, Event::Failed(message)) if phase.is_in_flight() => {
                self.error = Some(message);
                self.phase = Phase::Failed;
            }
            (phase, _) => return Err(illegal(phase)),
        }
        Ok(())
    }
}
