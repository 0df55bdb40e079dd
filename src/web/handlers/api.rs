use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::executor::QueryResult;
use crate::llm::models::QueryExplanation;
use crate::pipeline::PipelineError;
use crate::pipeline::state::Lifecycle;
use crate::transform::Row;
use crate::transform::chart::ChartView;
use crate::transform::overlay::Span;
use crate::web::error::{pipeline_status, ApiError};
use crate::web::state::AppState;

const SUGGESTIONS: [&str; 9] = [
    "Which cities have with most AI unicorns",
    "Show the countries with highest unicorn density",
    "Show the number of unicorns (grouped by year) over the past decade",
    "Compare the average valuation of AI companies vs. biotech companies",
    "Get the investors who have invested in both fintech and healthcare unicorns",
    "Investors with the most unicorns",
    "Countries with highest unicorn density",
    "Fastest growing industries by valuation",
    "Top 5 industries by total valuation",
];

// Query types

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NlQueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct NlQueryResponse {
    pub question: String,
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub chart: bool,
    #[serde(default)]
    pub explain: bool,
}

// Presentation types

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub question: String,
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanations: Vec<QueryExplanation>,
    pub spans: Vec<Span>,
}

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    pub question: String,
    pub rows: Vec<Row>,
}

// System status

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub backend: String,
    pub model: String,
    pub table: String,
}

// API Implementations

// Direct SQL execution, still restricted to SELECT
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    debug!("Direct query: {}", payload.query);
    let result = state.executor.run(&payload.query).await?;
    Ok(Json(result))
}

// Natural language query: generate SQL and run it
pub async fn nl_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> Result<Json<NlQueryResponse>, ApiError> {
    debug!("NL-query: {}", payload.question);

    let mut lifecycle = Lifecycle::new();
    state.pipeline.ask(&mut lifecycle, &payload.question).await?;

    let result = lifecycle.result.unwrap_or_default();
    Ok(Json(NlQueryResponse {
        question: lifecycle.question,
        sql: lifecycle.sql.unwrap_or_default(),
        columns: result.columns,
        rows: result.rows,
    }))
}

/// Runs the whole lifecycle and returns its final snapshot. A failed step
/// still returns the snapshot, with the status of the failure.
pub async fn ask(State(state): State<Arc<AppState>>, Json(payload): Json<AskRequest>) -> Response {
    let mut lifecycle = Lifecycle::new();

    let outcome = async {
        state.pipeline.ask(&mut lifecycle, &payload.question).await?;
        if payload.chart && lifecycle.result.as_ref().is_some_and(|r| !r.rows.is_empty()) {
            state.pipeline.chart(&mut lifecycle).await?;
        }
        if payload.explain {
            state.pipeline.explain(&mut lifecycle).await?;
        }
        Ok::<(), PipelineError>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            info!("Answered '{}' ({:?})", lifecycle.question, lifecycle.phase);
            Json(lifecycle).into_response()
        }
        Err(err @ PipelineError::Transition(_)) => ApiError::from(err).into_response(),
        Err(err) => (pipeline_status(&err), Json(lifecycle)).into_response(),
    }
}

pub async fn explain_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let mut lifecycle = Lifecycle::ready(&payload.question, &payload.sql, QueryResult::default());
    state.pipeline.explain(&mut lifecycle).await?;

    Ok(Json(ExplainResponse {
        explanations: lifecycle.explanations,
        spans: lifecycle.spans,
    }))
}

pub async fn chart(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChartRequest>,
) -> Result<Json<ChartView>, ApiError> {
    let mut lifecycle =
        Lifecycle::ready(&payload.question, "", QueryResult::from_rows(payload.rows));
    state.pipeline.chart(&mut lifecycle).await?;

    lifecycle
        .chart
        .map(Json)
        .ok_or_else(|| ApiError::from(PipelineError::NothingToChart))
}

pub async fn suggestions() -> Json<Vec<&'static str>> {
    Json(SUGGESTIONS.to_vec())
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now().signed_duration_since(state.startup_time);

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
        backend: state.config.llm.backend.clone(),
        model: state.config.llm.model.clone(),
        table: state.config.database.table.clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::llm::testing::{manager, ScriptedGenerator};
    use crate::pipeline::testing::FixedExecutor;
    use crate::web::build_router;
    use crate::web::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(replies: Vec<Value>) -> axum::Router {
        let generator = Arc::new(ScriptedGenerator::new(replies.into_iter().map(Ok).collect()));
        let executor = Arc::new(FixedExecutor::new(json!([
            {"country": "United States", "count": 650},
            {"country": "China", "count": 170},
        ])));
        build_router(Arc::new(AppState::new(AppConfig::default(), manager(generator), executor)))
    }

    async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn nl_query_returns_sql_and_rows() {
        let app = app(vec![json!({
            "query": "SELECT country, COUNT(*) AS count FROM unicorns GROUP BY country"
        })]);

        let (status, body) =
            post(app, "/api/query", json!({"question": "unicorns per country"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sql"], "SELECT country, COUNT(*) AS count FROM unicorns GROUP BY country");
        assert_eq!(body["columns"], json!(["country", "count"]));
        assert_eq!(body["rows"][1]["country"], "China");
    }

    #[tokio::test]
    async fn execute_rejects_non_select() {
        let (status, body) =
            post(app(Vec::new()), "/api/execute", json!({"query": "DELETE FROM unicorns"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only SELECT queries are allowed");
    }

    #[tokio::test]
    async fn execute_rejects_nul_bytes() {
        let (status, body) =
            post(app(Vec::new()), "/api/execute", json!({"query": "SELECT 'a\0b'"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "SQL must not contain NUL bytes");
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let (status, _) =
            post(app(Vec::new()), "/api/execute", json!({"query": "SELECT * FROM dragons"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_question_is_bad_request() {
        let (status, _) = post(app(Vec::new()), "/api/query", json!({"question": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn model_outage_is_bad_gateway() {
        let (status, body) =
            post(app(Vec::new()), "/api/query", json!({"question": "anything"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("LLM"));
    }

    #[tokio::test]
    async fn explain_returns_spans() {
        let app = app(vec![json!({"explanations": [
            {"section": "SELECT *", "explanation": "selects all columns"},
            {"section": "LIMIT 999", "explanation": "not in the query"},
            {"section": "LIMIT 20", "explanation": "caps to 20 rows"},
        ]})]);

        let (status, body) = post(
            app,
            "/api/explain",
            json!({"question": "some unicorns", "sql": "SELECT * FROM unicorns LIMIT 20"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["explanations"].as_array().unwrap().len(), 3);
        assert_eq!(
            body["spans"],
            json!([
                {"text": "SELECT *", "explanation": "selects all columns"},
                {"text": " FROM unicorns "},
                {"text": "LIMIT 20", "explanation": "caps to 20 rows"},
            ])
        );
    }

    #[tokio::test]
    async fn chart_colours_single_series() {
        let app = app(vec![json!({
            "description": "d", "takeaway": "US leads", "type": "pie", "title": "T",
            "xKey": "country", "yKeys": ["count"], "legend": true
        })]);

        let (status, body) = post(
            app,
            "/api/chart",
            json!({"question": "share by country", "rows": [{"country": "US", "count": 1}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["type"], "pie");
        assert_eq!(body["config"]["colors"]["count"], "hsl(var(--chart-1))");
        assert_eq!(body["data"], json!([{"country": "US", "count": 1}]));
    }

    #[tokio::test]
    async fn chart_without_rows_is_bad_request() {
        let (status, _) =
            post(app(Vec::new()), "/api/chart", json!({"question": "q", "rows": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ask_runs_every_requested_step() {
        let app = app(vec![
            json!({"query": "SELECT country, count FROM unicorns"}),
            json!({
                "description": "d", "takeaway": "t", "type": "bar", "title": "T",
                "xKey": "country", "yKeys": ["count"], "legend": false
            }),
            json!({"explanations": [{"section": "FROM unicorns", "explanation": "the table"}]}),
        ]);

        let (status, body) = post(
            app,
            "/api/ask",
            json!({"question": "unicorns per country", "chart": true, "explain": true}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["chart"]["config"]["type"], "bar");
        assert_eq!(body["spans"][1]["text"], "FROM unicorns");
    }

    #[tokio::test]
    async fn ask_reports_failed_snapshot() {
        let app = app(vec![json!({"query": "UPDATE unicorns SET valuation = 0"})]);

        let (status, body) = post(app, "/api/ask", json!({"question": "zero everything"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["phase"], "failed");
        assert_eq!(body["error"], "Only SELECT queries are allowed");
    }

    #[tokio::test]
    async fn suggestions_and_status_are_served() {
        let response = app(Vec::new())
            .oneshot(Request::builder().uri("/api/suggestions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(Vec::new())
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["table"], "unicorns");
        assert_eq!(body["backend"], "openai");
    }
}
