use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::db::executor::QueryError;
use crate::pipeline::PipelineError;
use crate::pipeline::state::TransitionError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub fn query_status(err: &QueryError) -> StatusCode {
    match err {
        QueryError::NotSelect | QueryError::InvalidSql => StatusCode::BAD_REQUEST,
        QueryError::MissingRelation(_) => StatusCode::NOT_FOUND,
        QueryError::Database(_) => StatusCode::BAD_REQUEST,
        QueryError::Pool(_) | QueryError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Transition(TransitionError::BlankQuestion) => StatusCode::BAD_REQUEST,
        PipelineError::Transition(TransitionError::Illegal { .. }) => StatusCode::CONFLICT,
        PipelineError::Llm(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Query(e) => query_status(e),
        PipelineError::Pivot(_) | PipelineError::NothingToChart => StatusCode::BAD_REQUEST,
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self {
            status: query_status(&err),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self {
            status: pipeline_status(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
