use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes - JSON API consumed by the UI
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Query endpoints
            .route("/query", post(handlers::api::nl_query))
            .route("/execute", post(handlers::api::execute_query))
            .route("/ask", post(handlers::api::ask))

            // Presentation helpers
            .route("/explain", post(handlers::api::explain_query))
            .route("/chart", post(handlers::api::chart))
            .route("/suggestions", get(handlers::api::suggestions))

            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
