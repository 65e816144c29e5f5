use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        .route("/api/status", get(handlers::status::get_status))
        .route("/api/runs", get(handlers::sync::list_runs))
        .route("/api/sync", post(handlers::sync::sync_sites))
        .route("/api/sync/:site", post(handlers::sync::sync_site))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
