use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware::access_log;
use crate::AppState;

/// Builds the `Router` serving the scrape endpoint.
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics::scrape))
        .route("/descriptors", get(handlers::metrics::descriptors))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(access_log::log_requests))
        .layer(TimeoutLayer::new(request_timeout))
}
