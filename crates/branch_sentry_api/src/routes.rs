//! HTTP routing configuration
//!
//! # Route Structure
//!
//! - POST   /webhook - GitHub webhook deliveries
//! - GET    /health  - Health check
//! - GET    /metrics - Prometheus metrics
//!
//! No timeout layer is installed. A delivery waiting on a new repository can take
//! as long as the retry budget allows, and it must still end in a JSON response.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::{handlers, middleware as api_middleware, AppState};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Largest webhook payload GitHub delivers.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create the complete API router with all routes configured.
///
/// This function sets up:
/// - All endpoint routes, with JSON errors for unknown paths and methods
/// - Request tracing
/// - The payload size limit
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    Router::new()
        .route(
            "/webhook",
            post(handlers::receive_webhook).fallback(handlers::method_not_allowed),
        )
        .route(
            "/health",
            get(handlers::health_check).fallback(handlers::method_not_allowed),
        )
        .route(
            "/metrics",
            get(handlers::metrics).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(trace_layer)
        .with_state(state)
}
