//! Branch Sentry HTTP API
//!
//! This crate exposes the branch protection pipeline of `branch_sentry_core` over
//! HTTP. GitHub delivers webhooks to `POST /webhook`; operators use `GET /health`
//! and `GET /metrics`.
//!
//! # Architecture
//!
//! This crate exists in the HTTP layer and handles:
//! - Reading webhook headers and the raw body
//! - Mapping dispatch outcomes to HTTP responses
//! - Request tracing
//! - Routing and server configuration
//!
//! The dependency flows HTTP API → business logic, never the reverse.

use std::sync::Arc;

use branch_sentry_core::{Configuration, Dispatcher, PrometheusWebhookMetrics};
use github_client::RepositoryClient;
use prometheus::Registry;

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use errors::{ApiError, ErrorDetails, ErrorResponse};
pub use models::response;
pub use server::{ApiConfig, ApiServer};

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// Response header carrying the reason a delivery was ignored.
pub const IGNORED_HEADER: &str = "x-branch-sentry-ignored";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs the protection pipeline for each delivery
    pub dispatcher: Arc<Dispatcher>,

    /// Registry rendered by the metrics endpoint
    pub registry: Registry,
}

impl AppState {
    /// Create application state with Prometheus metrics registered in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be registered.
    pub fn new(
        config: Arc<Configuration>,
        client: Arc<dyn RepositoryClient>,
    ) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let metrics = Arc::new(PrometheusWebhookMetrics::new(&registry)?);
        let dispatcher = Arc::new(Dispatcher::new(config, client, metrics));

        Ok(Self {
            dispatcher,
            registry,
        })
    }
}
