//! Branch Sentry webhook server
//!
//! Main binary for running the webhook receiver.
//!
//! # Environment Variables
//!
//! - `GITHUB_ACCESS_TOKEN`: Token used to call the GitHub API (required)
//! - `GITHUB_WEBHOOK_SECRET`: Secret shared with the GitHub webhook (required)
//! - `GITHUB_ORGANIZATION`: Organization to protect (overrides the config file)
//! - `GITHUB_API_URL`: API root for GitHub Enterprise Server (optional)
//! - `BRANCH_SENTRY_CONFIG`: Path to the TOML config file (default: branch_sentry.toml)
//! - `API_PORT`: Port to listen on (default: 8080)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RUST_LOG`: Log level (default: info)
//! - `LOG_FORMAT`: Set to `json` for JSON log lines

use std::{env, sync::Arc};

use anyhow::Context;
use branch_sentry_api::{ApiConfig, ApiServer, AppState};
use branch_sentry_core::Configuration;
use github_client::{create_token_client, GitHubClient};
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ACCESS_TOKEN_ENV: &str = "GITHUB_ACCESS_TOKEN";
const API_URL_ENV: &str = "GITHUB_API_URL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let api_config = ApiConfig::from_lookup(|key| env::var(key).ok())?;
    let config = Configuration::from_env().context("Failed to load configuration")?;

    let token = env::var(ACCESS_TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
        .with_context(|| format!("{ACCESS_TOKEN_ENV} must be set"))?;
    let api_url = env::var(API_URL_ENV).ok().filter(|u| !u.trim().is_empty());

    let octocrab = create_token_client(token.expose_secret(), api_url.as_deref())?;
    let client = Arc::new(GitHubClient::new(octocrab));

    tracing::info!("Starting Branch Sentry webhook server");
    tracing::info!(
        organization = config.organization(),
        branches = ?config.branch_names(),
        selection = ?config.selection(),
        "Protecting new repositories"
    );

    let state = AppState::new(Arc::new(config), client).context("Failed to register metrics")?;
    let server = ApiServer::new(api_config, state);

    server.serve().await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
