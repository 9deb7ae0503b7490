//! # Branch Sentry Core
//!
//! This crate holds the event-processing pipeline of Branch Sentry, a webhook service
//! that adds branch protection to newly created repositories of a GitHub organization
//! and records the applied rule as an issue in the repository.
//!
//! ## Overview
//!
//! A webhook delivery flows through these components, leaf first:
//! 1. [`RetryPolicy`] - exponential backoff with jitter
//! 2. [`BranchResolver`] - waits for the branches of a fresh repository to appear
//! 3. [`ProtectionPolicyEngine`] - decides per branch whether protection is needed
//! 4. [`ProtectionApplicator`] - writes the protection rule
//! 5. [`NotificationIssuer`] - files the tracking issue
//! 6. [`Dispatcher`] - verifies, parses and filters the delivery and runs the above
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use branch_sentry_core::{Configuration, Dispatcher, NoOpWebhookMetrics, WebhookRequest};
//! use github_client::{create_token_client, GitHubClient};
//!
//! # async fn example(body: &[u8], signature: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Configuration::from_env()?);
//! let client = Arc::new(GitHubClient::new(create_token_client("ghp_example", None)?));
//! let dispatcher = Dispatcher::new(config, client, Arc::new(NoOpWebhookMetrics));
//!
//! let outcome = dispatcher
//!     .dispatch(WebhookRequest {
//!         event_type: Some("repository"),
//!         signature_256: Some(signature),
//!         body,
//!         ..WebhookRequest::default()
//!     })
//!     .await;
//! println!("{}", outcome.label());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! All GitHub access goes through the [`github_client::RepositoryClient`] trait, so
//! the pipeline runs against an in-memory client in tests. Configuration is immutable
//! and shared as `Arc<Configuration>`; every request builds its own retry state.

pub mod applicator;
pub mod configuration;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod notification;
pub mod policy;
pub mod repository;
pub mod resolver;
pub mod retry;
pub mod signature;

#[cfg(test)]
mod test_support;

pub use applicator::{ProtectionApplicator, ProtectionDetails, ProtectionOutcome};
pub use configuration::{
    BranchSelection, Configuration, ConfigurationFile, NotificationSettings, ProtectionTemplate,
    RetrySettings,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, WebhookRequest};
pub use errors::{ConfigurationError, NotificationError, ResolveError};
pub use events::{EventParseError, RepositoryAction, RepositoryEvent, WebhookEvent};
pub use metrics::{NoOpWebhookMetrics, PrometheusWebhookMetrics, WebhookMetrics};
pub use notification::NotificationIssuer;
pub use policy::{ProtectionDecision, ProtectionPolicyEngine};
pub use repository::RepositoryIdentity;
pub use resolver::BranchResolver;
pub use retry::{Backoff, RetryPolicy};
pub use signature::{SignatureAlgorithm, SignatureError};
