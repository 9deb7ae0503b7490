//! Webhook event dispatch.
//!
//! The [`Dispatcher`] takes one delivery from signature check to a single terminal
//! [`DispatchOutcome`]:
//!
//! 1. Verify the signature. A bad signature stops here, before any parsing or remote
//!    call.
//! 2. Parse the envelope.
//! 3. Keep only `repository` events with action `created` for repositories of the
//!    configured organization.
//! 4. Resolve the branches to protect, waiting for a fresh repository to settle.
//! 5. Decide and apply protection per branch.
//! 6. File one issue for every branch that was protected.
//!
//! # Cancellation
//!
//! If the client disconnects, the future running [`Dispatcher::dispatch`] is dropped
//! at its next suspension point. Writes already sent to GitHub are not rolled back, so
//! a redelivered event may find protection in place without the matching issue.

use std::sync::Arc;

use github_client::{Issue, RepositoryClient};
use tracing::{info, instrument, warn};

use crate::applicator::{ProtectionApplicator, ProtectionOutcome};
use crate::configuration::Configuration;
use crate::errors::ResolveError;
use crate::events::{RepositoryAction, WebhookEvent};
use crate::metrics::WebhookMetrics;
use crate::notification::NotificationIssuer;
use crate::policy::ProtectionPolicyEngine;
use crate::repository::RepositoryIdentity;
use crate::resolver::BranchResolver;
use crate::signature::{verify_signature, SignatureError};

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

/// The parts of an HTTP delivery the dispatcher needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookRequest<'a> {
    /// Value of `X-GitHub-Event`.
    pub event_type: Option<&'a str>,
    /// Value of `X-GitHub-Delivery`, only used for logging.
    pub delivery_id: Option<&'a str>,
    /// Value of `X-Hub-Signature-256`.
    pub signature_256: Option<&'a str>,
    /// Value of `X-Hub-Signature`.
    pub signature_sha1: Option<&'a str>,
    /// The raw request body, exactly as signed.
    pub body: &'a [u8],
}

/// Terminal result of processing one delivery.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    InvalidSignature(SignatureError),
    MalformedEvent(String),
    /// Nothing to do for this delivery. Holds a message naming what was ignored.
    Ignored(String),
    BranchResolutionFailed(ResolveError),
    /// Every resolved branch was already protected; nothing was written.
    AlreadyProtected { repository: RepositoryIdentity },
    /// At least one protection write failed. Branches protected before the failure
    /// stay protected.
    ProtectionFailed {
        repository: RepositoryIdentity,
        reason: String,
    },
    Protected {
        repository: RepositoryIdentity,
        branches: Vec<String>,
        issues: Vec<Issue>,
    },
    /// Protection was applied but could not be recorded as an issue.
    Undocumented {
        repository: RepositoryIdentity,
        reason: String,
    },
}

impl DispatchOutcome {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::InvalidSignature(_) => "invalid_signature",
            DispatchOutcome::MalformedEvent(_) => "malformed_event",
            DispatchOutcome::Ignored(_) => "ignored",
            DispatchOutcome::BranchResolutionFailed(_) => "branch_not_found",
            DispatchOutcome::AlreadyProtected { .. } => "already_protected",
            DispatchOutcome::ProtectionFailed { .. } => "protection_failed",
            DispatchOutcome::Protected { .. } => "protected",
            DispatchOutcome::Undocumented { .. } => "undocumented",
        }
    }
}

/// Runs the branch protection pipeline for webhook deliveries.
///
/// One dispatcher serves all requests; it holds no per-request state.
pub struct Dispatcher {
    config: Arc<Configuration>,
    resolver: BranchResolver,
    applicator: ProtectionApplicator,
    issuer: NotificationIssuer,
    metrics: Arc<dyn WebhookMetrics>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Configuration>,
        client: Arc<dyn RepositoryClient>,
        metrics: Arc<dyn WebhookMetrics>,
    ) -> Self {
        let resolver = BranchResolver::new(client.clone(), config.retry_policy(), metrics.clone());
        let applicator = ProtectionApplicator::new(
            client.clone(),
            ProtectionPolicyEngine::new(config.protection().clone()),
            metrics.clone(),
        );
        let issuer = NotificationIssuer::new(client, config.notification().clone());

        Self {
            config,
            resolver,
            applicator,
            issuer,
            metrics,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Processes one delivery and records its outcome.
    #[instrument(
        skip(self, request),
        fields(
            delivery = request.delivery_id.unwrap_or("-"),
            event_type = request.event_type.unwrap_or("-")
        )
    )]
    pub async fn dispatch(&self, request: WebhookRequest<'_>) -> DispatchOutcome {
        let outcome = self.process(&request).await;

        self.metrics.record_webhook(outcome.label());
        match &outcome {
            DispatchOutcome::Protected {
                repository,
                branches,
                ..
            } => info!(repository = %repository, branches = ?branches, "Branch protection added"),
            DispatchOutcome::Ignored(reason) => info!(reason = reason.as_str(), "Delivery ignored"),
            other => {
                warn!(outcome = other.label(), details = ?other, "Delivery not fully processed")
            }
        }

        outcome
    }

    async fn process(&self, request: &WebhookRequest<'_>) -> DispatchOutcome {
        if let Err(e) = verify_signature(
            request.body,
            request.signature_256,
            request.signature_sha1,
            self.config.webhook_secret_bytes(),
        ) {
            return DispatchOutcome::InvalidSignature(e);
        }

        let event = match WebhookEvent::parse(request.event_type, request.body) {
            Ok(event) => event,
            Err(e) => return DispatchOutcome::MalformedEvent(e.to_string()),
        };

        let event = match event {
            WebhookEvent::Repository(event) => event,
            WebhookEvent::Ping(_) => return DispatchOutcome::Ignored("pong".to_string()),
            WebhookEvent::Unrecognized { event_type } => {
                return DispatchOutcome::Ignored(format!(
                    "event type '{event_type}' is not handled, ignoring"
                ))
            }
        };

        if let RepositoryAction::Other(action) = &event.action {
            return DispatchOutcome::Ignored(format!(
                "repository event is {action}, not a create event, ignoring"
            ));
        }

        let repository = event.repository.identity();
        if !repository.belongs_to(self.config.organization()) {
            return DispatchOutcome::Ignored(format!(
                "repository {repository} is not part of organization {}, ignoring",
                self.config.organization()
            ));
        }

        info!(repository = %repository, "Adding branch protection");

        let branches = match self
            .resolver
            .resolve(
                &repository,
                event.repository.default_branch.as_deref(),
                self.config.selection(),
                self.config.branch_names(),
            )
            .await
        {
            Ok(branches) => branches,
            Err(e) => return DispatchOutcome::BranchResolutionFailed(e),
        };

        let outcomes = self.applicator.protect(&repository, &branches).await;
        self.conclude(repository, outcomes).await
    }

    /// Files issues for applied branches and folds the per-branch outcomes.
    async fn conclude(
        &self,
        repository: RepositoryIdentity,
        outcomes: Vec<(String, ProtectionOutcome)>,
    ) -> DispatchOutcome {
        let mut applied = Vec::new();
        let mut issues = Vec::new();
        let mut notification_failures = Vec::new();
        let mut write_failures = Vec::new();

        for (branch, outcome) in &outcomes {
            match outcome {
                ProtectionOutcome::Applied(details) => {
                    applied.push(branch.clone());
                    if !self.issuer.is_enabled() {
                        continue;
                    }
                    match self.issuer.notify(&repository, details).await {
                        Ok(issue) => issues.push(issue),
                        Err(e) => notification_failures.push(e.to_string()),
                    }
                }
                ProtectionOutcome::AlreadyProtected => {}
                ProtectionOutcome::Failed(reason) => {
                    write_failures.push(format!("branch '{branch}': {reason}"))
                }
                ProtectionOutcome::NotFound => {
                    write_failures.push(format!("branch '{branch}' was not found"))
                }
            }
        }

        if !write_failures.is_empty() {
            DispatchOutcome::ProtectionFailed {
                repository,
                reason: write_failures.join("; "),
            }
        } else if !notification_failures.is_empty() {
            DispatchOutcome::Undocumented {
                repository,
                reason: notification_failures.join("; "),
            }
        } else if !applied.is_empty() {
            DispatchOutcome::Protected {
                repository,
                branches: applied,
                issues,
            }
        } else {
            DispatchOutcome::AlreadyProtected { repository }
        }
    }
}
