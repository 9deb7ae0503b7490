//! Writes branch protection rules.
//!
//! The write is made exactly once per branch and never retried: a failed write is
//! reported to the caller, who decides how to surface it.

use std::sync::Arc;

use github_client::{Branch, BranchProtectionRequest, Error, RepositoryClient};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::metrics::WebhookMetrics;
use crate::policy::{ProtectionDecision, ProtectionPolicyEngine};
use crate::repository::RepositoryIdentity;

#[cfg(test)]
#[path = "applicator_tests.rs"]
mod tests;

/// The protection GitHub stored for a branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionDetails {
    pub branch: String,
    /// The protection exactly as GitHub echoed it back.
    pub protection: serde_json::Value,
}

/// Result of enforcing protection on one branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtectionOutcome {
    Applied(ProtectionDetails),
    AlreadyProtected,
    /// GitHub refused the write. Holds the error message.
    Failed(String),
    /// The branch disappeared between resolution and the write.
    NotFound,
}

impl ProtectionOutcome {
    /// Label used for the protection write metric.
    fn write_label(&self) -> Option<&'static str> {
        match self {
            ProtectionOutcome::Applied(_) => Some("applied"),
            ProtectionOutcome::Failed(_) => Some("failed"),
            ProtectionOutcome::NotFound => Some("not_found"),
            ProtectionOutcome::AlreadyProtected => None,
        }
    }
}

/// Applies the configured protection to resolved branches.
pub struct ProtectionApplicator {
    client: Arc<dyn RepositoryClient>,
    engine: ProtectionPolicyEngine,
    metrics: Arc<dyn WebhookMetrics>,
}

impl ProtectionApplicator {
    pub fn new(
        client: Arc<dyn RepositoryClient>,
        engine: ProtectionPolicyEngine,
        metrics: Arc<dyn WebhookMetrics>,
    ) -> Self {
        Self {
            client,
            engine,
            metrics,
        }
    }

    /// Decides and applies protection for each branch, in order.
    ///
    /// A failure on one branch does not stop the others.
    pub async fn protect(
        &self,
        repo: &RepositoryIdentity,
        branches: &[Branch],
    ) -> Vec<(String, ProtectionOutcome)> {
        let mut outcomes = Vec::with_capacity(branches.len());

        for branch in branches {
            let outcome = match self.engine.decide(branch) {
                ProtectionDecision::AlreadyProtected => {
                    info!(
                        owner = repo.owner(),
                        repo = repo.name(),
                        branch = branch.name.as_str(),
                        "Branch already protected, skipping"
                    );
                    ProtectionOutcome::AlreadyProtected
                }
                ProtectionDecision::Apply(request) => {
                    self.apply(repo, &branch.name, &request).await
                }
            };
            outcomes.push((branch.name.clone(), outcome));
        }

        outcomes
    }

    /// Writes `request` to `branch` with a single call.
    #[instrument(skip(self, request), fields(owner = %repo.owner(), repo = %repo.name()))]
    pub async fn apply(
        &self,
        repo: &RepositoryIdentity,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> ProtectionOutcome {
        let outcome = match self
            .client
            .update_branch_protection(repo.owner(), repo.name(), branch, request)
            .await
        {
            Ok(protection) => {
                info!("Branch protection applied");
                ProtectionOutcome::Applied(ProtectionDetails {
                    branch: branch.to_string(),
                    protection,
                })
            }
            Err(Error::NotFound) => {
                warn!("Branch vanished before protection could be applied");
                ProtectionOutcome::NotFound
            }
            Err(e) => {
                warn!(error = %e, "Failed to apply branch protection");
                ProtectionOutcome::Failed(e.to_string())
            }
        };

        if let Some(label) = outcome.write_label() {
            self.metrics.record_protection_write(label);
        }
        outcome
    }
}
