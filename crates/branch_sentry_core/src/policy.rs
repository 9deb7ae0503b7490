//! Decides whether a branch needs protection and what the protection looks like.

use github_client::{
    Branch, BranchProtectionRequest, BranchRestrictions, RequiredPullRequestReviews,
    RequiredStatusChecks,
};

use crate::configuration::ProtectionTemplate;

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

/// What to do with one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionDecision {
    /// The branch already carries a protection rule. It is left untouched, so an
    /// existing stricter rule is never replaced.
    AlreadyProtected,
    /// The branch is unprotected and gets this rule.
    Apply(BranchProtectionRequest),
}

/// Turns the configured [`ProtectionTemplate`] into per-branch decisions.
#[derive(Debug, Clone)]
pub struct ProtectionPolicyEngine {
    template: ProtectionTemplate,
}

impl ProtectionPolicyEngine {
    pub fn new(template: ProtectionTemplate) -> Self {
        Self { template }
    }

    /// Decides for a single branch. Branches are decided independently of each other.
    pub fn decide(&self, branch: &Branch) -> ProtectionDecision {
        if branch.protected {
            ProtectionDecision::AlreadyProtected
        } else {
            ProtectionDecision::Apply(self.request())
        }
    }

    /// The protection request built from the template.
    ///
    /// Sections the template leaves empty are sent as `null`, which disables them
    /// on GitHub.
    pub fn request(&self) -> BranchProtectionRequest {
        let t = &self.template;

        let checks_enabled = t.strict || !t.contexts.is_empty();
        let required_status_checks = checks_enabled.then(|| RequiredStatusChecks {
            strict: t.strict,
            contexts: t.contexts.clone(),
        });

        let reviews_enabled = t.required_approving_review_count > 0
            || t.dismiss_stale_reviews
            || t.require_code_owner_reviews;
        let required_pull_request_reviews = reviews_enabled.then(|| RequiredPullRequestReviews {
            dismiss_stale_reviews: t.dismiss_stale_reviews,
            require_code_owner_reviews: t.require_code_owner_reviews,
            required_approving_review_count: t.required_approving_review_count,
        });

        let restricted = t.restrict_pushes
            || !t.restriction_users.is_empty()
            || !t.restriction_teams.is_empty();
        let restrictions = restricted.then(|| BranchRestrictions {
            users: t.restriction_users.clone(),
            teams: t.restriction_teams.clone(),
        });

        BranchProtectionRequest {
            required_status_checks,
            enforce_admins: Some(t.enforce_admins),
            required_pull_request_reviews,
            restrictions,
        }
    }
}
