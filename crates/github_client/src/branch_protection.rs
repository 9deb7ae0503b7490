//! Branch protection domain types.
//!
//! This module contains the request body for
//! `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
//!
//! GitHub requires all four top level keys to be present in the request. A section
//! that should not be enforced is sent as `null`, which is why none of the optional
//! fields are skipped during serialization.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// Branch protection rules to apply to a repository branch.
///
/// # Examples
///
/// ```rust
/// use github_client::{BranchProtectionRequest, RequiredPullRequestReviews, RequiredStatusChecks};
///
/// let protection = BranchProtectionRequest {
///     required_status_checks: Some(RequiredStatusChecks {
///         strict: true,
///         contexts: vec!["continuous-integration".to_string()],
///     }),
///     enforce_admins: Some(true),
///     required_pull_request_reviews: Some(RequiredPullRequestReviews {
///         dismiss_stale_reviews: true,
///         require_code_owner_reviews: true,
///         required_approving_review_count: 2,
///     }),
///     restrictions: None,
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchProtectionRequest {
    /// Status checks that must pass before merging
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Whether the rules also apply to repository administrators
    pub enforce_admins: Option<bool>,
    /// Review requirements for pull requests targeting the branch
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    /// Users and teams allowed to push to the branch
    pub restrictions: Option<BranchRestrictions>,
}

/// Required status checks section of a protection rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequiredStatusChecks {
    /// Require branches to be up to date before merging
    pub strict: bool,
    /// Names of the checks that must pass
    pub contexts: Vec<String>,
}

/// Pull request review section of a protection rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequiredPullRequestReviews {
    /// Whether stale reviews are dismissed when new commits are pushed
    pub dismiss_stale_reviews: bool,
    /// Whether code owner reviews are required
    pub require_code_owner_reviews: bool,
    /// Required number of approving reviews before merging
    pub required_approving_review_count: u32,
}

/// Push restrictions section of a protection rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchRestrictions {
    /// Logins of users allowed to push
    pub users: Vec<String>,
    /// Slugs of teams allowed to push
    pub teams: Vec<String>,
}
