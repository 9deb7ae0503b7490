//! HTTP response type definitions
//!
//! Successful webhook deliveries and the health endpoint answer with the types in
//! this module. Error responses live in [`crate::errors`].

use branch_sentry_core::RepositoryIdentity;
use github_client::Issue;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// HTTP response for a delivery that added branch protection.
///
/// # Example
///
/// ```json
/// {
///   "message": "successfully added branch protection for repo foo",
///   "repository": "my-org/foo",
///   "branches": ["main"],
///   "issues": [{ "number": 1, "url": "https://github.com/my-org/foo/issues/1" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionResponse {
    /// Human-readable summary naming the repository
    pub message: String,

    /// Full `owner/name` of the repository
    pub repository: String,

    /// Branches that received protection
    pub branches: Vec<String>,

    /// Tracking issues filed for the protected branches
    pub issues: Vec<IssueInfo>,
}

impl ProtectionResponse {
    pub fn new(repository: &RepositoryIdentity, branches: Vec<String>, issues: &[Issue]) -> Self {
        Self {
            message: format!(
                "successfully added branch protection for repo {}",
                repository.name()
            ),
            repository: repository.to_string(),
            branches,
            issues: issues.iter().map(IssueInfo::from).collect(),
        }
    }
}

/// A tracking issue as reported to the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueInfo {
    pub number: u64,
    pub url: String,
}

impl From<&Issue> for IssueInfo {
    fn from(issue: &Issue) -> Self {
        Self {
            number: issue.number,
            url: issue.html_url.to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Service status: "healthy" or "unhealthy"
    pub status: String,

    /// Service version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,
}
