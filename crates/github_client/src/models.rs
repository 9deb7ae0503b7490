//! # Models
//!
//! This module contains the data models exchanged with the GitHub REST API.
//!
//! The models only carry the fields the branch protection pipeline reads; everything
//! else GitHub sends is ignored during deserialization.

use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Represents a GitHub account (user or organization).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    /// The login name of the account
    pub login: String,
}

/// Represents a GitHub repository.
///
/// # Examples
///
/// ```rust
/// use github_client::models::Repository;
///
/// let repo = Repository::new("my-repo", "my-org", "main");
///
/// assert_eq!(repo.full_name(), "my-org/my-repo");
/// assert_eq!(repo.default_branch(), Some("main"));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repository {
    /// The name of the repository
    name: String,
    /// The account that owns the repository
    owner: Account,
    /// The branch GitHub treats as the default one. Missing for empty repositories.
    default_branch: Option<String>,
    /// Whether the repository is private
    #[serde(default)]
    private: bool,
}

impl Repository {
    /// Creates a new public repository description.
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        default_branch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: Account {
                login: owner.into(),
            },
            default_branch: Some(default_branch.into()),
            private: false,
        }
    }

    /// Returns the name of the repository.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the login of the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner.login
    }

    /// Returns the `owner/name` form of the repository name.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }

    /// Returns the default branch, if GitHub reported one.
    pub fn default_branch(&self) -> Option<&str> {
        self.default_branch.as_deref()
    }

    /// Returns whether the repository is private.
    pub fn is_private(&self) -> bool {
        self.private
    }
}

/// A branch as reported by the `branches` endpoints.
///
/// GitHub only reports whether *some* protection exists on the branch, not what it is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Branch {
    /// The name of the branch
    pub name: String,
    /// Whether a branch protection rule is attached to the branch
    #[serde(default)]
    pub protected: bool,
}

/// Request body for creating an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
}

/// An issue as returned by GitHub after creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Issue {
    /// The repository-scoped issue number
    pub number: u64,
    /// The issue title
    pub title: String,
    /// Link to the issue in the GitHub web UI
    pub html_url: Url,
}
