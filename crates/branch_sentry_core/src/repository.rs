//! Identity of the repository a webhook event is about.

use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Owner and name of a repository.
///
/// # Examples
///
/// ```rust
/// use branch_sentry_core::RepositoryIdentity;
///
/// let repo = RepositoryIdentity::new("my-org", "foo");
///
/// assert_eq!(repo.to_string(), "my-org/foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Login of the account that owns the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name of the repository, without the owner.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when the repository belongs to `organization`.
    ///
    /// GitHub logins are case-insensitive.
    pub fn belongs_to(&self, organization: &str) -> bool {
        self.owner.eq_ignore_ascii_case(organization)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
