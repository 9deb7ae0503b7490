//! Error types for the branch protection pipeline.
//!
//! Each pipeline stage has its own error enum. The dispatcher folds them into a
//! [`DispatchOutcome`](crate::dispatcher::DispatchOutcome); none of them escape to the
//! HTTP layer directly.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Failures while locating the branches that should be protected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The branch never became visible within the retry budget.
    #[error("branch '{branch}' was not found after {attempts} attempts")]
    BranchNotFound { branch: String, attempts: u32 },

    /// The repository has branches, but none of them carry an acceptable name.
    #[error("none of the branches [{}] exist in the repository", requested.join(", "))]
    NoMatchingBranches { requested: Vec<String> },

    /// Listing the branches of the repository kept failing or returned nothing.
    #[error("the branches of the repository could not be listed after {attempts} attempts")]
    BranchListUnavailable { attempts: u32 },

    /// The repository itself could not be read to find its default branch.
    #[error("the repository could not be read: {reason}")]
    RepositoryUnavailable { reason: String },
}

/// Failures while recording an applied protection as an issue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("could not create issue in repository '{repository}' for branch '{branch}': {reason}")]
    IssueCreation {
        repository: String,
        branch: String,
        reason: String,
    },
}

/// Configuration loading and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Failed to access configuration file: {path} - {reason}")]
    FileAccessError { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    ParseError { reason: String },

    #[error("Required configuration missing: {key}")]
    RequiredConfigMissing { key: String },

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },
}

/// Result type alias for configuration operations.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
