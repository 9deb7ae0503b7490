//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides the small RPC surface the branch protection pipeline needs:
//! reading repositories and branches, writing branch protection and filing issues.
//! The operations are exposed through the [`RepositoryClient`] trait so callers can
//! substitute an in-memory implementation in tests.

use async_trait::async_trait;
use http::StatusCode;
use octocrab::{Octocrab, Result as OctocrabResult};
use tracing::{debug, error, info, instrument};

pub mod errors;
pub use errors::Error;

pub mod branch_protection;
pub use branch_protection::{
    BranchProtectionRequest, BranchRestrictions, RequiredPullRequestReviews, RequiredStatusChecks,
};

pub mod models;
pub use models::{Branch, Issue, IssueRequest, Repository};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Number of branches requested per page when listing branches.
///
/// Newly created repositories rarely have more than a handful of branches, so a
/// single page is read.
const BRANCHES_PER_PAGE: u8 = 100;

/// A client for interacting with the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` wrapping an authenticated `Octocrab` instance.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use github_client::{create_token_client, GitHubClient};
    ///
    /// # fn example() -> Result<(), github_client::Error> {
    /// let octocrab = create_token_client("ghp_example", None)?;
    /// let client = GitHubClient::new(octocrab);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

/// Trait for the repository operations used to enforce branch protection.
///
/// Every method maps to exactly one GitHub REST call. None of them retry; retry
/// decisions belong to the caller, which knows whether a call is safe to repeat.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetches details for a specific repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the repository does not exist or is not visible.
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error>;

    /// Lists the branches of a repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the repository is not visible yet.
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, Error>;

    /// Fetches a single branch, including whether it is protected.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the branch does not exist (yet).
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error>;

    /// Replaces the protection rule of a branch.
    ///
    /// The write is overwriting on the GitHub side: sending the same request twice
    /// leaves the branch in the same state. Returns the protection GitHub stored,
    /// exactly as GitHub echoed it.
    ///
    /// # Errors
    ///
    /// Returns `Error::ApiError` with GitHub's message if the rule was rejected.
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<serde_json::Value, Error>;

    /// Creates an issue in a repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::ApiError` if GitHub refused to create the issue, for example
    /// because issues are disabled for the repository.
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &IssueRequest,
    ) -> Result<Issue, Error>;
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        let path = format!("/repos/{}/{}", owner, repo);
        let result: OctocrabResult<Repository> = self.client.get(path, None::<&()>).await;
        result.map_err(|e| into_client_error("Failed to get repository", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, Error> {
        let path = format!("/repos/{}/{}/branches", owner, repo);
        let query = [("per_page", BRANCHES_PER_PAGE)];
        let result: OctocrabResult<Vec<Branch>> = self.client.get(path, Some(&query)).await;

        match result {
            Ok(branches) => {
                debug!(count = branches.len(), "Listed repository branches");
                Ok(branches)
            }
            Err(e) => Err(into_client_error("Failed to list branches", e)),
        }
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let path = format!("/repos/{}/{}/branches/{}", owner, repo, branch);
        let result: OctocrabResult<Branch> = self.client.get(path, None::<&()>).await;
        result.map_err(|e| into_client_error("Failed to get branch", e))
    }

    #[instrument(skip(self, protection), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<serde_json::Value, Error> {
        let path = format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch);
        let result: OctocrabResult<serde_json::Value> =
            self.client.put(path, Some(protection)).await;

        match result {
            Ok(applied) => {
                info!("Branch protection updated");
                Ok(applied)
            }
            Err(e) => Err(into_client_error("Failed to update branch protection", e)),
        }
    }

    #[instrument(skip(self, issue), fields(owner = %owner, repo = %repo, title = %issue.title))]
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &IssueRequest,
    ) -> Result<Issue, Error> {
        let path = format!("/repos/{}/{}/issues", owner, repo);
        let result: OctocrabResult<Issue> = self.client.post(path, Some(issue)).await;

        match result {
            Ok(created) => {
                info!(issue_number = created.number, "Issue created");
                Ok(created)
            }
            Err(e) => Err(into_client_error("Failed to create issue", e)),
        }
    }
}

/// Creates an `Octocrab` client that authenticates with a personal or installation
/// access token.
///
/// # Arguments
///
/// * `token` - The access token.
/// * `base_uri` - Optional API root, for GitHub Enterprise Server or tests.
///
/// # Errors
///
/// Returns `Error::AuthError` if the base URI is invalid or the client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder().personal_token(token.to_string());
    if let Some(uri) = base_uri {
        builder = builder.base_uri(uri).map_err(|e| {
            error!(base_uri = uri, error = %e, "Invalid GitHub API base URI");
            Error::AuthError(format!("Invalid GitHub API base URI '{}': {}", uri, e))
        })?;
    }

    builder.build().map_err(|e| {
        error!(error = ?e, "Failed to build Octocrab client with access token");
        Error::AuthError("Failed to build a GitHub client for the access token.".to_string())
    })
}

/// Classifies an octocrab error and logs it.
fn into_client_error(message: &str, e: octocrab::Error) -> Error {
    let classified = classify_octocrab_error(&e);
    match classified {
        // Expected while a new repository settles, the caller decides whether it matters
        Error::NotFound => debug!(error_message = e.to_string(), "{}. Not found.", message),
        _ => log_octocrab_error(message, e),
    }
    classified
}

fn classify_octocrab_error(e: &octocrab::Error) -> Error {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code;
            if status == StatusCode::NOT_FOUND {
                Error::NotFound
            } else if status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::FORBIDDEN
                    && source.message.to_lowercase().contains("rate limit"))
            {
                Error::RateLimitExceeded
            } else {
                Error::ApiError {
                    status: status.as_u16(),
                    message: source.message.clone(),
                }
            }
        }
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => Error::InvalidResponse,
        other => Error::Transport(other.to_string()),
    }
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                status = err.status_code.as_u16(),
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),

        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
