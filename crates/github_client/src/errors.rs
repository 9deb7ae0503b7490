//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Callers further up the stack use the variant to decide
//! whether a failure is worth retrying (for example a branch that is not visible yet) or
//! must be surfaced as-is.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_branch("my-org", "my-repo", "main").await {
///     Ok(branch) => println!("Branch {} protected: {}", branch.name, branch.protected),
///     Err(Error::NotFound) => eprintln!("Branch is not visible yet"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GitHub answered the request with an error status.
    ///
    /// The message is the one GitHub put in the response body, for example
    /// `"Branch not protected"` or `"Validation Failed"`.
    #[error("GitHub API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - The access token is invalid or expired
    /// - The client could not be built from the supplied settings
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GitHub API returned a response in an unexpected format.
    ///
    /// Also reported for error statuses whose body is not GitHub's JSON error, such as
    /// the HTML page served with a 502 or 503 while GitHub is degraded.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    ///
    /// GitHub answers 404 both for resources that do not exist and for resources
    /// the token cannot see. Directly after a repository is created its branches
    /// may report 404 for a short while.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The request never produced a GitHub response (connection, TLS, URI problems).
    #[error("Failed to communicate with GitHub: {0}")]
    Transport(String),
}

impl Error {
    /// Returns `true` if the error may go away when the same request is sent again later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::NotFound
            | Error::RateLimitExceeded
            | Error::InvalidResponse
            | Error::Transport(_) => true,
            Error::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
