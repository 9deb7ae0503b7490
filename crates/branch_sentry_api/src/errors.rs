//! Error handling and HTTP error conversion
//!
//! This module defines how failed webhook deliveries are translated to HTTP error
//! responses. Every error body has the same shape:
//!
//! ```json
//! { "error": { "code": "AlreadyProtected", "message": "branch protection already added for repo 'foo'" } }
//! ```

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use branch_sentry_core::{DispatchOutcome, RepositoryIdentity};
use github_client::Issue;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, type varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A dispatch outcome that is answered with a success status.
#[derive(Debug, Clone)]
pub enum Delivered {
    Protected {
        repository: RepositoryIdentity,
        branches: Vec<String>,
        issues: Vec<Issue>,
    },
    Ignored(String),
}

/// Errors returned from API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("signature validation failed")]
    InvalidSignature { reason: String },

    #[error("could not parse webhook")]
    MalformedEvent { reason: String },

    #[error("branch not found: {reason}")]
    BranchNotFound { reason: String },

    #[error("branch protection already added for repo '{repository}'")]
    AlreadyProtected { repository: String },

    #[error("could not add branch protection: {reason}")]
    ProtectionFailed { reason: String },

    #[error("could not create issue in repo")]
    IssueCreationFailed { reason: String },

    #[error("payload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("could not read request body")]
    InvalidBody { reason: String },

    #[error("no route for {path}")]
    NotFound { path: String },

    #[error("method {method} is not allowed")]
    MethodNotAllowed { method: String },

    #[error("an internal error occurred")]
    Internal { reason: String },
}

impl ApiError {
    /// Splits a dispatch outcome into a success to answer or an error to report.
    pub fn from_outcome(outcome: DispatchOutcome) -> Result<Delivered, ApiError> {
        match outcome {
            DispatchOutcome::Protected {
                repository,
                branches,
                issues,
            } => Ok(Delivered::Protected {
                repository,
                branches,
                issues,
            }),
            DispatchOutcome::Ignored(reason) => Ok(Delivered::Ignored(reason)),
            DispatchOutcome::InvalidSignature(e) => Err(ApiError::InvalidSignature {
                reason: e.to_string(),
            }),
            DispatchOutcome::MalformedEvent(reason) => Err(ApiError::MalformedEvent { reason }),
            DispatchOutcome::BranchResolutionFailed(e) => Err(ApiError::BranchNotFound {
                reason: e.to_string(),
            }),
            DispatchOutcome::AlreadyProtected { repository } => Err(ApiError::AlreadyProtected {
                repository: repository.name().to_string(),
            }),
            DispatchOutcome::ProtectionFailed { reason, .. } => {
                Err(ApiError::ProtectionFailed { reason })
            }
            DispatchOutcome::Undocumented { reason, .. } => {
                Err(ApiError::IssueCreationFailed { reason })
            }
        }
    }

    /// Converts a failure to buffer the request body.
    pub fn from_body_rejection(rejection: BytesRejection, limit: usize) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::InvalidBody {
                reason: rejection.body_text(),
            }
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidSignature { .. }
            | ApiError::MalformedEvent { .. }
            | ApiError::BranchNotFound { .. }
            | ApiError::AlreadyProtected { .. }
            | ApiError::ProtectionFailed { .. }
            | ApiError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::IssueCreationFailed { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidSignature { .. } => "InvalidSignature",
            ApiError::MalformedEvent { .. } => "MalformedEvent",
            ApiError::BranchNotFound { .. } => "BranchNotFound",
            ApiError::AlreadyProtected { .. } => "AlreadyProtected",
            ApiError::ProtectionFailed { .. } => "ProtectionFailed",
            ApiError::IssueCreationFailed { .. } => "IssueCreationFailed",
            ApiError::PayloadTooLarge { .. } => "PayloadTooLarge",
            ApiError::InvalidBody { .. } => "InvalidBody",
            ApiError::NotFound { .. } => "NotFound",
            ApiError::MethodNotAllowed { .. } => "MethodNotAllowed",
            ApiError::Internal { .. } => "InternalError",
        }
    }

    // Signature failures stay vague on the wire; the reason is only logged.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::MalformedEvent { reason }
            | ApiError::IssueCreationFailed { reason }
            | ApiError::InvalidBody { reason } => Some(json!({ "reason": reason })),
            _ => None,
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            ApiError::InvalidSignature { reason }
            | ApiError::MalformedEvent { reason }
            | ApiError::IssueCreationFailed { reason }
            | ApiError::InvalidBody { reason }
            | ApiError::Internal { reason } => Some(reason),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error(&self, status);

        let error_response = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ApiError, status: StatusCode) {
    let reason = error.reason().unwrap_or("-");
    match status {
        StatusCode::INTERNAL_SERVER_ERROR => {
            tracing::error!(
                code = error.code(),
                reason,
                "API error: {} - {}",
                status,
                error
            );
        }
        _ => {
            tracing::warn!(
                code = error.code(),
                reason,
                "API error: {} - {}",
                status,
                error
            );
        }
    }
}
