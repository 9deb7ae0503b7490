//! HTTP response models
//!
//! These types exist only in the HTTP layer. They are built from dispatch outcomes
//! and never flow back into `branch_sentry_core`.

pub mod response;

pub use response::{HealthCheckResponse, IssueInfo, ProtectionResponse};
