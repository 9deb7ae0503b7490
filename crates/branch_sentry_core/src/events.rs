//! Webhook event envelope.
//!
//! Only the parts of a delivery the pipeline acts on are modelled. Every other event
//! type is kept as [`WebhookEvent::Unrecognized`] so callers can report what they
//! ignored.

use serde::de::IgnoredAny;
use serde::Deserialize;
use thiserror::Error;

use crate::repository::RepositoryIdentity;

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

/// Header naming the event type of a delivery.
pub const EVENT_TYPE_HEADER: &str = "X-GitHub-Event";

/// Header carrying the unique id of a delivery.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Repository(RepositoryEvent),
    Ping(PingEvent),
    Unrecognized { event_type: String },
}

/// Errors for deliveries that cannot be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    #[error("the delivery has no event type header")]
    MissingEventType,

    #[error("invalid '{event_type}' payload: {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

impl WebhookEvent {
    /// Parses a delivery from its event type header and raw body.
    ///
    /// # Errors
    ///
    /// Returns `EventParseError::MissingEventType` when the header is absent or empty,
    /// and `EventParseError::InvalidPayload` when the body is not JSON or a repository
    /// event lacks required fields.
    pub fn parse(event_type: Option<&str>, body: &[u8]) -> Result<Self, EventParseError> {
        let event_type = event_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(EventParseError::MissingEventType)?;

        let invalid = |e: serde_json::Error| EventParseError::InvalidPayload {
            event_type: event_type.to_string(),
            reason: e.to_string(),
        };

        match event_type {
            "repository" => serde_json::from_slice(body)
                .map(WebhookEvent::Repository)
                .map_err(invalid),
            "ping" => serde_json::from_slice(body)
                .map(WebhookEvent::Ping)
                .map_err(invalid),
            other => {
                serde_json::from_slice::<IgnoredAny>(body).map_err(invalid)?;
                Ok(WebhookEvent::Unrecognized {
                    event_type: other.to_string(),
                })
            }
        }
    }
}

/// A `repository` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryEvent {
    pub action: RepositoryAction,
    pub repository: EventRepository,
}

/// The action of a `repository` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RepositoryAction {
    Created,
    /// Any other action, e.g. `deleted` or `archived`.
    Other(String),
}

impl From<String> for RepositoryAction {
    fn from(action: String) -> Self {
        if action == "created" {
            RepositoryAction::Created
        } else {
            RepositoryAction::Other(action)
        }
    }
}

impl RepositoryAction {
    pub fn as_str(&self) -> &str {
        match self {
            RepositoryAction::Created => "created",
            RepositoryAction::Other(action) => action,
        }
    }
}

/// The repository section of an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRepository {
    pub name: String,
    pub owner: EventAccount,
    /// Missing for some legacy payloads.
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl EventRepository {
    pub fn identity(&self) -> RepositoryIdentity {
        RepositoryIdentity::new(&self.owner.login, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventAccount {
    pub login: String,
}

/// The `ping` event GitHub sends when a webhook is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: Option<String>,
    #[serde(default)]
    pub hook_id: Option<u64>,
}
