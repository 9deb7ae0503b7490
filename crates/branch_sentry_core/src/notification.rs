//! Records applied protection as an issue in the repository.

use std::sync::Arc;

use github_client::{Issue, IssueRequest, RepositoryClient};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{error, info, instrument};

use crate::applicator::ProtectionDetails;
use crate::configuration::NotificationSettings;
use crate::errors::NotificationError;
use crate::repository::RepositoryIdentity;

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;

/// Files one issue per applied protection.
pub struct NotificationIssuer {
    client: Arc<dyn RepositoryClient>,
    settings: NotificationSettings,
}

impl NotificationIssuer {
    pub fn new(client: Arc<dyn RepositoryClient>, settings: NotificationSettings) -> Self {
        Self { client, settings }
    }

    /// Whether issues are filed at all.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Creates the issue describing `details` with a single call.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::IssueCreation` if the body cannot be rendered or
    /// GitHub refuses the issue. The protection itself stays in place.
    #[instrument(
        skip(self, details),
        fields(owner = %repo.owner(), repo = %repo.name(), branch = %details.branch)
    )]
    pub async fn notify(
        &self,
        repo: &RepositoryIdentity,
        details: &ProtectionDetails,
    ) -> Result<Issue, NotificationError> {
        let issue_error = |reason: String| NotificationError::IssueCreation {
            repository: repo.to_string(),
            branch: details.branch.clone(),
            reason,
        };

        let body = self
            .compose_body(details)
            .map_err(|e| issue_error(e.to_string()))?;
        let request = IssueRequest {
            title: self.settings.title.clone(),
            body,
        };

        match self
            .client
            .create_issue(repo.owner(), repo.name(), &request)
            .await
        {
            Ok(issue) => {
                info!(issue_number = issue.number, "Protection issue created");
                Ok(issue)
            }
            Err(e) => {
                error!(error = %e, "Failed to create protection issue");
                Err(issue_error(e.to_string()))
            }
        }
    }

    /// Renders the issue body: optional mentions, a sentence naming the branch and the
    /// protection as pretty-printed JSON.
    pub fn compose_body(&self, details: &ProtectionDetails) -> Result<String, serde_json::Error> {
        let mut body = String::new();

        if !self.settings.mentions.is_empty() {
            let mentions: Vec<String> = self
                .settings
                .mentions
                .iter()
                .map(|m| format!("@{}", m.trim_start_matches('@')))
                .collect();
            body.push_str(&mentions.join(" "));
            body.push_str("\n\n");
        }

        body.push_str(&format!(
            "Branch protection was automatically added to branch `{}` of this repo with the following details:\n```json\n{}\n```",
            details.branch,
            to_pretty_json(&details.protection)?
        ));
        Ok(body)
    }
}

/// Serializes `value` with four-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
