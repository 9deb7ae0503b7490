//! Process-wide configuration.
//!
//! Configuration is read once at start-up from an optional TOML file and the process
//! environment, validated, and then shared read-only as `Arc<Configuration>`.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! organization = "my-org"
//! branch_names = ["main", "master"]
//! selection = "listed"
//!
//! [protection]
//! contexts = ["ci", "lint"]
//! strict = true
//! required_approving_review_count = 1
//! enforce_admins = false
//!
//! [retry]
//! base_interval_ms = 100
//! jitter = 0.05
//! max_attempts = 10
//! max_interval_ms = 5000
//!
//! [notification]
//! title = "AUTO: Added branch protection"
//! mentions = ["octocat"]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::retry::RetryPolicy;

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "branch_sentry.toml";

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "BRANCH_SENTRY_CONFIG";

/// Environment variable overriding the organization from the file.
pub const ORGANIZATION_ENV: &str = "GITHUB_ORGANIZATION";

/// Environment variable holding the webhook shared secret.
pub const WEBHOOK_SECRET_ENV: &str = "GITHUB_WEBHOOK_SECRET";

/// Title of the issue filed after protection was applied.
pub const DEFAULT_ISSUE_TITLE: &str = "AUTO: Added branch protection";

/// Branch names protected when the configuration does not list any.
pub fn default_branch_names() -> Vec<String> {
    ["main", "master", "dev", "development"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// How the branches to protect are chosen for a new repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSelection {
    /// List every branch and protect those whose name is configured.
    #[default]
    Listed,
    /// Protect only the repository's default branch, if its name is configured.
    DefaultBranch,
}

/// The protection rule applied to every matching branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtectionTemplate {
    /// Status check contexts that must pass before merging.
    pub contexts: Vec<String>,
    /// Require branches to be up to date before merging.
    pub strict: bool,
    pub required_approving_review_count: u32,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub enforce_admins: bool,
    /// Restrict who can push. With empty user and team lists only admins can push.
    pub restrict_pushes: bool,
    pub restriction_users: Vec<String>,
    pub restriction_teams: Vec<String>,
}

impl Default for ProtectionTemplate {
    fn default() -> Self {
        Self {
            contexts: vec!["ci".to_string(), "lint".to_string(), "scan".to_string()],
            strict: true,
            required_approving_review_count: 1,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
            enforce_admins: false,
            restrict_pushes: true,
            restriction_users: Vec::new(),
            restriction_teams: Vec::new(),
        }
    }
}

/// Backoff settings for waiting on a freshly created repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub base_interval_ms: u64,
    /// Fraction of each delay used as random spread, between 0 and 1.
    pub jitter: f64,
    pub max_attempts: u32,
    pub max_interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::DEFAULT;
        Self {
            base_interval_ms: policy.base().as_millis() as u64,
            jitter: policy.jitter(),
            max_attempts: policy.max_attempts(),
            max_interval_ms: policy.max_interval().as_millis() as u64,
        }
    }
}

impl RetrySettings {
    fn to_policy(&self) -> ConfigurationResult<RetryPolicy> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "retry.jitter".to_string(),
                reason: format!("must be between 0 and 1, got {}", self.jitter),
            });
        }

        if self.max_interval_ms < self.base_interval_ms {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "retry.max_interval_ms".to_string(),
                reason: "must not be smaller than retry.base_interval_ms".to_string(),
            });
        }

        let policy = RetryPolicy::new(
            Duration::from_millis(self.base_interval_ms),
            self.jitter,
            self.max_attempts,
        );
        Ok(policy.with_max_interval(Duration::from_millis(self.max_interval_ms)))
    }
}

/// Settings for the issue filed after protection was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationSettings {
    /// When false no issue is filed and the request still counts as a success.
    pub enabled: bool,
    pub title: String,
    /// GitHub handles mentioned at the top of the issue body, with or without `@`.
    pub mentions: Vec<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_ISSUE_TITLE.to_string(),
            mentions: Vec::new(),
        }
    }
}

/// The on-disk form of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigurationFile {
    pub organization: Option<String>,
    pub branch_names: Vec<String>,
    pub selection: BranchSelection,
    pub protection: ProtectionTemplate,
    pub retry: RetrySettings,
    pub notification: NotificationSettings,
}

impl Default for ConfigurationFile {
    fn default() -> Self {
        Self {
            organization: None,
            branch_names: default_branch_names(),
            selection: BranchSelection::default(),
            protection: ProtectionTemplate::default(),
            retry: RetrySettings::default(),
            notification: NotificationSettings::default(),
        }
    }
}

impl ConfigurationFile {
    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::FileAccessError` if the file cannot be read and
    /// `ConfigurationError::ParseError` if it is not valid configuration TOML.
    pub fn load(path: &Path) -> ConfigurationResult<Self> {
        debug!("Loading configuration from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::FileAccessError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigurationResult<Self> {
        toml::from_str(content).map_err(|e| ConfigurationError::ParseError {
            reason: e.to_string(),
        })
    }
}

/// Validated, immutable configuration of the service.
///
/// The webhook secret is held as a [`SecretString`] and is redacted from `Debug`
/// output.
#[derive(Debug)]
pub struct Configuration {
    organization: String,
    branch_names: Vec<String>,
    selection: BranchSelection,
    protection: ProtectionTemplate,
    retry: RetryPolicy,
    notification: NotificationSettings,
    webhook_secret: SecretString,
}

impl Configuration {
    /// Creates a configuration with default policy settings.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use branch_sentry_core::Configuration;
    ///
    /// let config = Configuration::new("my-org", "s3cret");
    ///
    /// assert_eq!(config.organization(), "my-org");
    /// assert_eq!(config.branch_names(), ["main", "master", "dev", "development"]);
    /// ```
    pub fn new(organization: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        let defaults = ConfigurationFile::default();
        Self {
            organization: organization.into(),
            branch_names: defaults.branch_names,
            selection: defaults.selection,
            protection: defaults.protection,
            retry: RetryPolicy::DEFAULT,
            notification: defaults.notification,
            webhook_secret: SecretString::from(webhook_secret.into()),
        }
    }

    /// Replaces the accepted branch names. Duplicates are dropped, order is kept.
    pub fn with_branch_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branch_names = dedup_names(names.into_iter().map(Into::into));
        self
    }

    pub fn with_selection(mut self, selection: BranchSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_protection(mut self, protection: ProtectionTemplate) -> Self {
        self.protection = protection;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_notification(mut self, notification: NotificationSettings) -> Self {
        self.notification = notification;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// The file named by `BRANCH_SENTRY_CONFIG` is read if set; otherwise
    /// `branch_sentry.toml` is read when it exists. `GITHUB_ORGANIZATION` overrides the
    /// organization from the file and `GITHUB_WEBHOOK_SECRET` is required.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` when the file is unreadable or invalid, or when
    /// a required value is missing.
    pub fn from_env() -> ConfigurationResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> ConfigurationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup(CONFIG_PATH_ENV) {
            Some(path) => ConfigurationFile::load(Path::new(&path))?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if path.exists() {
                    ConfigurationFile::load(&path)?
                } else {
                    debug!("No configuration file found, using defaults");
                    ConfigurationFile::default()
                }
            }
        };

        Self::from_parts(file, lookup(ORGANIZATION_ENV), lookup(WEBHOOK_SECRET_ENV))
    }

    /// Validates file settings combined with the environment overrides.
    ///
    /// # Errors
    ///
    /// - `RequiredConfigMissing` when no organization or webhook secret is available
    /// - `InvalidConfiguration` for an empty secret, an empty branch list, bad retry
    ///   settings, or an empty issue title
    pub fn from_parts(
        file: ConfigurationFile,
        organization: Option<String>,
        webhook_secret: Option<String>,
    ) -> ConfigurationResult<Self> {
        let organization = organization
            .filter(|o| !o.trim().is_empty())
            .or(file.organization)
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .ok_or_else(|| ConfigurationError::RequiredConfigMissing {
                key: ORGANIZATION_ENV.to_string(),
            })?;

        let Some(webhook_secret) = webhook_secret else {
            return Err(ConfigurationError::RequiredConfigMissing {
                key: WEBHOOK_SECRET_ENV.to_string(),
            });
        };
        if webhook_secret.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: WEBHOOK_SECRET_ENV.to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let names = file.branch_names.into_iter().map(|n| n.trim().to_string());
        let branch_names = dedup_names(names.filter(|n| !n.is_empty()));
        if branch_names.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "branch_names".to_string(),
                reason: "must name at least one branch".to_string(),
            });
        }

        if file.notification.enabled && file.notification.title.trim().is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "notification.title".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let retry = file.retry.to_policy()?;

        info!(
            organization = organization.as_str(),
            branch_names = ?branch_names,
            selection = ?file.selection,
            max_attempts = retry.max_attempts(),
            notifications = file.notification.enabled,
            "Configuration loaded"
        );

        Ok(Self {
            organization,
            branch_names,
            selection: file.selection,
            protection: file.protection,
            retry,
            notification: file.notification,
            webhook_secret: SecretString::from(webhook_secret),
        })
    }

    /// The organization whose repositories are protected.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Accepted branch names, in configured order and without duplicates.
    pub fn branch_names(&self) -> &[String] {
        &self.branch_names
    }

    pub fn selection(&self) -> BranchSelection {
        self.selection
    }

    pub fn protection(&self) -> &ProtectionTemplate {
        &self.protection
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn notification(&self) -> &NotificationSettings {
        &self.notification
    }

    pub fn webhook_secret(&self) -> &SecretString {
        &self.webhook_secret
    }

    /// The secret as bytes, for HMAC keys.
    pub(crate) fn webhook_secret_bytes(&self) -> &[u8] {
        self.webhook_secret.expose_secret().as_bytes()
    }
}

fn dedup_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
