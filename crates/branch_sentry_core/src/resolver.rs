//! Branch resolution for freshly created repositories.
//!
//! GitHub sends the `repository.created` event before the repository's branches are
//! reliably visible through the API. The [`BranchResolver`] polls under a
//! [`RetryPolicy`] until the branches show up or the retry budget is spent.
//!
//! Every call builds its own backoff sequence. Waiting uses `tokio::time::sleep`, so
//! only the task handling the current webhook is suspended.

use std::future::Future;
use std::sync::Arc;

use github_client::{Branch, Error, RepositoryClient};
use tracing::{debug, info, instrument, warn};

use crate::configuration::BranchSelection;
use crate::errors::ResolveError;
use crate::metrics::WebhookMetrics;
use crate::repository::RepositoryIdentity;
use crate::retry::RetryPolicy;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Locates the branches of a repository, tolerating eventual consistency.
pub struct BranchResolver {
    client: Arc<dyn RepositoryClient>,
    policy: RetryPolicy,
    metrics: Arc<dyn WebhookMetrics>,
}

impl BranchResolver {
    pub fn new(
        client: Arc<dyn RepositoryClient>,
        policy: RetryPolicy,
        metrics: Arc<dyn WebhookMetrics>,
    ) -> Self {
        Self {
            client,
            policy,
            metrics,
        }
    }

    /// Resolves the branches to protect according to `selection`.
    ///
    /// # Arguments
    ///
    /// * `repo` - The repository from the event
    /// * `default_branch_hint` - Default branch named in the event, if any
    /// * `selection` - How branches are chosen
    /// * `names` - Accepted branch names, in preference order
    pub async fn resolve(
        &self,
        repo: &RepositoryIdentity,
        default_branch_hint: Option<&str>,
        selection: BranchSelection,
        names: &[String],
    ) -> Result<Vec<Branch>, ResolveError> {
        match selection {
            BranchSelection::Listed => self.resolve_matching_branches(repo, names).await,
            BranchSelection::DefaultBranch => self
                .resolve_default_branch(repo, default_branch_hint, names)
                .await
                .map(|branch| vec![branch]),
        }
    }

    /// Fetches a single branch, retrying until it exists.
    ///
    /// The first lookup happens immediately and one more follows each delay of the
    /// backoff sequence, so at most `max_attempts + 1` lookups are made.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::BranchNotFound` once the backoff sequence is exhausted,
    /// or straight away when GitHub reports an error that will not go away by
    /// waiting (for example bad credentials).
    #[instrument(skip(self), fields(owner = %repo.owner(), repo = %repo.name()))]
    pub async fn resolve_branch(
        &self,
        repo: &RepositoryIdentity,
        branch: &str,
    ) -> Result<Branch, ResolveError> {
        let client = self.client.as_ref();
        let lookup = move || async move {
            let found = client.get_branch(repo.owner(), repo.name(), branch).await?;
            Ok::<_, Error>((!found.name.is_empty()).then_some(found))
        };

        self.poll(repo, branch, lookup)
            .await
            .map_err(|attempts| ResolveError::BranchNotFound {
                branch: branch.to_string(),
                attempts,
            })
    }

    /// Lists the branches of a repository and keeps those whose name is in `names`.
    ///
    /// An empty listing counts as "not ready yet" and is retried. The result follows
    /// the order of `names` and holds each name at most once.
    ///
    /// # Errors
    ///
    /// - `BranchListUnavailable` if no non-empty listing was obtained
    /// - `NoMatchingBranches` if the listing has none of the accepted names; this is
    ///   not retried
    #[instrument(skip(self, names), fields(owner = %repo.owner(), repo = %repo.name()))]
    pub async fn resolve_matching_branches(
        &self,
        repo: &RepositoryIdentity,
        names: &[String],
    ) -> Result<Vec<Branch>, ResolveError> {
        let client = self.client.as_ref();
        let listing = move || async move {
            let branches = client.list_branches(repo.owner(), repo.name()).await?;
            Ok::<_, Error>((!branches.is_empty()).then_some(branches))
        };

        let listed = self
            .poll(repo, "*", listing)
            .await
            .map_err(|attempts| ResolveError::BranchListUnavailable { attempts })?;

        let matching = intersect(&listed, names);
        if matching.is_empty() {
            warn!(
                listed = ?listed.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
                requested = ?names,
                "None of the accepted branch names exist in the repository"
            );
            return Err(ResolveError::NoMatchingBranches {
                requested: names.to_vec(),
            });
        }

        info!(
            branches = ?matching.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            "Resolved branches to protect"
        );
        Ok(matching)
    }

    /// Resolves the repository's default branch, if its name is accepted.
    ///
    /// The hint from the event is used when present; otherwise the repository is
    /// read once to learn its default branch.
    ///
    /// # Errors
    ///
    /// - `RepositoryUnavailable` if the repository could not be read
    /// - `NoMatchingBranches` if there is no default branch or its name is not accepted
    /// - `BranchNotFound` if the default branch never became visible
    #[instrument(skip(self, names), fields(owner = %repo.owner(), repo = %repo.name()))]
    pub async fn resolve_default_branch(
        &self,
        repo: &RepositoryIdentity,
        hint: Option<&str>,
        names: &[String],
    ) -> Result<Branch, ResolveError> {
        let default_branch = match hint {
            Some(name) => Some(name.to_string()),
            None => self
                .client
                .get_repository(repo.owner(), repo.name())
                .await
                .map_err(|e| ResolveError::RepositoryUnavailable {
                    reason: e.to_string(),
                })?
                .default_branch()
                .map(str::to_string),
        };

        let Some(default_branch) = default_branch.filter(|name| names.contains(name)) else {
            warn!(requested = ?names, "Default branch is missing or not an accepted name");
            return Err(ResolveError::NoMatchingBranches {
                requested: names.to_vec(),
            });
        };

        self.resolve_branch(repo, &default_branch).await
    }

    /// Runs `attempt` until it yields a value, sleeping between tries.
    ///
    /// `Ok(None)` and transient errors mean "not ready yet". Returns the number of
    /// attempts made when giving up.
    async fn poll<T, F, Fut>(
        &self,
        repo: &RepositoryIdentity,
        target: &str,
        mut attempt: F,
    ) -> Result<T, u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, Error>>,
    {
        let mut backoff = self.policy.backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            self.metrics.record_resolution_attempt();

            let reason = match attempt().await {
                Ok(Some(value)) => {
                    debug!(
                        owner = repo.owner(),
                        repo = repo.name(),
                        branch = target,
                        attempt = attempts,
                        "Branch lookup succeeded"
                    );
                    return Ok(value);
                }
                Ok(None) => "nothing reported yet".to_string(),
                Err(e) if e.is_transient() => e.to_string(),
                Err(e) => {
                    warn!(
                        owner = repo.owner(),
                        repo = repo.name(),
                        branch = target,
                        attempt = attempts,
                        error = %e,
                        "Branch lookup failed and will not be retried"
                    );
                    return Err(attempts);
                }
            };

            let Some(delay) = backoff.next() else {
                warn!(
                    owner = repo.owner(),
                    repo = repo.name(),
                    branch = target,
                    attempt = attempts,
                    reason = reason.as_str(),
                    "Giving up waiting for branch"
                );
                return Err(attempts);
            };

            debug!(
                owner = repo.owner(),
                repo = repo.name(),
                branch = target,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                reason = reason.as_str(),
                "Branch not available yet, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Exact-name intersection of `listed` with `names`, in the order of `names`.
fn intersect(listed: &[Branch], names: &[String]) -> Vec<Branch> {
    let mut matching: Vec<Branch> = Vec::new();
    for name in names {
        if matching.iter().any(|b| &b.name == name) {
            continue;
        }
        if let Some(branch) = listed.iter().find(|b| &b.name == name) {
            matching.push(branch.clone());
        }
    }
    matching
}
