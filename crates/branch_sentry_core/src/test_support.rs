//! In-memory `RepositoryClient` used by the unit tests of this crate.

use async_trait::async_trait;
use github_client::{
    Branch, BranchProtectionRequest, Error, Issue, IssueRequest, Repository, RepositoryClient,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A scripted failure for one remote operation.
#[derive(Debug, Clone)]
pub enum Failure {
    NotFound,
    /// A response body that is not GitHub's JSON, such as an HTML 502 page.
    InvalidResponse,
    Api { status: u16, message: String },
}

impl Failure {
    pub fn api(status: u16, message: &str) -> Self {
        Failure::Api {
            status,
            message: message.to_string(),
        }
    }

    fn to_error(&self) -> Error {
        match self {
            Failure::NotFound => Error::NotFound,
            Failure::InvalidResponse => Error::InvalidResponse,
            Failure::Api { status, message } => Error::ApiError {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

/// Repository state plus call counters.
///
/// Lookups (`get_branch`, `list_branches`) report nothing until `visible_after`
/// lookups of that kind have been made, imitating a repository that was just created.
#[derive(Debug, Default)]
pub struct MockRepositoryClient {
    branches: Vec<Branch>,
    default_branch: Option<String>,
    visible_after: u32,
    lookup_failure: Option<Failure>,
    lookup_failure_limit: Option<u32>,
    repository_failure: Option<Failure>,
    protection_failures: HashMap<String, Failure>,
    issue_failure: Option<Failure>,

    get_repository_calls: AtomicU32,
    get_branch_calls: AtomicU32,
    list_branches_calls: AtomicU32,
    protection_writes: Mutex<Vec<(String, BranchProtectionRequest)>>,
    issues: Mutex<Vec<IssueRequest>>,
}

impl MockRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, name: &str, protected: bool) -> Self {
        self.branches.push(Branch {
            name: name.to_string(),
            protected,
        });
        self
    }

    pub fn with_default_branch(mut self, name: &str) -> Self {
        self.default_branch = Some(name.to_string());
        self
    }

    pub fn visible_after(mut self, lookups: u32) -> Self {
        self.visible_after = lookups;
        self
    }

    pub fn failing_lookups(mut self, failure: Failure) -> Self {
        self.lookup_failure = Some(failure);
        self
    }

    /// Fails only the first `count` lookups of each kind.
    pub fn failing_first_lookups(mut self, count: u32, failure: Failure) -> Self {
        self.lookup_failure = Some(failure);
        self.lookup_failure_limit = Some(count);
        self
    }

    pub fn failing_repository(mut self, failure: Failure) -> Self {
        self.repository_failure = Some(failure);
        self
    }

    pub fn failing_protection(mut self, branch: &str, failure: Failure) -> Self {
        self.protection_failures.insert(branch.to_string(), failure);
        self
    }

    pub fn failing_issues(mut self, failure: Failure) -> Self {
        self.issue_failure = Some(failure);
        self
    }

    pub fn get_repository_calls(&self) -> u32 {
        self.get_repository_calls.load(Ordering::SeqCst)
    }

    pub fn get_branch_calls(&self) -> u32 {
        self.get_branch_calls.load(Ordering::SeqCst)
    }

    pub fn list_branches_calls(&self) -> u32 {
        self.list_branches_calls.load(Ordering::SeqCst)
    }

    pub fn protection_writes(&self) -> Vec<(String, BranchProtectionRequest)> {
        self.protection_writes.lock().unwrap().clone()
    }

    pub fn issues(&self) -> Vec<IssueRequest> {
        self.issues.lock().unwrap().clone()
    }

    fn lookup_failure(&self, call: u32) -> Option<Error> {
        match self.lookup_failure_limit {
            Some(limit) if call > limit => None,
            _ => self.lookup_failure.as_ref().map(Failure::to_error),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.get_repository_calls() as usize
            + self.get_branch_calls() as usize
            + self.list_branches_calls() as usize
            + self.protection_writes().len()
            + self.issues().len()
    }
}

#[async_trait]
impl RepositoryClient for MockRepositoryClient {
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        self.get_repository_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.repository_failure {
            return Err(failure.to_error());
        }

        let mut repository = serde_json::json!({
            "name": repo,
            "owner": { "login": owner },
        });
        if let Some(default_branch) = &self.default_branch {
            repository["default_branch"] = serde_json::json!(default_branch);
        }
        Ok(serde_json::from_value(repository)?)
    }

    async fn list_branches(&self, _owner: &str, _repo: &str) -> Result<Vec<Branch>, Error> {
        let call = self.list_branches_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.lookup_failure(call) {
            return Err(error);
        }
        if call <= self.visible_after {
            return Ok(Vec::new());
        }
        Ok(self.branches.clone())
    }

    async fn get_branch(&self, _owner: &str, _repo: &str, branch: &str) -> Result<Branch, Error> {
        let call = self.get_branch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.lookup_failure(call) {
            return Err(error);
        }
        if call <= self.visible_after {
            return Err(Error::NotFound);
        }
        self.branches
            .iter()
            .find(|b| b.name == branch)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<serde_json::Value, Error> {
        self.protection_writes
            .lock()
            .unwrap()
            .push((branch.to_string(), protection.clone()));

        if let Some(failure) = self.protection_failures.get(branch) {
            return Err(failure.to_error());
        }

        let mut echoed = serde_json::to_value(protection)?;
        echoed["url"] = serde_json::json!(format!(
            "https://api.github.com/repos/{owner}/{repo}/branches/{branch}/protection"
        ));
        Ok(echoed)
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &IssueRequest,
    ) -> Result<Issue, Error> {
        let number = {
            let mut issues = self.issues.lock().unwrap();
            issues.push(issue.clone());
            issues.len() as u64
        };

        if let Some(failure) = &self.issue_failure {
            return Err(failure.to_error());
        }

        Ok(serde_json::from_value(serde_json::json!({
            "number": number,
            "title": issue.title,
            "html_url": format!("https://github.com/{owner}/{repo}/issues/{number}"),
        }))?)
    }
}
