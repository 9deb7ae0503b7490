use super::*;
use crate::configuration::{BranchSelection, NotificationSettings};
use crate::retry::RetryPolicy;
use crate::signature::{compute_signature, format_signature_header, SignatureAlgorithm};
use crate::test_support::{Failure, MockRepositoryClient};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tracing_test::traced_test;

const SECRET: &str = "webhook-secret";

#[derive(Default)]
struct RecordingMetrics {
    outcomes: Mutex<Vec<String>>,
}

impl WebhookMetrics for RecordingMetrics {
    fn record_webhook(&self, outcome: &str) {
        self.outcomes.lock().unwrap().push(outcome.to_string());
    }
    fn record_resolution_attempt(&self) {}
    fn record_protection_write(&self, _result: &str) {}
}

fn config() -> Configuration {
    Configuration::new("my-org", SECRET)
        .with_retry_policy(RetryPolicy::new(Duration::from_millis(10), 0.0, 3))
}

fn repository_body(action: &str, owner: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "action": action,
        "repository": {
            "name": "foo",
            "full_name": format!("{owner}/foo"),
            "owner": { "login": owner },
            "default_branch": "main"
        }
    }))
    .unwrap()
}

fn created_in(owner: &str) -> Vec<u8> {
    repository_body("created", owner)
}

fn sign(body: &[u8]) -> String {
    let digest = compute_signature(body, SECRET.as_bytes(), SignatureAlgorithm::Sha256).unwrap();
    format_signature_header(&digest, SignatureAlgorithm::Sha256)
}

async fn dispatch_with(
    config: Configuration,
    client: &Arc<MockRepositoryClient>,
    event_type: &str,
    body: &[u8],
    signature: Option<&str>,
) -> DispatchOutcome {
    let dispatcher = Dispatcher::new(
        Arc::new(config),
        client.clone(),
        Arc::new(RecordingMetrics::default()),
    );
    dispatcher
        .dispatch(WebhookRequest {
            event_type: Some(event_type),
            delivery_id: Some("72d3162e-cc78-11e3-81ab-4c9367dc0958"),
            signature_256: signature,
            signature_sha1: None,
            body,
        })
        .await
}

async fn dispatch_signed(
    client: &Arc<MockRepositoryClient>,
    event_type: &str,
    body: &[u8],
) -> DispatchOutcome {
    let signature = sign(body);
    dispatch_with(config(), client, event_type, body, Some(&signature)).await
}

#[tokio::test(start_paused = true)]
async fn test_new_repository_gets_protection_and_issue() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    match outcome {
        DispatchOutcome::Protected {
            repository,
            branches,
            issues,
        } => {
            assert_eq!(repository.name(), "foo");
            assert_eq!(branches, vec!["main"]);
            assert_eq!(issues.len(), 1);
        }
        other => panic!("expected Protected, got {other:?}"),
    }
    assert_eq!(client.protection_writes().len(), 1);
    assert_eq!(client.issues().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_protected_repository_is_left_alone() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", true));

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    assert!(
        matches!(outcome, DispatchOutcome::AlreadyProtected { .. }),
        "{outcome:?}"
    );
    assert!(client.protection_writes().is_empty());
    assert!(client.issues().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_branches_fail_resolution_without_writes() {
    let client = Arc::new(MockRepositoryClient::new());

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    match outcome {
        DispatchOutcome::BranchResolutionFailed(ResolveError::BranchListUnavailable {
            attempts,
        }) => assert_eq!(attempts, 4),
        other => panic!("expected BranchListUnavailable, got {other:?}"),
    }
    assert!(client.protection_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_branch_mode_reports_branch_not_found() {
    let client = Arc::new(MockRepositoryClient::new());
    let body = repository_body("created", "my-org");
    let signature = sign(&body);

    let outcome = dispatch_with(
        config().with_selection(BranchSelection::DefaultBranch),
        &client,
        "repository",
        &body,
        Some(&signature),
    )
    .await;

    match outcome {
        DispatchOutcome::BranchResolutionFailed(ResolveError::BranchNotFound { branch, .. }) => {
            assert_eq!(branch, "main")
        }
        other => panic!("expected BranchNotFound, got {other:?}"),
    }
    assert_eq!(client.get_branch_calls(), 4);
    assert!(client.protection_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_issue_failure_keeps_protection() {
    let client = Arc::new(
        MockRepositoryClient::new()
            .with_branch("main", false)
            .failing_issues(Failure::api(410, "Issues are disabled for this repo")),
    );

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    assert!(
        matches!(outcome, DispatchOutcome::Undocumented { .. }),
        "{outcome:?}"
    );
    assert_eq!(client.protection_writes().len(), 1);
    assert_eq!(client.issues().len(), 1);
}

#[tokio::test]
async fn test_push_event_is_ignored_without_remote_calls() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));
    let body = serde_json::to_vec(&json!({ "ref": "refs/heads/main" })).unwrap();

    let outcome = dispatch_signed(&client, "push", &body).await;

    match outcome {
        DispatchOutcome::Ignored(message) => assert!(message.contains("push")),
        other => panic!("expected Ignored, got {other:?}"),
    }
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_non_create_actions_are_ignored_without_remote_calls() {
    for action in ["deleted", "archived", "renamed", "publicized"] {
        let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));

        let body = repository_body(action, "my-org");
        let outcome = dispatch_signed(&client, "repository", &body).await;

        match outcome {
            DispatchOutcome::Ignored(message) => assert!(message.contains(action)),
            other => panic!("{action}: expected Ignored, got {other:?}"),
        }
        assert_eq!(client.total_calls(), 0, "{action}");
    }
}

#[tokio::test]
async fn test_invalid_signature_stops_before_any_call() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));
    let body = repository_body("created", "my-org");
    let signature = sign(b"some other body");

    let outcome = dispatch_with(config(), &client, "repository", &body, Some(&signature)).await;

    match outcome {
        DispatchOutcome::InvalidSignature(e) => assert_eq!(e, SignatureError::Mismatch),
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_signature_is_invalid() {
    let client = Arc::new(MockRepositoryClient::new());

    let outcome = dispatch_with(
        config(),
        &client,
        "repository",
        &repository_body("created", "my-org"),
        None,
    )
    .await;

    match outcome {
        DispatchOutcome::InvalidSignature(e) => assert_eq!(e, SignatureError::Missing),
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_signed_garbage_is_malformed() {
    let client = Arc::new(MockRepositoryClient::new());

    let outcome = dispatch_signed(&client, "repository", b"{\"action\": ").await;

    assert!(
        matches!(outcome, DispatchOutcome::MalformedEvent(_)),
        "{outcome:?}"
    );
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let client = Arc::new(MockRepositoryClient::new());
    let body = json!({ "zen": "Speak like a human.", "hook_id": 1 });
    let body = serde_json::to_vec(&body).unwrap();

    let outcome = dispatch_signed(&client, "ping", &body).await;

    match outcome {
        DispatchOutcome::Ignored(message) => assert_eq!(message, "pong"),
        other => panic!("expected Ignored, got {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_foreign_organization_is_ignored() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));

    let outcome = dispatch_signed(&client, "repository", &created_in("someone-else")).await;

    assert!(
        matches!(outcome, DispatchOutcome::Ignored(_)),
        "{outcome:?}"
    );
    assert_eq!(client.total_calls(), 0);
    assert!(logs_contain("Delivery ignored"));
    assert!(logs_contain("is not part of organization my-org"));
}

#[tokio::test(start_paused = true)]
async fn test_organization_match_ignores_case() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));

    let outcome = dispatch_signed(&client, "repository", &created_in("My-Org")).await;

    assert!(
        matches!(outcome, DispatchOutcome::Protected { .. }),
        "{outcome:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_all_matching_branches_are_protected() {
    let client = Arc::new(
        MockRepositoryClient::new()
            .with_branch("dev", false)
            .with_branch("main", false)
            .with_branch("feature/x", false),
    );

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    match outcome {
        DispatchOutcome::Protected { branches, issues, .. } => {
            assert_eq!(branches, vec!["main", "dev"]);
            assert_eq!(issues.len(), 2);
        }
        other => panic!("expected Protected, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_wins_but_applied_branches_are_notified() {
    let client = Arc::new(
        MockRepositoryClient::new()
            .with_branch("main", false)
            .with_branch("dev", false)
            .failing_protection("dev", Failure::api(403, "Upgrade to GitHub Pro")),
    );

    let outcome = dispatch_signed(&client, "repository", &created_in("my-org")).await;

    match outcome {
        DispatchOutcome::ProtectionFailed { reason, .. } => {
            assert!(reason.contains("dev"));
            assert!(reason.contains("Upgrade to GitHub Pro"));
        }
        other => panic!("expected ProtectionFailed, got {other:?}"),
    }
    assert_eq!(client.issues().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_notifications_still_succeed() {
    let client = Arc::new(MockRepositoryClient::new().with_branch("main", false));
    let body = repository_body("created", "my-org");
    let signature = sign(&body);
    let config = config().with_notification(NotificationSettings {
        enabled: false,
        ..NotificationSettings::default()
    });

    let outcome = dispatch_with(config, &client, "repository", &body, Some(&signature)).await;

    match outcome {
        DispatchOutcome::Protected { issues, .. } => assert!(issues.is_empty()),
        other => panic!("expected Protected, got {other:?}"),
    }
    assert!(client.issues().is_empty());
}

#[tokio::test]
async fn test_outcome_is_recorded_in_metrics() {
    let client = Arc::new(MockRepositoryClient::new());
    let metrics = Arc::new(RecordingMetrics::default());
    let dispatcher = Dispatcher::new(Arc::new(config()), client.clone(), metrics.clone());
    let body = serde_json::to_vec(&json!({})).unwrap();
    let signature = sign(&body);

    dispatcher
        .dispatch(WebhookRequest {
            event_type: Some("issues"),
            signature_256: Some(&signature),
            body: &body,
            ..WebhookRequest::default()
        })
        .await;

    assert_eq!(*metrics.outcomes.lock().unwrap(), vec!["ignored"]);
}

#[test]
fn test_outcome_labels_are_distinct() {
    let repository = RepositoryIdentity::new("my-org", "foo");
    let outcomes = [
        DispatchOutcome::InvalidSignature(SignatureError::Missing),
        DispatchOutcome::MalformedEvent(String::new()),
        DispatchOutcome::Ignored(String::new()),
        DispatchOutcome::BranchResolutionFailed(ResolveError::BranchNotFound {
            branch: String::new(),
            attempts: 1,
        }),
        DispatchOutcome::AlreadyProtected {
            repository: repository.clone(),
        },
        DispatchOutcome::ProtectionFailed {
            repository: repository.clone(),
            reason: String::new(),
        },
        DispatchOutcome::Protected {
            repository: repository.clone(),
            branches: vec![],
            issues: vec![],
        },
        DispatchOutcome::Undocumented {
            repository,
            reason: String::new(),
        },
    ];

    let mut labels: Vec<&str> = outcomes.iter().map(DispatchOutcome::label).collect();
    labels.sort_unstable();
    labels.dedup();

    assert_eq!(labels.len(), outcomes.len());
}
