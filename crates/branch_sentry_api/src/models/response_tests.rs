//! Tests for response models

use super::*;
use serde_json::json;

fn issue(number: u64) -> Issue {
    serde_json::from_value(json!({
        "number": number,
        "title": "AUTO: Added branch protection",
        "html_url": format!("https://github.com/my-org/foo/issues/{number}")
    }))
    .unwrap()
}

#[test]
fn test_protection_response_names_repository() {
    let repository = RepositoryIdentity::new("my-org", "foo");

    let response = ProtectionResponse::new(&repository, vec!["main".to_string()], &[issue(3)]);

    assert_eq!(
        response.message,
        "successfully added branch protection for repo foo"
    );
    assert_eq!(response.repository, "my-org/foo");
    assert_eq!(
        response.issues,
        vec![IssueInfo {
            number: 3,
            url: "https://github.com/my-org/foo/issues/3".to_string()
        }]
    );
}

#[test]
fn test_protection_response_serialization() {
    let repository = RepositoryIdentity::new("my-org", "foo");
    let response = ProtectionResponse::new(
        &repository,
        vec!["main".to_string(), "master".to_string()],
        &[],
    );

    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["branches"], json!(["main", "master"]));
    assert_eq!(value["issues"], json!([]));
}

#[test]
fn test_health_check_response_omits_missing_version() {
    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        version: None,
        timestamp: "2025-11-12T10:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"status\":\"healthy\""));
    assert!(!json.contains("version"));
}
