use super::*;

#[test]
fn test_branch_not_found_message() {
    let error = ResolveError::BranchNotFound {
        branch: "main".to_string(),
        attempts: 11,
    };

    assert_eq!(
        error.to_string(),
        "branch 'main' was not found after 11 attempts"
    );
}

#[test]
fn test_no_matching_branches_lists_requested_names() {
    let error = ResolveError::NoMatchingBranches {
        requested: vec!["main".to_string(), "master".to_string()],
    };

    assert_eq!(
        error.to_string(),
        "none of the branches [main, master] exist in the repository"
    );
}

#[test]
fn test_issue_creation_message_names_repository_and_branch() {
    let error = NotificationError::IssueCreation {
        repository: "my-org/foo".to_string(),
        branch: "main".to_string(),
        reason: "Issues are disabled for this repo".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("my-org/foo"));
    assert!(message.contains("'main'"));
    assert!(message.ends_with("Issues are disabled for this repo"));
}

#[test]
fn test_configuration_error_messages() {
    let missing = ConfigurationError::RequiredConfigMissing {
        key: "GITHUB_WEBHOOK_SECRET".to_string(),
    };
    assert_eq!(
        missing.to_string(),
        "Required configuration missing: GITHUB_WEBHOOK_SECRET"
    );

    let invalid = ConfigurationError::InvalidConfiguration {
        field: "branch_names".to_string(),
        reason: "must not be empty".to_string(),
    };
    assert_eq!(
        invalid.to_string(),
        "Invalid configuration: branch_names - must not be empty"
    );
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<ResolveError>();
    assert_send_sync::<NotificationError>();
    assert_send_sync::<ConfigurationError>();
}
