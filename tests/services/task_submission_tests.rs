use review_core::database::{FaultPoint, ReviewStore};
use review_core::identity::{Actor, Role};
use review_core::services::NewTaskRequest;
use review_core::{FilesReady, TaskStatus, VersionStatus};

use crate::common::*;

fn request(name: &str, reviewer_id: i64) -> NewTaskRequest {
    NewTaskRequest {
        name: name.to_string(),
        reviewer_id,
        submit_desc: None,
    }
}

#[tokio::test]
async fn test_submit_creates_task_and_first_version() {
    let harness = TestHarness::new().await;

    let (task, version) = harness
        .context
        .task_submission()
        .submit_task(&creator(), request("  Annual audit  ", REVIEWER_ID))
        .await
        .unwrap();

    assert_eq!(task.task_name, "Annual audit");
    assert_eq!(task.current_version, 1);
    assert_eq!(task.current_status, TaskStatus::Reviewing);
    assert_eq!(task.creator_id, CREATOR_ID);
    assert_eq!(task.reviewer_id, REVIEWER_ID);

    assert_eq!(version.version_number, 1);
    assert_eq!(version.status, VersionStatus::Reviewing);
    assert_eq!(version.files_ready, FilesReady::Ready);
    assert_eq!(version.file_count, 0);
    assert_eq!(version.task_id, task.id);
}

#[tokio::test]
async fn test_duplicate_names_are_rejected_per_tenant() {
    let harness = TestHarness::new().await;
    let service = harness.context.task_submission();
    service
        .submit_task(&creator(), request("Shared name", REVIEWER_ID))
        .await
        .unwrap();

    let err = service
        .submit_task(&creator(), request(" Shared name ", SECOND_REVIEWER_ID))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_TASK_NAME");

    // Another tenant may reuse the name
    let foreign_creator = Actor::new(OTHER_TENANT_ID, 31, [Role::User]);
    service
        .submit_task(&foreign_creator, request("Shared name", FOREIGN_REVIEWER_ID))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reviewer_must_be_active_reviewer_of_tenant() {
    let harness = TestHarness::new().await;
    let service = harness.context.task_submission();

    for reviewer_id in [INACTIVE_REVIEWER_ID, FOREIGN_REVIEWER_ID, CREATOR_ID, 404] {
        let err = service
            .submit_task(&creator(), request("Bad reviewer", reviewer_id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED", "reviewer {reviewer_id}");
    }
}

#[tokio::test]
async fn test_submit_requires_user_role_and_name() {
    let harness = TestHarness::new().await;
    let service = harness.context.task_submission();

    let err = service
        .submit_task(&reviewer(), request("Reviewer task", SECOND_REVIEWER_ID))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let err = service
        .submit_task(&creator(), request("   ", REVIEWER_ID))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_store_failure_creates_nothing() {
    let harness = TestHarness::new().await;
    harness.store.fail_on(FaultPoint::CreateTask, 1);

    let err = harness
        .context
        .task_submission()
        .submit_task(&creator(), request("Flaky", REVIEWER_ID))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(!harness
        .store
        .task_name_exists(TENANT_ID, "Flaky")
        .await
        .unwrap());
}
