use review_core::database::{FaultPoint, ReviewStore};
use review_core::identity::{Actor, Role};
use review_core::{FilesReady, ReviewDecision, TaskStatus, VersionStatus};

use crate::common::*;

#[tokio::test]
async fn test_approve_updates_version_and_task() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.submit_task("Marketing brochure").await;

    let approved = harness
        .context
        .review_gateway()
        .review(
            &reviewer(),
            v1.id,
            ReviewDecision::Approve,
            Some("  looks good \n".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(approved.status, VersionStatus::Approved);
    assert_eq!(approved.review_result, Some(VersionStatus::Approved));
    assert_eq!(approved.review_comment.as_deref(), Some("looks good"));
    assert_eq!(approved.reviewer_id, Some(REVIEWER_ID));
    assert!(approved.review_time.is_some());
    assert_eq!(harness.task(task.id).await.current_status, TaskStatus::Approved);
}

#[tokio::test]
async fn test_second_review_fails_and_leaves_state_unchanged() {
    let harness = TestHarness::new().await;
    let gateway = harness.context.review_gateway();
    let (task, v1) = harness.submit_task("Double review").await;

    gateway
        .review(&reviewer(), v1.id, ReviewDecision::Reject, Some("no".into()))
        .await
        .unwrap();
    let err = gateway
        .review(&reviewer(), v1.id, ReviewDecision::Approve, Some("yes".into()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_REVIEWED");

    let version = harness.version(v1.id).await;
    assert_eq!(version.status, VersionStatus::Rejected);
    assert_eq!(version.review_comment.as_deref(), Some("no"));
    assert_eq!(harness.task(task.id).await.current_status, TaskStatus::Rejected);
}

#[tokio::test]
async fn test_concurrent_reviews_have_one_winner() {
    let harness = TestHarness::new().await;
    let gateway = harness.context.review_gateway();
    let (_, v1) = harness.submit_task("Race").await;

    let actor = reviewer();
    let (approve, reject) = tokio::join!(
        gateway.review(&actor, v1.id, ReviewDecision::Approve, None),
        gateway.review(&actor, v1.id, ReviewDecision::Reject, None),
    );

    let outcomes = [approve, reject];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.code(), "ALREADY_REVIEWED");
}

#[tokio::test]
async fn test_only_assigned_reviewer_may_review() {
    let harness = TestHarness::new().await;
    let gateway = harness.context.review_gateway();
    let (_, v1) = harness.submit_task("Assignment").await;

    let err = gateway
        .review(&second_reviewer(), v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    // Right user id but without the reviewer role
    let impostor = Actor::new(TENANT_ID, REVIEWER_ID, [Role::User]);
    let err = gateway
        .review(&impostor, v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let foreign = Actor::new(OTHER_TENANT_ID, REVIEWER_ID, [Role::Reviewer]);
    let err = gateway
        .review(&foreign, v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");
}

#[tokio::test]
async fn test_preparing_version_cannot_be_reviewed() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.rejected_task_with_files("Not yet submitted", 1).await;
    let ticket = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    assert_eq!(ticket.files_ready, FilesReady::Copying);

    let err = harness
        .context
        .review_gateway()
        .review(&reviewer(), ticket.version_id, ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_unknown_version_is_remembered_as_missing() {
    let harness = TestHarness::new().await;
    let gateway = harness.context.review_gateway();

    for _ in 0..2 {
        let err = gateway
            .review(&reviewer(), 424_242, ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VERSION_NOT_FOUND");
    }
    assert!(harness.context.cache.is_version_missing(424_242).await);
}

#[tokio::test]
async fn test_store_failure_is_reported_and_nothing_changes() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.submit_task("Flaky store").await;
    harness.store.fail_on(FaultPoint::RecordReview, 1);

    let err = harness
        .context
        .review_gateway()
        .review(&reviewer(), v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORAGE_ERROR");

    let version = harness.store.find_version(v1.id).await.unwrap().unwrap();
    assert_eq!(version.status, VersionStatus::Reviewing);
    assert_eq!(harness.task(task.id).await.current_status, TaskStatus::Reviewing);
}
