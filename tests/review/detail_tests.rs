use review_core::identity::{Actor, Role};
use review_core::{FilesReady, VersionStatus};

use crate::common::*;

#[tokio::test]
async fn test_first_version_detail_has_no_previous() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.submit_task("Annual report").await;
    harness.attach_files(v1.id, 2).await;

    let detail = harness
        .context
        .review_detail()
        .get_review_detail(&reviewer(), v1.id)
        .await
        .unwrap();

    assert_eq!(detail.task_id, task.id);
    assert_eq!(detail.task_name, "Annual report");
    assert_eq!(detail.version_number, 1);
    assert_eq!(detail.status, VersionStatus::Reviewing);
    assert_eq!(detail.submit_desc.as_deref(), Some("initial submission"));
    assert_eq!(detail.files.len(), 2);
    assert_eq!(detail.creator.display_name.as_deref(), Some("Casey"));
    assert_eq!(detail.reviewer.display_name.as_deref(), Some("Robin"));
    assert!(detail.previous_version.is_none());
}

#[tokio::test]
async fn test_resubmitted_version_shows_previous_decision() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Lease renewal", 2).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    harness.run_worker_once().await;
    orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, Some("fixed".into()))
        .await
        .unwrap();

    let detail = harness
        .context
        .review_detail()
        .get_review_detail(&reviewer(), ticket.version_id)
        .await
        .unwrap();

    assert_eq!(detail.version_number, 2);
    assert_eq!(detail.files_ready, FilesReady::Ready);
    assert_eq!(detail.files.len(), 2);
    assert!(detail.files.iter().all(|f| f.version_id == ticket.version_id));

    let previous = detail.previous_version.unwrap();
    assert_eq!(previous.version_id, v1.id);
    assert_eq!(previous.version_number, 1);
    assert_eq!(previous.status, VersionStatus::Rejected);
    assert_eq!(previous.review_comment.as_deref(), Some("needs changes"));
    assert!(previous.review_time.is_some());
}

#[tokio::test]
async fn test_detail_is_limited_to_assigned_reviewer() {
    let harness = TestHarness::new().await;
    let service = harness.context.review_detail();
    let (_, v1) = harness.submit_task("Restricted").await;

    let err = service
        .get_review_detail(&second_reviewer(), v1.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    // assigned, but without the reviewer role
    let demoted = Actor::new(TENANT_ID, REVIEWER_ID, [Role::User]);
    let err = service.get_review_detail(&demoted, v1.id).await.unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_detail_hides_other_tenants_versions() {
    let harness = TestHarness::new().await;
    let (_, v1) = harness.submit_task("Tenant bound").await;

    let foreign = Actor::new(OTHER_TENANT_ID, FOREIGN_REVIEWER_ID, [Role::Reviewer]);
    let err = harness
        .context
        .review_detail()
        .get_review_detail(&foreign, v1.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");

    let missing = harness
        .context
        .review_detail()
        .get_review_detail(&reviewer(), 9_999)
        .await
        .unwrap_err();
    assert_eq!(missing.code(), "VERSION_NOT_FOUND");
}
