use review_core::database::ReviewStore;
use review_core::{ErrorKind, FilesReady, VersionStatus};

use crate::common::*;

#[tokio::test]
async fn test_dispatch_failure_marks_version_failed_and_is_retryable() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Broker outage", 2).await;

    harness.queues.fail_next_publishes(1);
    let err = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DISPATCH_FAILED");
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(err.is_retryable());

    let preparing = harness
        .store
        .find_preparing_version(task.id)
        .await
        .unwrap()
        .expect("version survives the failed dispatch");
    assert_eq!(preparing.files_ready, FilesReady::Failed);
    assert_eq!(harness.copy_queue_len().await, 0);

    // Calling start again returns the same version rather than a new number
    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    assert_eq!(ticket.version_id, preparing.id);
    assert_eq!(ticket.files_ready, FilesReady::Failed);
    assert!(!ticket.created);
}

#[tokio::test]
async fn test_retrigger_recovers_failed_copy() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Retry me", 3).await;

    harness.queues.fail_next_publishes(1);
    orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap_err();
    let version = harness
        .store
        .find_preparing_version(task.id)
        .await
        .unwrap()
        .unwrap();

    let view = orchestrator
        .retrigger_copy(&creator(), task.id, version.id, v1.id)
        .await
        .unwrap();
    assert_eq!(view.files_ready, FilesReady::Copying);
    assert_eq!(harness.copy_queue_len().await, 1);

    harness.run_worker_once().await;
    let finalized = orchestrator
        .finalize_resubmission(&creator(), task.id, version.id, None)
        .await
        .unwrap();
    assert_eq!(finalized.status, VersionStatus::Reviewing);
    assert_eq!(finalized.file_count, 3);
    assert_eq!(finalized.version_number, 2);
}

#[tokio::test]
async fn test_retrigger_failing_again_stays_failed() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Still down", 1).await;

    harness.queues.fail_next_publishes(2);
    orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap_err();
    let version = harness
        .store
        .find_preparing_version(task.id)
        .await
        .unwrap()
        .unwrap();

    let err = orchestrator
        .retrigger_copy(&creator(), task.id, version.id, v1.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DISPATCH_FAILED");
    assert_eq!(harness.version(version.id).await.files_ready, FilesReady::Failed);
}

#[tokio::test]
async fn test_retrigger_rejects_ready_or_non_preparing_versions() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Nothing to retry", 1).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    harness.run_worker_once().await;

    let err = orchestrator
        .retrigger_copy(&creator(), task.id, ticket.version_id, v1.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");

    let err = orchestrator
        .retrigger_copy(&creator(), task.id, v1.id, v1.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_retrigger_rejects_self_copy() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Self copy", 1).await;

    harness.queues.fail_next_publishes(1);
    orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap_err();
    let version = harness
        .store
        .find_preparing_version(task.id)
        .await
        .unwrap()
        .unwrap();

    let err = orchestrator
        .retrigger_copy(&creator(), task.id, version.id, version.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");
}
