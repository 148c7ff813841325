use std::time::Duration;

use review_core::config::DispatchMode;
use review_core::database::{FaultPoint, ReviewStore};
use review_core::identity::{Actor, Role};
use review_core::{FilesReady, ReviewDecision, TaskStatus, VersionStatus};

use crate::common::*;

#[tokio::test]
async fn test_resubmission_with_reused_files_reaches_reviewing() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();

    // v1 rejected, v2 resubmitted with fresh files and rejected again
    let (task, v1) = harness.rejected_task_with_files("Lease agreement", 1).await;
    let v2 = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, false)
        .await
        .unwrap();
    harness.attach_files(v2.version_id, 2).await;
    orchestrator
        .finalize_resubmission(&creator(), task.id, v2.version_id, None)
        .await
        .unwrap();
    harness.reject(v2.version_id).await;

    // v3 reuses the two files of v2
    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v2.version_id, true)
        .await
        .unwrap();
    assert!(ticket.created);
    assert_eq!(ticket.version_number, 3);
    assert_eq!(ticket.files_ready, FilesReady::Copying);

    let jobs = harness.queues.jobs(harness.copy_queue()).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].old_version_id, v2.version_id);
    assert_eq!(jobs[0].new_version_id, ticket.version_id);
    assert_eq!(jobs[0].tenant_id, TENANT_ID);

    let outcome = harness.run_worker_once().await;
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(harness.copy_queue_len().await, 0);

    let status = orchestrator
        .get_version_status(&creator(), ticket.version_id)
        .await
        .unwrap();
    assert_eq!(status.files_ready, FilesReady::Ready);
    assert_eq!(status.file_count, 2);

    let v3 = orchestrator
        .finalize_resubmission(
            &creator(),
            task.id,
            ticket.version_id,
            Some("  reused the corrected files  ".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(v3.status, VersionStatus::Reviewing);
    assert_eq!(v3.file_count, 2);
    assert_eq!(v3.submit_desc.as_deref(), Some("reused the corrected files"));
    assert!(v3.review_result.is_none());

    let task = harness.task(task.id).await;
    assert_eq!(task.current_version, 3);
    assert_eq!(task.current_status, TaskStatus::Reviewing);

    let copies = harness.store.list_files(v3.id).await.unwrap();
    let originals = harness.store.list_files(v2.version_id).await.unwrap();
    let mut copied_objects: Vec<_> = copies.iter().map(|f| f.object_name.clone()).collect();
    let mut original_objects: Vec<_> = originals.iter().map(|f| f.object_name.clone()).collect();
    copied_objects.sort();
    original_objects.sort();
    assert_eq!(copied_objects, original_objects);
}

#[tokio::test]
async fn test_fresh_files_version_starts_ready_but_needs_files() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Supplier onboarding", 1).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, false)
        .await
        .unwrap();
    assert_eq!(ticket.files_ready, FilesReady::Ready);
    assert_eq!(harness.copy_queue_len().await, 0);

    let err = orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NO_FILES");

    harness.attach_files(ticket.version_id, 1).await;
    let v2 = orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
        .await
        .unwrap();
    assert_eq!(v2.version_number, 2);
    assert_eq!(v2.file_count, 1);
}

#[tokio::test]
async fn test_concurrent_starts_share_one_version_and_one_job() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Budget 2026", 3).await;

    let actor = creator();
    let (first, second) = tokio::join!(
        orchestrator.start_resubmission(&actor, task.id, v1.id, true),
        orchestrator.start_resubmission(&actor, task.id, v1.id, true),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.version_id, second.version_id);
    assert_eq!(harness.store.preparing_count(task.id), 1);
    assert_eq!(harness.copy_queue_len().await, 1);
    assert!(first.created ^ second.created);

    // A later retry after the copy finished still returns the same version
    harness.run_worker_once().await;
    let again = orchestrator
        .start_resubmission(&actor, task.id, v1.id, true)
        .await
        .unwrap();
    assert_eq!(again.version_id, first.version_id);
    assert_eq!(again.files_ready, FilesReady::Ready);
    assert!(!again.created);
    assert_eq!(harness.copy_queue_len().await, 0);
}

#[tokio::test]
async fn test_resubmission_requires_rejected_task() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.submit_task("Still under review").await;

    let err = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    assert_eq!(harness.store.preparing_count(task.id), 0);
}

#[tokio::test]
async fn test_resubmission_access_rules() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Access rules", 1).await;

    let err = orchestrator
        .start_resubmission(&reviewer(), task.id, v1.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let outsider = Actor::new(OTHER_TENANT_ID, CREATOR_ID, [Role::User]);
    let err = orchestrator
        .start_resubmission(&outsider, task.id, v1.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TASK_NOT_FOUND");

    let err = orchestrator
        .start_resubmission(&creator(), 9_999, v1.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TASK_NOT_FOUND");
}

#[tokio::test]
async fn test_source_version_must_belong_to_task() {
    let harness = TestHarness::new().await;
    let (task, _) = harness.rejected_task_with_files("First task", 1).await;
    let (_, foreign_version) = harness.rejected_task_with_files("Second task", 1).await;

    let err = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, foreign_version.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");
    assert_eq!(harness.store.preparing_count(task.id), 0);
}

#[tokio::test]
async fn test_finalize_while_copying_reports_copying() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Pending copy", 2).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    let err = orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FILES_COPYING");

    let status = orchestrator
        .get_version_status(&creator(), ticket.version_id)
        .await
        .unwrap();
    assert_eq!(status.status, VersionStatus::Preparing);
    assert_eq!(status.files_ready, FilesReady::Copying);
}

#[tokio::test]
async fn test_copy_failure_surfaces_as_failed_state() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Broken copy", 2).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    harness.store.fail_on(FaultPoint::ReplicateFiles, 1);
    let outcome = harness.run_worker_once().await;
    assert_eq!(outcome.failed, 1);
    assert_eq!(harness.copy_queue_len().await, 0);
    assert_eq!(harness.dead_letter_len().await, 1);

    let version = harness.version(ticket.version_id).await;
    assert_eq!(version.files_ready, FilesReady::Failed);
    assert_eq!(version.status, VersionStatus::Preparing);

    let task_after = harness.task(task.id).await;
    assert_eq!(task_after.current_version, 1);
    assert_eq!(task_after.current_status, TaskStatus::Rejected);

    let err = orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FILES_COPY_FAILED");

    let status = orchestrator
        .get_version_status(&creator(), ticket.version_id)
        .await
        .unwrap();
    assert_eq!(status.files_ready, FilesReady::Failed);
}

#[tokio::test]
async fn test_inline_dispatch_copies_without_queue() {
    let harness = TestHarness::with_dispatch_mode(DispatchMode::Inline).await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Inline copy", 4).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    assert_eq!(harness.copy_queue_len().await, 0);

    let ready = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let status = orchestrator
                .get_version_status(&creator(), ticket.version_id)
                .await
                .unwrap();
            if status.files_ready != FilesReady::Copying {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("inline copy should finish");

    assert_eq!(ready.files_ready, FilesReady::Ready);
    assert_eq!(ready.file_count, 4);
}

#[tokio::test]
async fn test_version_numbers_increase_across_resubmissions() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, mut source) = harness.rejected_task_with_files("Many rounds", 1).await;

    for expected in 2..=4 {
        let ticket = orchestrator
            .start_resubmission(&creator(), task.id, source.id, true)
            .await
            .unwrap();
        assert_eq!(ticket.version_number, expected);
        harness.run_worker_once().await;
        orchestrator
            .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
            .await
            .unwrap();
        source = harness
            .context
            .review_gateway()
            .review(&reviewer(), ticket.version_id, ReviewDecision::Reject, None)
            .await
            .unwrap();
    }

    let versions = harness
        .context
        .entity_lookup()
        .list_versions(&creator(), task.id)
        .await
        .unwrap();
    let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_retry_with_unknown_source_is_rejected_while_preparing() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Retry source check", 1).await;
    let (_, other_task_version) = harness.rejected_task_with_files("Unrelated task", 1).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    let err = orchestrator
        .start_resubmission(&creator(), task.id, 9_999, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");

    let err = orchestrator
        .start_resubmission(&creator(), task.id, other_task_version.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");

    let again = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    assert_eq!(again.version_id, ticket.version_id);
    assert!(!again.created);
}
