use chrono::Utc;

use review_core::FilesReady;

use crate::common::*;

#[tokio::test]
async fn test_lost_copy_job_becomes_retriggerable_failure() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Lost job", 2).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    // The job disappears and the version sits at "copying" for hours
    harness.queues.purge(harness.copy_queue());
    harness
        .store
        .set_version_updated_at(ticket.version_id, Utc::now() - chrono::Duration::hours(3));

    let reaped = harness.context.stale_copy_reaper().reap_once().await.unwrap();
    assert_eq!(reaped, 1);

    let status = orchestrator
        .get_version_status(&creator(), ticket.version_id)
        .await
        .unwrap();
    assert_eq!(status.files_ready, FilesReady::Failed);

    orchestrator
        .retrigger_copy(&creator(), task.id, ticket.version_id, v1.id)
        .await
        .unwrap();
    harness.run_worker_once().await;

    let status = orchestrator
        .get_version_status(&creator(), ticket.version_id)
        .await
        .unwrap();
    assert_eq!(status.files_ready, FilesReady::Ready);
    assert_eq!(status.file_count, 2);
}

#[tokio::test]
async fn test_reaper_ignores_ready_versions() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Finished copy", 1).await;

    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    harness.run_worker_once().await;
    harness
        .store
        .set_version_updated_at(ticket.version_id, Utc::now() - chrono::Duration::hours(3));

    let reaped = harness.context.stale_copy_reaper().reap_once().await.unwrap();
    assert_eq!(reaped, 0);
    assert_eq!(
        harness.version(ticket.version_id).await.files_ready,
        FilesReady::Ready
    );
}
