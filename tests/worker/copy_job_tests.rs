use std::time::Duration;

use review_core::config::ReviewConfig;
use review_core::database::ReviewStore;
use review_core::messaging::{CopyJob, CopyJobQueue};
use review_core::FilesReady;

use crate::common::*;

#[tokio::test]
async fn test_execute_copy_twice_does_not_duplicate_rows() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.rejected_task_with_files("Idempotent copy", 3).await;
    let ticket = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    let job = CopyJob::new(TENANT_ID, task.id, v1.id, ticket.version_id);
    let worker = harness.context.copy_worker();

    let first = worker.execute_copy(&job).await.unwrap();
    let second = worker.execute_copy(&job).await.unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(first.file_count, second.file_count);
    assert_eq!(harness.store.count_files(ticket.version_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_redelivered_message_after_success_is_acked() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.rejected_task_with_files("Duplicate delivery", 2).await;
    let ticket = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    // The broker hands the same job out twice
    let jobs = harness.queues.jobs(harness.copy_queue()).unwrap();
    harness
        .context
        .messaging
        .publish(harness.copy_queue(), &jobs[0])
        .await
        .unwrap();

    let outcome = harness.run_worker_once().await;
    assert_eq!(outcome.received, 2);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(harness.dead_letter_len().await, 0);
    assert_eq!(harness.store.count_files(ticket.version_id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_batch_runs_jobs_for_many_versions() {
    let mut config = ReviewConfig::default();
    config.worker.max_concurrent_jobs = 2;
    config.worker.batch_size = 10;
    let harness = TestHarness::with_config(config).await;
    let orchestrator = harness.context.replication_orchestrator();

    let mut tickets = Vec::new();
    for i in 0..5 {
        let (task, v1) = harness
            .rejected_task_with_files(&format!("Parallel {i}"), i + 1)
            .await;
        let ticket = orchestrator
            .start_resubmission(&creator(), task.id, v1.id, true)
            .await
            .unwrap();
        tickets.push((ticket, i + 1));
    }

    let outcome = harness.run_worker_once().await;
    assert_eq!(outcome.received, 5);
    assert_eq!(outcome.succeeded, 5);

    for (ticket, expected_files) in tickets {
        let version = harness.version(ticket.version_id).await;
        assert_eq!(version.files_ready, FilesReady::Ready);
        assert_eq!(version.file_count as usize, expected_files);
    }
}

#[tokio::test]
async fn test_job_for_other_tenant_is_dead_lettered() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.rejected_task_with_files("Tenant mismatch", 1).await;
    let ticket = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    harness.queues.purge(harness.copy_queue());

    harness
        .context
        .messaging
        .publish(
            harness.copy_queue(),
            &CopyJob::new(OTHER_TENANT_ID, task.id, v1.id, ticket.version_id),
        )
        .await
        .unwrap();

    let outcome = harness.run_worker_once().await;
    assert_eq!(outcome.failed, 1);
    assert_eq!(harness.dead_letter_len().await, 1);
    assert_eq!(harness.store.count_files(ticket.version_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_consumer_loop_processes_until_stopped() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.rejected_task_with_files("Background loop", 2).await;

    let consumer = harness.context.copy_job_consumer();
    let handle = consumer.start().unwrap();

    let ticket = harness
        .context
        .replication_orchestrator()
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    let ready = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if harness.version(ticket.version_id).await.files_ready == FilesReady::Ready {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(ready.is_ok(), "consumer should pick up the job");

    consumer.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("consumer should stop")
        .unwrap();
    assert_eq!(consumer.stats().succeeded, 1);
    assert_eq!(harness.copy_queue_len().await, 0);
}
