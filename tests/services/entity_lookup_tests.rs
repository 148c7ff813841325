use review_core::identity::{Actor, Role};
use review_core::services::AlertLevel;

use crate::common::*;

#[tokio::test]
async fn test_task_detail_visibility() {
    let harness = TestHarness::new().await;
    let lookup = harness.context.entity_lookup();
    let (task, _) = harness.submit_task("Visibility").await;

    assert_eq!(lookup.get_task(&creator(), task.id).await.unwrap().id, task.id);
    assert_eq!(lookup.get_task(&reviewer(), task.id).await.unwrap().id, task.id);
    assert_eq!(
        lookup
            .get_task(&second_reviewer(), task.id)
            .await
            .unwrap_err()
            .code(),
        "FORBIDDEN"
    );

    let foreign_admin = Actor::new(OTHER_TENANT_ID, 1, [Role::TenantAdmin]);
    assert_eq!(
        lookup
            .get_task(&foreign_admin, task.id)
            .await
            .unwrap_err()
            .code(),
        "TASK_NOT_FOUND"
    );
}

#[tokio::test]
async fn test_version_status_of_missing_version() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();

    let err = orchestrator
        .get_version_status(&creator(), 8_888)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_NOT_FOUND");
    assert!(harness.context.cache.is_version_missing(8_888).await);
}

#[tokio::test]
async fn test_queue_monitor_reports_backlog() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.context.replication_orchestrator();
    let (task, v1) = harness.rejected_task_with_files("Backlog", 1).await;
    orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();

    let snapshot = harness.context.queue_monitor().snapshot().await.unwrap();
    assert_eq!(snapshot.copy_queue_depth, 1);
    assert_eq!(snapshot.dead_letter_depth, 0);
    assert_eq!(snapshot.alert_level, AlertLevel::Normal);
}

#[tokio::test]
async fn test_system_health_with_in_memory_backends() {
    let harness = TestHarness::new().await;
    let health = harness.context.health_check().await;
    assert!(health.is_ready());
    assert!(health.cache);
}
