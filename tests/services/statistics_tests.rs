use std::time::Duration;

use review_core::database::ReviewStore;
use review_core::identity::{Actor, Role};
use review_core::models::{NewReviewTask, UserProfile};
use review_core::ReviewDecision;

use crate::common::*;

#[tokio::test]
async fn test_statistics_reflect_review_immediately() {
    let harness = TestHarness::new().await;
    let stats = harness.context.statistics();
    let (_, v1) = harness.submit_task("Stats one").await;
    harness.submit_task("Stats two").await;

    // Prime both caches
    let before = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(before.total, 2);
    assert_eq!(before.reviewing, 2);
    assert_eq!(before.approved, 0);
    let reviewer_before = stats.load_reviewer_statistics(&reviewer()).await.unwrap();
    assert_eq!(reviewer_before.reviewing, 2);

    harness
        .context
        .review_gateway()
        .review(&reviewer(), v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap();

    let after = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(after.reviewing, 1);
    assert_eq!(after.approved, 1);
    assert_eq!(after.month_total, 2);
    assert_eq!(after.month_approved, 1);
    assert_eq!(after.pass_rate, 0.5);

    let reviewer_after = stats.load_reviewer_statistics(&reviewer()).await.unwrap();
    assert_eq!(reviewer_after.approved, 1);
    assert_eq!(reviewer_after.reviewing, 1);
}

#[tokio::test]
async fn test_statistics_follow_resubmission() {
    let harness = TestHarness::new().await;
    let stats = harness.context.statistics();
    let (task, v1) = harness.rejected_task_with_files("Stats resubmit", 1).await;

    let rejected = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(rejected.rejected, 1);
    assert_eq!(rejected.reviewing, 0);

    let orchestrator = harness.context.replication_orchestrator();
    let ticket = orchestrator
        .start_resubmission(&creator(), task.id, v1.id, true)
        .await
        .unwrap();
    harness.run_worker_once().await;
    orchestrator
        .finalize_resubmission(&creator(), task.id, ticket.version_id, None)
        .await
        .unwrap();

    let resubmitted = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(resubmitted.total, 1);
    assert_eq!(resubmitted.rejected, 0);
    assert_eq!(resubmitted.reviewing, 1);
}

#[tokio::test]
async fn test_cached_statistics_are_served_without_store() {
    let harness = TestHarness::new().await;
    let stats = harness.context.statistics();
    harness.submit_task("Cached").await;

    let first = stats.load_creator_statistics(&creator()).await.unwrap();

    // A task written behind the services' back is invisible until eviction
    harness
        .store
        .create_task(NewReviewTask {
            tenant_id: TENANT_ID,
            task_name: "Direct insert".to_string(),
            creator_id: CREATOR_ID,
            reviewer_id: REVIEWER_ID,
            submit_desc: None,
        })
        .await
        .unwrap();
    let cached = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(cached, first);

    harness
        .context
        .cache
        .evict_statistics(TENANT_ID, CREATOR_ID, REVIEWER_ID)
        .await;
    let fresh = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(fresh.total, 2);
}

#[tokio::test]
async fn test_reviewer_statistics_require_reviewer_role() {
    let harness = TestHarness::new().await;
    let err = harness
        .context
        .statistics()
        .load_reviewer_statistics(&creator())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_reviewer_options_are_cached_until_evicted() {
    let harness = TestHarness::new().await;
    let stats = harness.context.statistics();

    let options = stats.list_reviewers(&creator()).await.unwrap();
    let ids: Vec<i64> = options.iter().map(|o| o.user_id).collect();
    assert_eq!(ids, vec![REVIEWER_ID, SECOND_REVIEWER_ID]);

    harness.directory.upsert(UserProfile {
        tenant_id: TENANT_ID,
        user_id: 23,
        display_name: "Morgan".to_string(),
        roles: vec![Role::Reviewer],
        active: true,
    });

    let cached = stats.list_reviewers(&creator()).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(harness.directory.listing_count(), 1);

    stats.evict_reviewer_options(TENANT_ID).await;
    let refreshed = stats.list_reviewers(&creator()).await.unwrap();
    assert_eq!(refreshed.len(), 3);
    assert_eq!(harness.directory.listing_count(), 2);

    // Other tenants have their own list
    let foreign = Actor::new(OTHER_TENANT_ID, 99, [Role::User]);
    let foreign_options = stats.list_reviewers(&foreign).await.unwrap();
    assert_eq!(foreign_options.len(), 1);
    assert_eq!(foreign_options[0].user_id, FOREIGN_REVIEWER_ID);
}

#[tokio::test]
async fn test_count_racing_a_review_is_not_cached() {
    let harness = TestHarness::new().await;
    let stats = harness.context.statistics();
    let (_, v1) = harness.submit_task("Racing fill").await;

    // The read counts before the review commits and is held before caching
    harness.store.hold_counts();
    let reader = tokio::spawn({
        let stats = stats.clone();
        async move { stats.load_creator_statistics(&creator()).await }
    });
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.store.held_counts() < 6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("statistics read should reach the store");

    harness
        .context
        .review_gateway()
        .review(&reviewer(), v1.id, ReviewDecision::Approve, None)
        .await
        .unwrap();
    harness.store.release_counts();

    let raced = reader.await.unwrap().unwrap();
    assert_eq!(raced.approved, 0);
    assert_eq!(raced.reviewing, 1);

    let fresh = stats.load_creator_statistics(&creator()).await.unwrap();
    assert_eq!(fresh.approved, 1);
    assert_eq!(fresh.reviewing, 0);
}
