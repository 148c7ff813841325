use review_core::cache::keys;

use crate::common::*;

#[tokio::test]
async fn test_snapshot_reports_lookups_and_hot_keys() {
    let harness = TestHarness::new().await;
    harness.submit_task("Monitored").await;

    let stats = harness.context.statistics();
    stats.load_creator_statistics(&creator()).await.unwrap();
    stats.load_creator_statistics(&creator()).await.unwrap();
    stats.list_reviewers(&creator()).await.unwrap();

    let snapshot = harness.context.cache_monitor().snapshot().await.unwrap();

    assert_eq!(snapshot.backend, "moka");
    assert_eq!(snapshot.hits, 1);
    assert_eq!(snapshot.misses, 2);
    assert!((snapshot.hit_rate - 1.0 / 3.0).abs() < 1e-9);
    assert!(snapshot.key_count >= 2);

    let stat_key = keys::user_statistics(TENANT_ID, CREATOR_ID);
    let stat = snapshot
        .hot_keys
        .iter()
        .find(|k| k.key == stat_key)
        .expect("statistics key sampled");
    let ttl = stat.ttl_seconds.expect("statistics keys expire");
    assert!(ttl <= 72);

    let options_key = keys::reviewer_options(TENANT_ID);
    assert!(snapshot.hot_keys.iter().any(|k| k.key == options_key));
}

#[tokio::test]
async fn test_evicted_keys_leave_the_sample() {
    let harness = TestHarness::new().await;
    let (_, v1) = harness.submit_task("Evicted").await;
    harness
        .context
        .statistics()
        .load_creator_statistics(&creator())
        .await
        .unwrap();

    harness.reject(v1.id).await;

    let snapshot = harness.context.cache_monitor().snapshot().await.unwrap();
    let stat_key = keys::user_statistics(TENANT_ID, CREATOR_ID);
    assert!(snapshot.hot_keys.iter().all(|k| k.key != stat_key));
}
