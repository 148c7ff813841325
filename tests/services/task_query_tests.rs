use chrono::{Duration, NaiveDate, TimeZone, Utc};
use review_core::identity::{Actor, Role};
use review_core::services::TaskListQuery;
use review_core::{ReviewDecision, TaskStatus};

use crate::common::*;

fn query() -> TaskListQuery {
    TaskListQuery::default()
}

#[tokio::test]
async fn test_my_tasks_newest_update_first() {
    let harness = TestHarness::new().await;
    let (first, _) = harness.submit_task("Alpha").await;
    let (second, _) = harness.submit_task("Beta").await;
    let (third, _) = harness.submit_task("Gamma").await;

    let base = Utc::now() - Duration::hours(1);
    harness.store.set_task_times(first.id, base, base + Duration::minutes(30));
    harness.store.set_task_times(second.id, base, base + Duration::minutes(10));
    harness.store.set_task_times(third.id, base, base + Duration::minutes(20));

    let page = harness
        .context
        .task_query()
        .query_my_tasks(&creator(), query())
        .await
        .unwrap();

    let ids: Vec<i64> = page.items.iter().map(|i| i.task_id).collect();
    assert_eq!(ids, vec![first.id, third.id, second.id]);
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 10);
}

#[tokio::test]
async fn test_list_items_carry_version_and_names() {
    let harness = TestHarness::new().await;
    let (task, v1) = harness.submit_task("Brochure").await;
    harness.attach_files(v1.id, 2).await;
    harness.reject(v1.id).await;

    let page = harness
        .context
        .task_query()
        .query_my_tasks(&creator(), query())
        .await
        .unwrap();

    let item = &page.items[0];
    assert_eq!(item.task_id, task.id);
    assert_eq!(item.current_version, 1);
    assert_eq!(item.current_version_id, Some(v1.id));
    assert_eq!(item.status, TaskStatus::Rejected);
    assert!(item.can_resubmit);
    assert_eq!(item.creator.display_name.as_deref(), Some("Casey"));
    assert_eq!(item.reviewer.user_id, REVIEWER_ID);
    assert_eq!(item.reviewer.display_name.as_deref(), Some("Robin"));
    assert!(item.pending_days.is_none());
}

#[tokio::test]
async fn test_paging_splits_the_result() {
    let harness = TestHarness::new().await;
    for i in 0..5 {
        harness.submit_task(&format!("Report {i}")).await;
    }

    let service = harness.context.task_query();
    let second = service
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                page: Some(2),
                page_size: Some(2),
                ..query()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.total, 5);
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.total_pages(), 3);

    let beyond = service
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                page: Some(4),
                page_size: Some(2),
                ..query()
            },
        )
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 5);
}

#[tokio::test]
async fn test_status_and_keyword_filters() {
    let harness = TestHarness::new().await;
    harness.submit_task("Supplier contract").await;
    let (_, rejected) = harness.submit_task("Customer contract").await;
    harness.reject(rejected.id).await;
    harness.submit_task("Invoice batch").await;

    let service = harness.context.task_query();
    let contracts = service
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                keyword: Some("  CONTRACT ".into()),
                ..query()
            },
        )
        .await
        .unwrap();
    assert_eq!(contracts.total, 2);

    let rejected_contracts = service
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                keyword: Some("contract".into()),
                status: Some("rejected".into()),
                ..query()
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected_contracts.total, 1);
    assert_eq!(rejected_contracts.items[0].task_name, "Customer contract");
}

#[tokio::test]
async fn test_keyword_wildcards_match_literally() {
    let harness = TestHarness::new().await;
    harness.submit_task("Rebate 50% plan").await;
    harness.submit_task("Rebate 500 plan").await;

    let page = harness
        .context
        .task_query()
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                keyword: Some("50%".into()),
                ..query()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].task_name, "Rebate 50% plan");
}

#[tokio::test]
async fn test_date_window_includes_the_end_day() {
    let harness = TestHarness::new().await;
    let (early, _) = harness.submit_task("Early").await;
    let (inside, _) = harness.submit_task("Inside").await;
    let (late, _) = harness.submit_task("Late").await;

    let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
    harness.store.set_task_times(early.id, at(4, 23), at(4, 23));
    harness.store.set_task_times(inside.id, at(6, 23), at(6, 23));
    harness.store.set_task_times(late.id, at(7, 0), at(7, 0));

    let page = harness
        .context
        .task_query()
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                start_date: NaiveDate::from_ymd_opt(2024, 3, 5),
                end_date: NaiveDate::from_ymd_opt(2024, 3, 6),
                ..query()
            },
        )
        .await
        .unwrap();

    let ids: Vec<i64> = page.items.iter().map(|i| i.task_id).collect();
    assert_eq!(ids, vec![inside.id]);
}

#[tokio::test]
async fn test_reviewer_pending_only_reports_waiting_days() {
    let harness = TestHarness::new().await;
    let (waiting, v1) = harness.submit_task("Waiting").await;
    let (_, decided) = harness.submit_task("Decided").await;
    harness
        .context
        .review_gateway()
        .review(&reviewer(), decided.id, ReviewDecision::Approve, None)
        .await
        .unwrap();
    harness
        .store
        .set_version_submit_time(v1.id, Utc::now() - Duration::hours(75));

    let page = harness
        .context
        .task_query()
        .query_reviewer_tasks(
            &reviewer(),
            TaskListQuery {
                pending_only: true,
                ..query()
            },
        )
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    let item = &page.items[0];
    assert_eq!(item.task_id, waiting.id);
    assert_eq!(item.status, TaskStatus::Reviewing);
    assert_eq!(item.pending_days, Some(3));
    assert_eq!(item.creator.display_name.as_deref(), Some("Casey"));
}

#[tokio::test]
async fn test_reviewer_list_is_scoped_to_assignee() {
    let harness = TestHarness::new().await;
    harness.submit_task("Assigned to Robin").await;

    let page = harness
        .context
        .task_query()
        .query_reviewer_tasks(&second_reviewer(), query())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_reviewer_list_requires_reviewer_role() {
    let harness = TestHarness::new().await;
    let err = harness
        .context
        .task_query()
        .query_reviewer_tasks(&creator(), query())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_lists_do_not_cross_tenants() {
    let harness = TestHarness::new().await;
    harness.submit_task("Tenant one only").await;

    let outsider = Actor::new(OTHER_TENANT_ID, CREATOR_ID, [Role::User]);
    let page = harness
        .context
        .task_query()
        .query_my_tasks(&outsider, query())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_invalid_paging_is_rejected() {
    let harness = TestHarness::new().await;
    let err = harness
        .context
        .task_query()
        .query_my_tasks(
            &creator(),
            TaskListQuery {
                page_size: Some(201),
                ..query()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");
}
