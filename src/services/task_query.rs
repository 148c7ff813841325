//! # Task Query Service
//!
//! Paged task lists for the two sides of a review: the tasks a creator
//! submitted and the tasks assigned to a reviewer. Lists are read straight
//! from the store on every call.
//!
//! Each row carries the id of the task's current version and both parties'
//! directory names. Reviewer lists also report how many whole days the
//! current version has been waiting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::reviewer_directory::{display_names, ReviewerDirectory};
use crate::constants::listing::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::constants::MAX_TASK_NAME_LENGTH;
use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::models::{
    Page, PageRequest, ReviewTask, ReviewVersion, StatisticsScope, TaskListFilter, TaskListItem,
    UserRef,
};
use crate::state_machine::TaskStatus;

/// Client-facing list request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskListQuery {
    /// 1-based, defaults to 1
    pub page: Option<u32>,
    /// Defaults to 10, at most 200
    pub page_size: Option<u32>,
    /// Task status, case-insensitive
    pub status: Option<String>,
    /// Substring of the task name
    pub keyword: Option<String>,
    /// First creation day included
    pub start_date: Option<NaiveDate>,
    /// Last creation day included
    pub end_date: Option<NaiveDate>,
    /// Only tasks still waiting for a decision; overrides `status`
    pub pending_only: bool,
}

impl TaskListQuery {
    /// Validate and turn into a store predicate over `scope`
    pub fn into_filter(self, tenant_id: i64, scope: StatisticsScope) -> ReviewResult<TaskListFilter> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ReviewError::validation("page", "must be at least 1"));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ReviewError::validation(
                "pageSize",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let status = if self.pending_only {
            Some(TaskStatus::Reviewing)
        } else {
            self.status
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.to_ascii_uppercase()
                        .parse::<TaskStatus>()
                        .map_err(|e| ReviewError::validation("status", e))
                })
                .transpose()?
        };

        let name_contains = match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if keyword.chars().count() > MAX_TASK_NAME_LENGTH => {
                return Err(ReviewError::validation(
                    "keyword",
                    format!("must be at most {MAX_TASK_NAME_LENGTH} characters"),
                ));
            }
            Some(keyword) if !keyword.is_empty() => Some(keyword.to_owned()),
            _ => None,
        };

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ReviewError::validation(
                    "startDate",
                    "must not be after endDate",
                ));
            }
        }

        Ok(TaskListFilter {
            tenant_id,
            scope,
            status,
            name_contains,
            created_from: self.start_date.and_then(start_of_day),
            created_before: self
                .end_date
                .and_then(|end| end.succ_opt())
                .and_then(start_of_day),
            page: PageRequest::new(page, page_size),
        })
    }
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

/// Whole days since the version entered review, never negative
pub fn pending_days(version: &ReviewVersion, now: DateTime<Utc>) -> i64 {
    let since = version.submit_time.unwrap_or(version.created_at);
    (now - since).num_days().max(0)
}

#[derive(Clone)]
pub struct TaskQueryService {
    store: Arc<dyn ReviewStore>,
    directory: Arc<dyn ReviewerDirectory>,
}

impl std::fmt::Debug for TaskQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueryService").finish_non_exhaustive()
    }
}

impl TaskQueryService {
    pub fn new(store: Arc<dyn ReviewStore>, directory: Arc<dyn ReviewerDirectory>) -> Self {
        Self { store, directory }
    }

    /// Tasks the actor created
    #[instrument(skip(self, actor, query), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn query_my_tasks(
        &self,
        actor: &Actor,
        query: TaskListQuery,
    ) -> ReviewResult<Page<TaskListItem>> {
        let filter = query.into_filter(actor.tenant_id, StatisticsScope::Creator(actor.user_id))?;
        self.list(actor.tenant_id, &filter, false).await
    }

    /// Tasks assigned to the actor for review
    #[instrument(skip(self, actor, query), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn query_reviewer_tasks(
        &self,
        actor: &Actor,
        query: TaskListQuery,
    ) -> ReviewResult<Page<TaskListItem>> {
        if !actor.has_role(Role::Reviewer) {
            return Err(ReviewError::forbidden("reviewer role required"));
        }
        let filter = query.into_filter(actor.tenant_id, StatisticsScope::Reviewer(actor.user_id))?;
        self.list(actor.tenant_id, &filter, true).await
    }

    async fn list(
        &self,
        tenant_id: i64,
        filter: &TaskListFilter,
        reviewer_view: bool,
    ) -> ReviewResult<Page<TaskListItem>> {
        let tasks = self.store.list_tasks(filter).await?;
        debug!(
            total = tasks.total,
            returned = tasks.items.len(),
            page = filter.page.page,
            "📋 Task list loaded"
        );

        let task_ids: Vec<i64> = tasks.items.iter().map(|t| t.id).collect();
        let versions: HashMap<i64, ReviewVersion> = self
            .store
            .find_current_versions(&task_ids)
            .await?
            .into_iter()
            .map(|v| (v.task_id, v))
            .collect();
        let names = display_names(
            self.directory.as_ref(),
            tenant_id,
            tasks
                .items
                .iter()
                .flat_map(|t| [t.creator_id, t.reviewer_id]),
        )
        .await?;

        let now = Utc::now();
        Ok(tasks.map(|task| {
            let version = versions.get(&task.id);
            list_item(task, version, &names, reviewer_view.then_some(now))
        }))
    }
}

fn list_item(
    task: ReviewTask,
    version: Option<&ReviewVersion>,
    names: &HashMap<i64, String>,
    pending_as_of: Option<DateTime<Utc>>,
) -> TaskListItem {
    let pending_days = match (pending_as_of, version) {
        (Some(now), Some(version)) if task.current_status == TaskStatus::Reviewing => {
            Some(pending_days(version, now))
        }
        _ => None,
    };

    TaskListItem {
        task_id: task.id,
        current_version_id: version.map(|v| v.id),
        file_count: version.map_or(0, |v| v.file_count),
        can_resubmit: task.current_status == TaskStatus::Rejected,
        creator: UserRef::named(task.creator_id, names),
        reviewer: UserRef::named(task.reviewer_id, names),
        status: task.current_status,
        current_version: task.current_version,
        created_at: task.created_at,
        last_updated_at: task.updated_at,
        pending_days,
        task_name: task.task_name,
    }
}
