//! Paged task listings and the reviewer's detail view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file::ReviewFile;
use super::statistics::StatisticsScope;
use super::task::ReviewTask;
use crate::constants::listing::DEFAULT_PAGE_SIZE;
use crate::state_machine::{FilesReady, TaskStatus, VersionStatus};

/// 1-based page position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size == 0 {
            return 0;
        }
        let size = i64::from(self.page_size);
        (self.total + size - 1) / size
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Predicate and page for listing tasks.
///
/// `created_from` is inclusive and `created_before` exclusive. The name
/// filter is a case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListFilter {
    pub tenant_id: i64,
    pub scope: StatisticsScope,
    pub status: Option<TaskStatus>,
    pub name_contains: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl TaskListFilter {
    pub fn new(tenant_id: i64, scope: StatisticsScope) -> Self {
        Self {
            tenant_id,
            scope,
            status: None,
            name_contains: None,
            created_from: None,
            created_before: None,
            page: PageRequest::default(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn matches(&self, task: &ReviewTask) -> bool {
        let in_scope = match self.scope {
            StatisticsScope::Creator(user_id) => task.creator_id == user_id,
            StatisticsScope::Reviewer(user_id) => task.reviewer_id == user_id,
        };
        in_scope
            && task.tenant_id == self.tenant_id
            && self.status.map_or(true, |s| task.current_status == s)
            && self.name_contains.as_deref().map_or(true, |needle| {
                task.task_name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
            && self.created_from.map_or(true, |from| task.created_at >= from)
            && self.created_before.map_or(true, |before| task.created_at < before)
    }
}

/// A user id with its directory name, when the directory knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: i64,
    pub display_name: Option<String>,
}

impl UserRef {
    pub fn named(user_id: i64, names: &HashMap<i64, String>) -> Self {
        Self {
            user_id,
            display_name: names.get(&user_id).cloned(),
        }
    }
}

/// Row of a creator's or reviewer's task list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    pub task_id: i64,
    pub task_name: String,
    pub current_version: i32,
    pub current_version_id: Option<i64>,
    pub status: TaskStatus,
    pub can_resubmit: bool,
    pub file_count: i32,
    pub creator: UserRef,
    pub reviewer: UserRef,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// Whole days the current version has waited, reviewer lists only
    pub pending_days: Option<i64>,
}

/// Outcome of the version before the one under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousVersionInfo {
    pub version_id: i64,
    pub version_number: i32,
    pub status: VersionStatus,
    pub review_comment: Option<String>,
    pub review_time: Option<DateTime<Utc>>,
}

/// Everything a reviewer sees when opening a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    pub task_id: i64,
    pub task_name: String,
    pub version_id: i64,
    pub version_number: i32,
    pub status: VersionStatus,
    pub submit_desc: Option<String>,
    pub submit_time: Option<DateTime<Utc>>,
    pub files_ready: FilesReady,
    pub file_count: i32,
    pub creator: UserRef,
    pub reviewer: UserRef,
    pub files: Vec<ReviewFile>,
    pub previous_version: Option<PreviousVersionInfo>,
}
