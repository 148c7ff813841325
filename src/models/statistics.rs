use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::TaskStatus;

/// Whose tasks a statistics snapshot counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "user_id", rename_all = "snake_case")]
pub enum StatisticsScope {
    /// Tasks created by the user
    Creator(i64),
    /// Tasks assigned to the user for review
    Reviewer(i64),
}

/// Predicate for counting tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCountFilter {
    pub tenant_id: i64,
    pub scope: StatisticsScope,
    pub status: Option<TaskStatus>,
    pub created_since: Option<DateTime<Utc>>,
}

impl TaskCountFilter {
    pub fn new(tenant_id: i64, scope: StatisticsScope) -> Self {
        Self {
            tenant_id,
            scope,
            status: None,
            created_since: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }
}

/// Review counters for one user, cached under the statistics keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: i64,
    pub reviewing: i64,
    pub approved: i64,
    pub rejected: i64,
    pub month_total: i64,
    pub month_approved: i64,
    pub pass_rate: f64,
}

impl TaskStatistics {
    pub fn from_counts(
        total: i64,
        reviewing: i64,
        approved: i64,
        rejected: i64,
        month_total: i64,
        month_approved: i64,
    ) -> Self {
        Self {
            total,
            reviewing,
            approved,
            rejected,
            month_total,
            month_approved,
            pass_rate: pass_rate(approved, total),
        }
    }
}

/// Approved share of all tasks, rounded to three decimals
pub fn pass_rate(approved: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    ((approved as f64 / total as f64) * 1000.0).round() / 1000.0
}

/// Midnight UTC on the first day of `now`'s month
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
