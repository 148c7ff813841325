use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::TaskStatus;

/// ReviewTask is a named review thread within a tenant.
/// Maps to the `review_task` table.
///
/// `current_status` always mirrors the status of the version whose number is
/// `current_version`; only state-machine guarded store operations change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTask {
    pub id: i64,
    pub tenant_id: i64,
    pub task_name: String,
    pub creator_id: i64,
    pub reviewer_id: i64,
    pub current_version: i32,
    pub current_status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewTask {
    pub fn is_created_by(&self, user_id: i64) -> bool {
        self.creator_id == user_id
    }

    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.reviewer_id == user_id
    }
}

/// New ReviewTask for creation (without generated fields).
///
/// The store creates the task together with its first version, which starts
/// REVIEWING with a ready, empty file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReviewTask {
    pub tenant_id: i64,
    pub task_name: String,
    pub creator_id: i64,
    pub reviewer_id: i64,
    pub submit_desc: Option<String>,
}
