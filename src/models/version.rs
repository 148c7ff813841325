use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::{FilesReady, ReviewDecision, VersionStatus};

/// ReviewVersion is one numbered submission attempt within a task.
/// Maps to the `review_version` table.
///
/// At most one PREPARING version exists per task, and a version never
/// reaches REVIEWING while `files_ready` is anything but ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVersion {
    pub id: i64,
    pub task_id: i64,
    pub tenant_id: i64,
    pub version_number: i32,
    pub status: VersionStatus,
    pub files_ready: FilesReady,
    pub file_count: i32,
    pub submit_desc: Option<String>,
    pub review_result: Option<VersionStatus>,
    pub review_comment: Option<String>,
    pub reviewer_id: Option<i64>,
    pub submit_time: Option<DateTime<Utc>>,
    pub review_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewVersion {
    pub fn belongs_to(&self, task_id: i64) -> bool {
        self.task_id == task_id
    }

    pub fn status_view(&self) -> VersionStatusView {
        VersionStatusView {
            version_id: self.id,
            status: self.status,
            files_ready: self.files_ready,
            file_count: self.file_count,
        }
    }
}

/// Snapshot returned to clients polling a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatusView {
    pub version_id: i64,
    pub status: VersionStatus,
    pub files_ready: FilesReady,
    pub file_count: i32,
}

/// Input for opening a PREPARING version on a rejected task.
///
/// The store assigns `max(version_number) + 1` inside the same statement
/// that enforces PREPARING uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPreparingVersion {
    pub task_id: i64,
    pub tenant_id: i64,
    pub files_ready: FilesReady,
    pub reviewer_id: i64,
}

/// Outcome of a PREPARING insert
#[derive(Debug, Clone, PartialEq)]
pub enum PreparingInsert {
    /// This call created the version
    Created(ReviewVersion),
    /// Another PREPARING version already existed (or won the race)
    Existing(ReviewVersion),
}

impl PreparingInsert {
    pub fn version(&self) -> &ReviewVersion {
        match self {
            Self::Created(v) | Self::Existing(v) => v,
        }
    }

    pub fn into_version(self) -> ReviewVersion {
        match self {
            Self::Created(v) | Self::Existing(v) => v,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Guarded PREPARING → REVIEWING write for a version and its task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeVersion {
    pub task_id: i64,
    pub version_id: i64,
    pub submit_desc: Option<String>,
    pub file_count: i32,
}

/// Guarded REVIEWING → APPROVED / REJECTED write for a version and its task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReview {
    pub task_id: i64,
    pub version_id: i64,
    pub reviewer_id: i64,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}
