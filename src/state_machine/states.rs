use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single submission attempt.
///
/// PREPARING versions are still being assembled (files may be copying),
/// REVIEWING versions wait for the assigned reviewer, and the two review
/// outcomes are terminal for the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// Created by a resubmission, not yet visible to the reviewer
    Preparing,
    /// Submitted and waiting for a decision
    Reviewing,
    /// Accepted by the reviewer
    Approved,
    /// Sent back by the reviewer
    Rejected,
}

impl VersionStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "PREPARING",
            Self::Reviewing => "REVIEWING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PREPARING" => Ok(Self::Preparing),
            "REVIEWING" => Ok(Self::Reviewing),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Invalid version status: {s}")),
        }
    }
}

/// Task status mirrors the status of the task's current version.
///
/// A task never carries PREPARING: while a resubmission is being assembled
/// the task keeps showing the outcome of the previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Reviewing,
    Approved,
    Rejected,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reviewing => "REVIEWING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REVIEWING" => Ok(Self::Reviewing),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl TryFrom<VersionStatus> for TaskStatus {
    type Error = String;

    fn try_from(status: VersionStatus) -> Result<Self, Self::Error> {
        match status {
            VersionStatus::Reviewing => Ok(Self::Reviewing),
            VersionStatus::Approved => Ok(Self::Approved),
            VersionStatus::Rejected => Ok(Self::Rejected),
            VersionStatus::Preparing => {
                Err("PREPARING has no task-level mirror".to_string())
            }
        }
    }
}

impl From<TaskStatus> for VersionStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Reviewing => Self::Reviewing,
            TaskStatus::Approved => Self::Approved,
            TaskStatus::Rejected => Self::Rejected,
        }
    }
}

/// Tri-state readiness of a version's file set.
///
/// Persisted as a small integer: `0` copying, `1` ready, `-1` failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum FilesReady {
    /// Replication gave up; the version cannot be submitted until re-triggered
    Failed,
    /// A copy job is outstanding
    Copying,
    /// The file set is complete
    Ready,
}

impl FilesReady {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Failed => -1,
            Self::Copying => 0,
            Self::Ready => 1,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Copying => "copying",
            Self::Ready => "ready",
        }
    }
}

impl From<FilesReady> for i16 {
    fn from(value: FilesReady) -> Self {
        value.as_i16()
    }
}

impl TryFrom<i16> for FilesReady {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Failed),
            0 => Ok(Self::Copying),
            1 => Ok(Self::Ready),
            other => Err(format!("Invalid files_ready flag: {other}")),
        }
    }
}

impl fmt::Display for FilesReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer verdict on a REVIEWING version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    #[serde(alias = "APPROVED")]
    Approve,
    #[serde(alias = "REJECTED")]
    Reject,
}

impl ReviewDecision {
    /// Status the version moves to when this decision is recorded
    pub fn target_status(self) -> VersionStatus {
        match self {
            Self::Approve => VersionStatus::Approved,
            Self::Reject => VersionStatus::Rejected,
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVE" | "APPROVED" => Ok(Self::Approve),
            "REJECT" | "REJECTED" => Ok(Self::Reject),
            _ => Err(format!("Invalid review decision: {s}")),
        }
    }
}
