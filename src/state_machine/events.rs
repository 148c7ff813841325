use serde::{Deserialize, Serialize};

use super::states::{ReviewDecision, VersionStatus};

/// Events that can trigger version state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VersionEvent {
    /// Hand a prepared version to the reviewer
    Submit,
    /// Reviewer accepts the version
    Approve,
    /// Reviewer sends the version back
    Reject,
}

impl VersionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Status a version lands in when this event is applied
    pub fn target(&self) -> VersionStatus {
        match self {
            Self::Submit => VersionStatus::Reviewing,
            Self::Approve => VersionStatus::Approved,
            Self::Reject => VersionStatus::Rejected,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        self.target().is_terminal()
    }
}

impl From<ReviewDecision> for VersionEvent {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => Self::Approve,
            ReviewDecision::Reject => Self::Reject,
        }
    }
}
