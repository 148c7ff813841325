use tracing::debug;

use super::errors::{StateMachineError, StateMachineResult};
use super::events::VersionEvent;
use super::guards::ensure_transition;
use super::states::{FilesReady, TaskStatus, VersionStatus};
use crate::models::ReviewVersion;

/// In-memory state machine over a version snapshot.
///
/// Persistence is the caller's job: the machine only decides whether an
/// event is legal for the snapshot it was built from and which status the
/// version (and its task) end up in.
#[derive(Debug, Clone)]
pub struct VersionStateMachine {
    version_id: i64,
    current: VersionStatus,
    files_ready: FilesReady,
    file_count: i64,
}

impl VersionStateMachine {
    pub fn new(
        version_id: i64,
        current: VersionStatus,
        files_ready: FilesReady,
        file_count: i64,
    ) -> Self {
        Self {
            version_id,
            current,
            files_ready,
            file_count,
        }
    }

    /// Build a machine from a stored version
    pub fn for_version(version: &ReviewVersion) -> Self {
        Self::new(
            version.id,
            version.status,
            version.files_ready,
            i64::from(version.file_count),
        )
    }

    /// Override the file count with an authoritative number from the file store
    pub fn with_file_count(mut self, file_count: i64) -> Self {
        self.file_count = file_count;
        self
    }

    pub fn current_state(&self) -> VersionStatus {
        self.current
    }

    pub fn version_id(&self) -> i64 {
        self.version_id
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Resolve the target status for `event` without mutating the machine
    pub fn determine_target_state(&self, event: VersionEvent) -> StateMachineResult<VersionStatus> {
        let target = match (self.current, event) {
            (VersionStatus::Preparing, VersionEvent::Submit) => VersionStatus::Reviewing,
            (VersionStatus::Reviewing, VersionEvent::Approve) => VersionStatus::Approved,
            (VersionStatus::Reviewing, VersionEvent::Reject) => VersionStatus::Rejected,
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state,
                    to: event.target(),
                })
            }
        };

        ensure_transition(self.current, target, self.files_ready, self.file_count)?;
        Ok(target)
    }

    /// Apply `event`, returning the new version status
    pub fn transition(&mut self, event: VersionEvent) -> StateMachineResult<VersionStatus> {
        let target = self.determine_target_state(event)?;

        debug!(
            version_id = self.version_id,
            from = %self.current,
            to = %target,
            event = event.event_type(),
            "Version state transition"
        );

        self.current = target;
        Ok(target)
    }

    /// Task status implied by the version's current status.
    ///
    /// PREPARING versions do not move the task, so this returns `None` for them.
    pub fn mirrored_task_status(&self) -> Option<TaskStatus> {
        TaskStatus::try_from(self.current).ok()
    }
}
