use super::errors::{GuardError, GuardResult, StateMachineError, StateMachineResult};
use super::states::{FilesReady, TaskStatus, VersionStatus};

/// Facts about a version that transition guards inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    pub files_ready: FilesReady,
    pub file_count: i64,
}

impl TransitionContext {
    pub fn new(files_ready: FilesReady, file_count: i64) -> Self {
        Self {
            files_ready,
            file_count,
        }
    }
}

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, subject: &T) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// The version's file set must be completely replicated
pub struct FilesReadyGuard;

impl StateGuard<TransitionContext> for FilesReadyGuard {
    fn check(&self, ctx: &TransitionContext) -> GuardResult<()> {
        if ctx.files_ready.is_ready() {
            Ok(())
        } else {
            Err(GuardError::FilesNotReady {
                files_ready: ctx.files_ready,
            })
        }
    }

    fn description(&self) -> &'static str {
        "Version files must be ready"
    }
}

/// A version can only be submitted with at least one file
pub struct HasFilesGuard;

impl StateGuard<TransitionContext> for HasFilesGuard {
    fn check(&self, ctx: &TransitionContext) -> GuardResult<()> {
        if ctx.file_count > 0 {
            Ok(())
        } else {
            Err(GuardError::NoFiles)
        }
    }

    fn description(&self) -> &'static str {
        "Version must contain at least one file"
    }
}

/// Only rejected tasks may open a new version
pub struct ResubmissionAllowedGuard;

impl StateGuard<TaskStatus> for ResubmissionAllowedGuard {
    fn check(&self, status: &TaskStatus) -> GuardResult<()> {
        match status {
            TaskStatus::Rejected => Ok(()),
            other => Err(GuardError::TaskNotRejected { status: *other }),
        }
    }

    fn description(&self) -> &'static str {
        "Task must be rejected before resubmission"
    }
}

/// Validate a version transition, returning the first violated rule.
///
/// Legal edges are PREPARING → REVIEWING (files ready and at least one file)
/// and REVIEWING → APPROVED / REJECTED (files ready). Everything else,
/// including self-transitions and any move out of a terminal state, is an
/// invalid transition.
pub fn ensure_transition(
    current: VersionStatus,
    target: VersionStatus,
    files_ready: FilesReady,
    file_count: i64,
) -> StateMachineResult<()> {
    let ctx = TransitionContext::new(files_ready, file_count);
    match (current, target) {
        (VersionStatus::Preparing, VersionStatus::Reviewing) => {
            FilesReadyGuard.check(&ctx)?;
            HasFilesGuard.check(&ctx)?;
            Ok(())
        }
        (VersionStatus::Reviewing, VersionStatus::Approved | VersionStatus::Rejected) => {
            FilesReadyGuard.check(&ctx)?;
            Ok(())
        }
        (from, to) => Err(StateMachineError::InvalidTransition { from, to }),
    }
}

/// Boolean form of [`ensure_transition`]
pub fn can_transition(
    current: VersionStatus,
    target: VersionStatus,
    files_ready: FilesReady,
    file_count: i64,
) -> bool {
    ensure_transition(current, target, files_ready, file_count).is_ok()
}

/// Validate that a task in `task_status` may start a resubmission
pub fn ensure_resubmission_allowed(task_status: TaskStatus) -> GuardResult<()> {
    ResubmissionAllowedGuard.check(&task_status)
}

pub fn can_start_resubmission(task_status: TaskStatus) -> bool {
    ensure_resubmission_allowed(task_status).is_ok()
}
