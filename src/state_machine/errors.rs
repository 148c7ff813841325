use thiserror::Error;

use super::states::{FilesReady, TaskStatus, VersionStatus};

/// Why the version state machine refused an event or transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error(transparent)]
    GuardFailed(#[from] GuardError),

    #[error("no transition from {from} to {to}")]
    InvalidTransition { from: VersionStatus, to: VersionStatus },
}

/// A legal edge whose precondition does not hold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("version files are not ready: {files_ready}")]
    FilesNotReady { files_ready: FilesReady },

    #[error("version has no files")]
    NoFiles,

    #[error("resubmission requires a rejected task, task is {status}")]
    TaskNotRejected { status: TaskStatus },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;

pub type GuardResult<T> = Result<T, GuardError>;
