//! # Review Core Errors
//!
//! One error type for every upstream-facing operation. Each variant maps to a
//! stable [`ReviewError::code`] and an [`ErrorKind`] that tells callers
//! whether a retry can help.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::messaging::MessagingError;
use crate::state_machine::{FilesReady, GuardError, StateMachineError};

/// Retry classification for [`ReviewError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong state, wrong role, not found or bad input. Never retried.
    Precondition,
    /// Broker or datastore hiccup. Safe to retry.
    Transient,
    /// Retrying the same input will fail again.
    Unrecoverable,
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: i64 },

    #[error("Version not found: {version_id}")]
    VersionNotFound { version_id: i64 },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Version {version_id} has already been reviewed")]
    AlreadyReviewed { version_id: i64 },

    #[error("Files for version {version_id} are still copying")]
    FilesCopying { version_id: i64 },

    #[error("File copy failed for version {version_id}")]
    FilesCopyFailed { version_id: i64 },

    #[error("Version {version_id} has no files")]
    NoFiles { version_id: i64 },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Task name already exists: {name}")]
    DuplicateTaskName { name: String },

    #[error("Copy job dispatch failed for version {version_id}: {message}")]
    DispatchFailed { version_id: i64, message: String },

    #[error("Copy job failed for version {version_id}: {reason}")]
    CopyFailed { version_id: i64, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Translate a state machine rejection for `version_id` into the
    /// caller-facing error with a stable code.
    pub fn from_transition(version_id: i64, err: StateMachineError) -> Self {
        match err {
            StateMachineError::GuardFailed(GuardError::FilesNotReady { files_ready }) => {
                Self::files_not_ready(version_id, files_ready)
            }
            StateMachineError::GuardFailed(GuardError::NoFiles) => Self::NoFiles { version_id },
            StateMachineError::GuardFailed(other) => Self::invalid_state(other.to_string()),
            StateMachineError::InvalidTransition { from, to } => {
                Self::invalid_state(format!("version {version_id} cannot move from {from} to {to}"))
            }
        }
    }

    /// Error describing a version whose files are not ready
    pub fn files_not_ready(version_id: i64, files_ready: FilesReady) -> Self {
        match files_ready {
            FilesReady::Failed => Self::FilesCopyFailed { version_id },
            FilesReady::Copying | FilesReady::Ready => Self::FilesCopying { version_id },
        }
    }

    /// Stable machine-readable code for upstream callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::TaskNotFound { .. } => "TASK_NOT_FOUND",
            Self::VersionNotFound { .. } => "VERSION_NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::AlreadyReviewed { .. } => "ALREADY_REVIEWED",
            Self::FilesCopying { .. } => "FILES_COPYING",
            Self::FilesCopyFailed { .. } => "FILES_COPY_FAILED",
            Self::NoFiles { .. } => "NO_FILES",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::DuplicateTaskName { .. } => "DUPLICATE_TASK_NAME",
            Self::DispatchFailed { .. } => "DISPATCH_FAILED",
            Self::CopyFailed { .. } => "COPY_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Messaging(_) => "MESSAGING_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::Forbidden { .. }
            | Self::InvalidState { .. }
            | Self::AlreadyReviewed { .. }
            | Self::FilesCopying { .. }
            | Self::FilesCopyFailed { .. }
            | Self::NoFiles { .. }
            | Self::Validation { .. }
            | Self::DuplicateTaskName { .. } => ErrorKind::Precondition,
            Self::DispatchFailed { .. } | Self::Messaging(_) => ErrorKind::Transient,
            Self::Storage(e) if e.is_transient() => ErrorKind::Transient,
            Self::Storage(_)
            | Self::CopyFailed { .. }
            | Self::Configuration(_)
            | Self::Internal(_) => ErrorKind::Unrecoverable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Result type for review core operations
pub type ReviewResult<T> = Result<T, ReviewError>;
