//! # Store Error Types

use thiserror::Error;

/// Errors raised by [`super::ReviewStore`] implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend unreachable or refused the operation; retry may succeed
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// A unique constraint rejected the write
    #[error("Constraint violation on {constraint}: {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// A stored value could not be mapped onto the domain types
    #[error("Corrupt {entity} row {id}: {message}")]
    CorruptRow {
        entity: String,
        id: i64,
        message: String,
    },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn constraint_violation(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_row(entity: impl Into<String>, id: i64, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            entity: entity.into(),
            id,
            message: message.into(),
        }
    }

    /// True for failures a retry can plausibly clear
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            Self::ConstraintViolation { .. } | Self::CorruptRow { .. } => false,
        }
    }

    /// Name of the violated unique constraint, if this is a unique violation
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation { constraint, .. } => Some(constraint),
            Self::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                db.constraint()
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
