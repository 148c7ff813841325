use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{backend} cache unreachable: {reason}")]
    Unreachable {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} cache {operation} failed: {reason}")]
    Command {
        backend: &'static str,
        operation: &'static str,
        reason: String,
    },

    #[error("cache value could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    pub fn command(backend: &'static str, operation: &'static str, reason: impl ToString) -> Self {
        Self::Command {
            backend,
            operation,
            reason: reason.to_string(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
