use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("{backend} broker unavailable: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("queue {0} has not been declared")]
    UnknownQueue(String),

    #[error("publish to {queue} failed: {reason}")]
    Publish { queue: String, reason: String },

    #[error("fetch from {queue} failed: {reason}")]
    Fetch { queue: String, reason: String },

    #[error("settling delivery {tag} on {queue} failed: {reason}")]
    Settle {
        queue: String,
        tag: u64,
        reason: String,
    },

    #[error("delivery {tag} is not outstanding on {queue}")]
    UnknownDelivery { queue: String, tag: u64 },

    #[error("copy job payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("messaging misconfigured: {0}")]
    Misconfigured(String),
}

impl MessagingError {
    pub fn publish(queue: &str, reason: impl ToString) -> Self {
        Self::Publish {
            queue: queue.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(queue: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            queue: queue.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn settle(queue: &str, tag: u64, reason: impl ToString) -> Self {
        Self::Settle {
            queue: queue.to_string(),
            tag,
            reason: reason.to_string(),
        }
    }

    /// Broker and transport trouble can clear up; bad payloads and unknown
    /// queues cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Publish { .. } | Self::Fetch { .. } | Self::Settle { .. }
        )
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
