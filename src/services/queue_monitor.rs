//! # Queue Monitor
//!
//! Depth snapshot of the copy queue and its dead-letter queue, with an alert
//! level operators can page on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MessagingConfig;
use crate::constants::backlog::{DANGER_THRESHOLD, WARNING_THRESHOLD};
use crate::error::ReviewResult;
use crate::messaging::CopyJobQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Warning,
    Danger,
}

impl AlertLevel {
    /// Level for a main-queue backlog
    pub fn for_backlog(backlog: u64) -> Self {
        if backlog > DANGER_THRESHOLD {
            Self::Danger
        } else if backlog > WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub copy_queue: String,
    pub copy_queue_depth: u64,
    pub dead_letter_queue: String,
    pub dead_letter_depth: u64,
    pub alert_level: AlertLevel,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct QueueMonitor {
    messaging: Arc<dyn CopyJobQueue>,
    copy_queue: String,
    dead_letter_queue: String,
}

impl QueueMonitor {
    pub fn new(messaging: Arc<dyn CopyJobQueue>, config: &MessagingConfig) -> Self {
        Self {
            messaging,
            copy_queue: config.copy_queue.clone(),
            dead_letter_queue: config.dead_letter_queue.clone(),
        }
    }

    /// Current depths and alert level.
    ///
    /// Any dead-lettered job raises the level to at least warning: each one
    /// is a version sitting in the failed state.
    pub async fn snapshot(&self) -> ReviewResult<QueueSnapshot> {
        let copy_queue_depth = self.messaging.depth(&self.copy_queue).await?;
        let dead_letter_depth = self.messaging.depth(&self.dead_letter_queue).await?;

        let mut alert_level = AlertLevel::for_backlog(copy_queue_depth);
        if dead_letter_depth > 0 {
            alert_level = alert_level.max(AlertLevel::Warning);
        }

        if alert_level != AlertLevel::Normal {
            warn!(
                copy_queue_depth = copy_queue_depth,
                dead_letter_depth = dead_letter_depth,
                alert_level = ?alert_level,
                "📈 Copy queue backlog above normal"
            );
        }

        Ok(QueueSnapshot {
            copy_queue: self.copy_queue.clone(),
            copy_queue_depth,
            dead_letter_queue: self.dead_letter_queue.clone(),
            dead_letter_depth,
            alert_level,
            taken_at: Utc::now(),
        })
    }
}
