//! Queue contract for copy jobs

use std::time::Duration;

use async_trait::async_trait;

use super::copy_job::CopyJob;
use super::errors::MessagingResult;
use crate::config::MessagingConfig;

/// Broker-assigned handle for settling one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTag(pub u64);

impl std::fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub job: CopyJob,
    /// 1 on first delivery. RabbitMQ only reports "redelivered", which
    /// shows up here as 2.
    pub attempt: u32,
}

impl Delivery {
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// How a consumer finished with a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Outcome recorded; drop the message
    Completed,
    /// Route the message to the dead-letter queue
    DeadLetter,
}

/// Work queue plus the queue its rejected messages are routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTopology {
    pub work_queue: String,
    pub dead_letter_queue: String,
}

impl QueueTopology {
    pub fn new(work_queue: impl Into<String>, dead_letter_queue: impl Into<String>) -> Self {
        Self {
            work_queue: work_queue.into(),
            dead_letter_queue: dead_letter_queue.into(),
        }
    }

    pub fn from_config(config: &MessagingConfig) -> Self {
        Self::new(config.copy_queue.clone(), config.dead_letter_queue.clone())
    }
}

#[async_trait]
pub trait CopyJobQueue: Send + Sync + std::fmt::Debug {
    /// Create both queues if missing; safe to repeat
    async fn declare(&self, topology: &QueueTopology) -> MessagingResult<()>;

    /// Returns once the broker has durably accepted the job
    async fn publish(&self, queue: &str, job: &CopyJob) -> MessagingResult<()>;

    /// Take up to `max` deliveries. They stay hidden from other consumers
    /// for `lease` or until settled. Payloads that do not decode are
    /// dead-lettered here and never returned.
    async fn fetch(&self, queue: &str, max: usize, lease: Duration)
        -> MessagingResult<Vec<Delivery>>;

    async fn settle(
        &self,
        queue: &str,
        tag: DeliveryTag,
        settlement: Settlement,
    ) -> MessagingResult<()>;

    /// Messages in the queue, leased or not
    async fn depth(&self, queue: &str) -> MessagingResult<u64>;

    async fn is_healthy(&self) -> bool;

    fn backend_name(&self) -> &'static str;
}
