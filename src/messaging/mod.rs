//! # Message Channel
//!
//! Carries [`CopyJob`]s from the replication orchestrator to the workers.
//!
//! ```text
//! Arc<dyn CopyJobQueue>
//!   ├── RabbitMqCopyQueue   <- durable queues, publisher confirms, DLX args (feature `rabbitmq`)
//!   └── InMemoryCopyQueue   <- tests and single-process deployments
//! ```
//!
//! Delivery is at-least-once. A consumer settles each delivery after the
//! copy outcome is durable; dead-lettering is how a failed job leaves the
//! work queue.

pub mod backends;
pub mod copy_job;
pub mod errors;
pub mod queue;

use std::sync::Arc;

use tracing::info;

pub use backends::InMemoryCopyQueue;
#[cfg(feature = "rabbitmq")]
pub use backends::RabbitMqCopyQueue;
pub use copy_job::CopyJob;
pub use errors::{MessagingError, MessagingResult};
pub use queue::{CopyJobQueue, Delivery, DeliveryTag, QueueTopology, Settlement};

use crate::config::{MessagingBackendKind, MessagingConfig};

/// Open the configured backend and declare the copy queue topology
pub async fn connect(config: &MessagingConfig) -> MessagingResult<Arc<dyn CopyJobQueue>> {
    let queue: Arc<dyn CopyJobQueue> = match config.backend {
        MessagingBackendKind::InMemory => Arc::new(InMemoryCopyQueue::new()),
        MessagingBackendKind::Rabbitmq => connect_rabbitmq(config).await?,
    };

    let topology = QueueTopology::from_config(config);
    queue.declare(&topology).await?;

    info!(
        backend = queue.backend_name(),
        work_queue = %topology.work_queue,
        dead_letter_queue = %topology.dead_letter_queue,
        "📬 Copy job queue ready"
    );
    Ok(queue)
}

#[cfg(feature = "rabbitmq")]
async fn connect_rabbitmq(config: &MessagingConfig) -> MessagingResult<Arc<dyn CopyJobQueue>> {
    Ok(Arc::new(RabbitMqCopyQueue::connect(&config.rabbitmq).await?))
}

#[cfg(not(feature = "rabbitmq"))]
async fn connect_rabbitmq(_config: &MessagingConfig) -> MessagingResult<Arc<dyn CopyJobQueue>> {
    Err(MessagingError::Misconfigured(
        "rabbitmq backend selected but the rabbitmq feature is not enabled".to_string(),
    ))
}
