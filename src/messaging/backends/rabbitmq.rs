//! RabbitMQ copy queue over `lapin` (feature `rabbitmq`).
//!
//! Both queues are durable and jobs are published persistent with publisher
//! confirms. The work queue carries `x-dead-letter-*` arguments pointing at
//! the dead-letter queue through the default exchange, so a nack without
//! requeue is all a consumer does to dead-letter a job. When an exchange is
//! configured the queues are also bound to it for producers that route by
//! exchange.

use std::time::Duration;

use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{info, warn};

use crate::config::loader::redact_url;
use crate::config::RabbitmqConfig;
use crate::messaging::copy_job::CopyJob;
use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::queue::{CopyJobQueue, Delivery, DeliveryTag, QueueTopology, Settlement};

const NAME: &str = "rabbitmq";
const PERSISTENT: u8 = 2;

#[derive(Debug)]
pub struct RabbitMqCopyQueue {
    connection: Connection,
    channel: Channel,
    config: RabbitmqConfig,
}

impl RabbitMqCopyQueue {
    pub async fn connect(config: &RabbitmqConfig) -> MessagingResult<Self> {
        let unavailable = |e: lapin::Error| MessagingError::Unavailable {
            backend: NAME,
            reason: e.to_string(),
        };

        let connection = Connection::connect(
            &config.url,
            ConnectionProperties::default().with_connection_name("review-core".into()),
        )
        .await
        .map_err(unavailable)?;
        let channel = connection.create_channel().await.map_err(unavailable)?;
        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(unavailable)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(unavailable)?;

        info!(
            url = %redact_url(&config.url),
            prefetch_count = config.prefetch_count,
            "🐇 RabbitMQ connected"
        );
        Ok(Self {
            connection,
            channel,
            config: config.clone(),
        })
    }

    async fn declare_durable(&self, queue: &str, arguments: FieldTable) -> MessagingResult<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                arguments,
            )
            .await
            .map_err(|e| MessagingError::Misconfigured(format!("declaring {queue}: {e}")))?;
        Ok(())
    }

    async fn bind(&self, queue: &str, routing_key: &str) -> MessagingResult<()> {
        let exchange = self.config.exchange.as_str();
        if exchange.is_empty() || routing_key.is_empty() {
            return Ok(());
        }
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::Misconfigured(format!("declaring {exchange}: {e}")))?;
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::Misconfigured(format!("binding {queue} to {exchange}: {e}")))
    }

    async fn reject(&self, queue: &str, tag: u64) -> MessagingResult<()> {
        self.channel
            .basic_nack(
                tag,
                BasicNackOptions {
                    requeue: false,
                    ..BasicNackOptions::default()
                },
            )
            .await
            .map_err(|e| MessagingError::settle(queue, tag, e))
    }
}

#[async_trait]
impl CopyJobQueue for RabbitMqCopyQueue {
    async fn declare(&self, topology: &QueueTopology) -> MessagingResult<()> {
        self.declare_durable(&topology.dead_letter_queue, FieldTable::default())
            .await?;
        self.bind(&topology.dead_letter_queue, &self.config.dead_letter_routing_key)
            .await?;

        let mut arguments = FieldTable::default();
        arguments.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString("".into()),
        );
        arguments.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(topology.dead_letter_queue.as_str().into()),
        );
        self.declare_durable(&topology.work_queue, arguments).await?;
        self.bind(&topology.work_queue, &self.config.routing_key)
            .await
    }

    async fn publish(&self, queue: &str, job: &CopyJob) -> MessagingResult<()> {
        let payload = job.encode()?;
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into())
            .with_correlation_id(job.trace_id.as_str().into());

        let confirm = self
            .channel
            .basic_publish("", queue, BasicPublishOptions::default(), &payload, properties)
            .await
            .map_err(|e| MessagingError::publish(queue, e))?
            .await
            .map_err(|e| MessagingError::publish(queue, e))?;

        if confirm.is_nack() {
            return Err(MessagingError::publish(queue, "broker refused the job"));
        }
        Ok(())
    }

    /// `lease` is enforced by the broker: unacked deliveries return to the
    /// queue when the channel closes.
    async fn fetch(
        &self,
        queue: &str,
        max: usize,
        _lease: Duration,
    ) -> MessagingResult<Vec<Delivery>> {
        let mut deliveries = Vec::with_capacity(max);

        while deliveries.len() < max {
            let Some(message) = self
                .channel
                .basic_get(queue, BasicGetOptions { no_ack: false })
                .await
                .map_err(|e| MessagingError::fetch(queue, e))?
            else {
                break;
            };

            let tag = message.delivery.delivery_tag;
            match CopyJob::decode(&message.delivery.data) {
                Ok(job) => deliveries.push(Delivery {
                    tag: DeliveryTag(tag),
                    job,
                    attempt: if message.delivery.redelivered { 2 } else { 1 },
                }),
                Err(e) => {
                    warn!(queue = queue, tag = tag, error = %e, "Dead-lettering undecodable copy job");
                    self.reject(queue, tag).await?;
                }
            }
        }
        Ok(deliveries)
    }

    async fn settle(
        &self,
        queue: &str,
        tag: DeliveryTag,
        settlement: Settlement,
    ) -> MessagingResult<()> {
        match settlement {
            Settlement::Completed => self
                .channel
                .basic_ack(tag.0, BasicAckOptions::default())
                .await
                .map_err(|e| MessagingError::settle(queue, tag.0, e)),
            Settlement::DeadLetter => self.reject(queue, tag.0).await,
        }
    }

    async fn depth(&self, queue: &str) -> MessagingResult<u64> {
        let declared = self
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::fetch(queue, e))?;
        Ok(u64::from(declared.message_count()))
    }

    async fn is_healthy(&self) -> bool {
        self.connection.status().connected()
    }

    fn backend_name(&self) -> &'static str {
        NAME
    }
}
