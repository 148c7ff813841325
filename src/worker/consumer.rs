//! # Copy Job Consumer
//!
//! Polling loop over the copy queue. Each received batch is executed in
//! parallel, bounded by a semaphore sized from `worker.max_concurrent_jobs`.
//!
//! Messages are acked only after [`CopyWorker::execute_copy`] has written its
//! outcome. A failed job is nacked without requeue so the broker routes it to
//! the dead-letter queue; the version itself already carries
//! `files_ready = -1` at that point.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::copy_worker::CopyWorker;
use crate::config::WorkerConfig;
use crate::error::{ReviewError, ReviewResult};
use crate::messaging::{CopyJobQueue, Delivery, Settlement};

/// Counters exposed for health reporting
#[derive(Debug, Default)]
struct ConsumerCounters {
    received: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    ack_errors: AtomicU64,
}

/// Point-in-time copy of the consumer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub ack_errors: u64,
}

/// Result of one receive-and-execute round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct CopyJobConsumer {
    messaging: Arc<dyn CopyJobQueue>,
    worker: CopyWorker,
    queue_name: String,
    config: WorkerConfig,
    permits: Arc<Semaphore>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    counters: Arc<ConsumerCounters>,
}

impl CopyJobConsumer {
    pub fn new(
        messaging: Arc<dyn CopyJobQueue>,
        worker: CopyWorker,
        queue_name: impl Into<String>,
        config: WorkerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            messaging,
            worker,
            queue_name: queue_name.into(),
            config,
            permits,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            counters: Arc::new(ConsumerCounters::default()),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            received: self.counters.received.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            ack_errors: self.counters.ack_errors.load(Ordering::Relaxed),
        }
    }

    /// Spawn the polling loop
    pub fn start(&self) -> ReviewResult<JoinHandle<()>> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ReviewError::invalid_state("copy job consumer is already running"));
        }

        info!(
            queue = %self.queue_name,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            batch_size = self.config.batch_size,
            "🚀 Copy job consumer starting"
        );

        let consumer = self.clone();
        Ok(tokio::spawn(async move { consumer.run().await }))
    }

    /// Ask the loop to exit after its current batch
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!(queue = %self.queue_name, "🛑 Copy job consumer stopping");
        }
        self.shutdown.notify_waiters();
    }

    async fn run(&self) {
        while self.is_running() {
            let idle = match self.process_batch_once().await {
                Ok(outcome) => outcome.received == 0,
                Err(e) => {
                    error!(queue = %self.queue_name, error = %e, "Copy queue poll failed");
                    true
                }
            };

            if idle {
                self.pause(self.config.poll_interval()).await;
            }
        }

        let stats = self.stats();
        info!(
            queue = %self.queue_name,
            received = stats.received,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Copy job consumer stopped"
        );
    }

    async fn pause(&self, period: Duration) {
        tokio::select! {
            _ = self.shutdown.notified() => {}
            _ = tokio::time::sleep(period) => {}
        }
    }

    /// Receive one batch and execute it to completion
    pub async fn process_batch_once(&self) -> ReviewResult<BatchOutcome> {
        let messages = self
            .messaging
            .fetch(
                &self.queue_name,
                self.config.batch_size.max(1),
                self.config.visibility_timeout(),
            )
            .await?;

        let mut outcome = BatchOutcome {
            received: messages.len(),
            ..BatchOutcome::default()
        };
        if messages.is_empty() {
            return Ok(outcome);
        }

        debug!(queue = %self.queue_name, count = messages.len(), "Received copy jobs");
        self.counters
            .received
            .fetch_add(messages.len() as u64, Ordering::Relaxed);

        let mut jobs = JoinSet::new();
        for message in messages {
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ReviewError::internal(format!("worker semaphore closed: {e}")))?;
            let consumer = self.clone();
            jobs.spawn(async move {
                let ok = consumer.handle_message(message).await;
                drop(permit);
                ok
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(true) => outcome.succeeded += 1,
                Ok(false) => outcome.failed += 1,
                Err(e) => {
                    error!(error = %e, "Copy job task panicked");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn handle_message(&self, message: Delivery) -> bool {
        let job = &message.job;
        if message.is_redelivery() {
            debug!(
                trace_id = %job.trace_id,
                attempt = message.attempt,
                "Redelivered copy job"
            );
        }

        match self.worker.execute_copy(job).await {
            Ok(_) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = self
                    .messaging
                    .settle(&self.queue_name, message.tag, Settlement::Completed)
                    .await
                {
                    // Redelivery is harmless: the copy is idempotent
                    self.counters.ack_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(trace_id = %job.trace_id, error = %e, "Failed to ack copy job");
                }
                true
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    trace_id = %job.trace_id,
                    version_id = job.new_version_id,
                    error = %err,
                    "Dead-lettering failed copy job"
                );
                if let Err(e) = self
                    .messaging
                    .settle(&self.queue_name, message.tag, Settlement::DeadLetter)
                    .await
                {
                    self.counters.ack_errors.fetch_add(1, Ordering::Relaxed);
                    error!(trace_id = %job.trace_id, error = %e, "Failed to dead-letter copy job");
                }
                false
            }
        }
    }
}
