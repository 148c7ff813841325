//! Process-local copy queue.
//!
//! Leases, dead-letter routing and redelivery counting behave like the
//! broker-backed queue, so tests exercise the same consumer paths. Extra
//! inspection and fault hooks are exposed for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::messaging::copy_job::CopyJob;
use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::queue::{CopyJobQueue, Delivery, DeliveryTag, QueueTopology, Settlement};

#[derive(Debug)]
struct Stored {
    tag: u64,
    payload: Vec<u8>,
    leased_until: Option<Instant>,
    attempts: u32,
}

impl Stored {
    fn is_available(&self, now: Instant) -> bool {
        self.leased_until.map_or(true, |until| until <= now)
    }
}

#[derive(Debug, Default)]
struct Lane {
    messages: VecDeque<Stored>,
    dead_letter_queue: Option<String>,
}

impl Lane {
    fn remove(&mut self, tag: u64) -> Option<Stored> {
        let index = self.messages.iter().position(|m| m.tag == tag)?;
        self.messages.remove(index)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCopyQueue {
    lanes: Mutex<HashMap<String, Lane>>,
    next_tag: AtomicU64,
    failing_publishes: AtomicU32,
}

impl InMemoryCopyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` publishes fail like an unreachable broker
    pub fn fail_next_publishes(&self, times: u32) {
        self.failing_publishes.store(times, Ordering::SeqCst);
    }

    pub fn len(&self, queue: &str) -> usize {
        self.lanes
            .lock()
            .get(queue)
            .map_or(0, |lane| lane.messages.len())
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Decoded jobs in queue order, without leasing them
    pub fn jobs(&self, queue: &str) -> MessagingResult<Vec<CopyJob>> {
        let lanes = self.lanes.lock();
        let lane = lanes
            .get(queue)
            .ok_or_else(|| MessagingError::UnknownQueue(queue.to_string()))?;
        lane.messages
            .iter()
            .map(|m| CopyJob::decode(&m.payload))
            .collect()
    }

    pub fn purge(&self, queue: &str) {
        if let Some(lane) = self.lanes.lock().get_mut(queue) {
            lane.messages.clear();
        }
    }

    /// Enqueue bytes as-is, bypassing encoding
    pub fn push_raw(&self, queue: &str, payload: Vec<u8>) -> MessagingResult<()> {
        let mut lanes = self.lanes.lock();
        let lane = lanes
            .get_mut(queue)
            .ok_or_else(|| MessagingError::UnknownQueue(queue.to_string()))?;
        lane.messages.push_back(self.stored(payload));
        Ok(())
    }

    fn stored(&self, payload: Vec<u8>) -> Stored {
        Stored {
            tag: self.next_tag.fetch_add(1, Ordering::Relaxed) + 1,
            payload,
            leased_until: None,
            attempts: 0,
        }
    }

    fn publish_should_fail(&self) -> bool {
        self.failing_publishes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Move a message to its lane's dead-letter queue, or drop it when the
    /// lane has none
    fn route_dead(lanes: &mut HashMap<String, Lane>, queue: &str, message: Stored) {
        let target = lanes.get(queue).and_then(|l| l.dead_letter_queue.clone());
        match target.and_then(|name| lanes.get_mut(&name)) {
            Some(dead) => dead.messages.push_back(Stored {
                leased_until: None,
                attempts: 0,
                ..message
            }),
            None => debug!(queue = queue, tag = message.tag, "No dead-letter queue, message dropped"),
        }
    }
}

#[async_trait]
impl CopyJobQueue for InMemoryCopyQueue {
    async fn declare(&self, topology: &QueueTopology) -> MessagingResult<()> {
        let mut lanes = self.lanes.lock();
        lanes.entry(topology.dead_letter_queue.clone()).or_default();
        lanes
            .entry(topology.work_queue.clone())
            .or_default()
            .dead_letter_queue = Some(topology.dead_letter_queue.clone());
        Ok(())
    }

    async fn publish(&self, queue: &str, job: &CopyJob) -> MessagingResult<()> {
        let payload = job.encode()?;
        if self.publish_should_fail() {
            return Err(MessagingError::publish(queue, "injected broker outage"));
        }
        self.push_raw(queue, payload)
    }

    async fn fetch(
        &self,
        queue: &str,
        max: usize,
        lease: Duration,
    ) -> MessagingResult<Vec<Delivery>> {
        let mut lanes = self.lanes.lock();
        let now = Instant::now();
        let lane = lanes
            .get_mut(queue)
            .ok_or_else(|| MessagingError::UnknownQueue(queue.to_string()))?;

        let mut deliveries = Vec::new();
        let mut malformed = Vec::new();
        for message in lane.messages.iter_mut().filter(|m| m.is_available(now)) {
            if deliveries.len() >= max {
                break;
            }
            match CopyJob::decode(&message.payload) {
                Ok(job) => {
                    message.leased_until = Some(now + lease);
                    message.attempts += 1;
                    deliveries.push(Delivery {
                        tag: DeliveryTag(message.tag),
                        job,
                        attempt: message.attempts,
                    });
                }
                Err(e) => {
                    warn!(queue = queue, tag = message.tag, error = %e, "Dead-lettering undecodable copy job");
                    malformed.push(message.tag);
                }
            }
        }

        let dead: Vec<Stored> = malformed
            .into_iter()
            .filter_map(|tag| lane.remove(tag))
            .collect();
        for message in dead {
            Self::route_dead(&mut lanes, queue, message);
        }
        Ok(deliveries)
    }

    async fn settle(
        &self,
        queue: &str,
        tag: DeliveryTag,
        settlement: Settlement,
    ) -> MessagingResult<()> {
        let mut lanes = self.lanes.lock();
        let message = lanes
            .get_mut(queue)
            .ok_or_else(|| MessagingError::UnknownQueue(queue.to_string()))?
            .remove(tag.0)
            .ok_or_else(|| MessagingError::UnknownDelivery {
                queue: queue.to_string(),
                tag: tag.0,
            })?;

        if settlement == Settlement::DeadLetter {
            Self::route_dead(&mut lanes, queue, message);
        }
        Ok(())
    }

    async fn depth(&self, queue: &str) -> MessagingResult<u64> {
        let lanes = self.lanes.lock();
        lanes
            .get(queue)
            .map(|lane| lane.messages.len() as u64)
            .ok_or_else(|| MessagingError::UnknownQueue(queue.to_string()))
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
