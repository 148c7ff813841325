//! # Replication Worker
//!
//! Consumes copy jobs and replicates file metadata onto PREPARING versions.
//!
//! - [`CopyWorker`] - executes one job against the store, idempotently
//! - [`CopyJobConsumer`] - polling loop with bounded parallelism and
//!   ack-after-durable semantics

pub mod consumer;
pub mod copy_worker;

pub use consumer::{BatchOutcome, ConsumerStats, CopyJobConsumer};
pub use copy_worker::CopyWorker;
