//! Shared harness for integration tests.
//!
//! Wires a [`SystemContext`] over the in-memory store, in-memory messaging
//! and a Moka cache, so every test runs without external services.

#![allow(dead_code)]


use std::sync::Arc;

use review_core::cache::{CacheProvider, ReviewCache};
use review_core::config::{DispatchMode, ReviewConfig};
use review_core::database::InMemoryReviewStore;
use review_core::messaging::{CopyJobQueue, InMemoryCopyQueue, QueueTopology};
use review_core::services::InMemoryReviewerDirectory;
use review_core::worker::BatchOutcome;
use review_core::{ConfigManager, SystemContext};

pub use fixtures::*;

pub struct TestHarness {
    pub context: SystemContext,
    pub store: Arc<InMemoryReviewStore>,
    pub queues: Arc<InMemoryCopyQueue>,
    pub directory: Arc<InMemoryReviewerDirectory>,
    pub config: ReviewConfig,
}

impl TestHarness {
    /// Queue dispatch, Moka cache
    pub async fn new() -> Self {
        Self::with_config(ReviewConfig::default()).await
    }

    pub async fn with_dispatch_mode(mode: DispatchMode) -> Self {
        let mut config = ReviewConfig::default();
        config.replication.dispatch_mode = mode;
        Self::with_config(config).await
    }

    pub async fn with_config(config: ReviewConfig) -> Self {
        let config_manager =
            ConfigManager::from_config(config.clone()).expect("test config should validate");

        let store = Arc::new(InMemoryReviewStore::new());
        let queues = Arc::new(InMemoryCopyQueue::new());
        queues
            .declare(&QueueTopology::from_config(&config.messaging))
            .await
            .expect("queues should be declared");

        let cache = ReviewCache::new(Arc::new(CacheProvider::moka(1_000)), &config.cache);
        let directory = Arc::new(seeded_directory());

        let context = SystemContext::with_components(
            config_manager,
            store.clone(),
            queues.clone(),
            cache,
            directory.clone(),
        );

        Self {
            context,
            store,
            queues,
            directory,
            config,
        }
    }

    pub fn copy_queue(&self) -> &str {
        &self.config.messaging.copy_queue
    }

    pub fn dead_letter_queue(&self) -> &str {
        &self.config.messaging.dead_letter_queue
    }

    pub async fn copy_queue_len(&self) -> usize {
        self.queues.len(self.copy_queue())
    }

    pub async fn dead_letter_len(&self) -> usize {
        self.queues.len(self.dead_letter_queue())
    }

    /// Drain one batch of copy jobs through a worker
    pub async fn run_worker_once(&self) -> BatchOutcome {
        self.context
            .copy_job_consumer()
            .process_batch_once()
            .await
            .expect("copy queue should be readable")
    }
}
