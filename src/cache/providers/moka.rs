//! In-process backend built on Moka.
//!
//! Entries expire after the TTL they were written with, so jittered
//! expirations survive. State is local to the process: a deployment with
//! more than one instance needs the Redis backend for evictions to be seen
//! everywhere.

use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

use crate::cache::errors::CacheResult;
use crate::cache::traits::{CacheBackend, KeySample};
use crate::config::MokaConfig;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
    written_at: Instant,
}

impl Entry {
    fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.written_at.elapsed())
    }
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

#[derive(Clone)]
pub struct MokaBackend {
    entries: Cache<String, Entry>,
}

impl std::fmt::Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl MokaBackend {
    pub fn new(config: &MokaConfig) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(config.max_capacity)
                .expire_after(EntryTtl)
                .build(),
        }
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::new(&MokaConfig { max_capacity })
    }
}

impl CacheBackend for MokaBackend {
    async fn read(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn write(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(
                key.to_owned(),
                Entry {
                    value: value.to_owned(),
                    ttl,
                    written_at: Instant::now(),
                },
            )
            .await;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<u64> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn remove_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        self.remove(&doomed).await
    }

    async fn key_count(&self) -> CacheResult<u64> {
        self.entries.run_pending_tasks().await;
        Ok(self.entries.entry_count())
    }

    async fn sample_keys(&self, prefix: &str, limit: usize) -> CacheResult<Vec<KeySample>> {
        let mut samples: Vec<KeySample> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| KeySample {
                key: key.as_ref().clone(),
                ttl: Some(entry.remaining()),
            })
            .collect();
        samples.sort_by(|a, b| a.key.cmp(&b.key));
        samples.truncate(limit);
        Ok(samples)
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "moka"
    }
}
