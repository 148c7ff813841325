//! # Cache Monitor
//!
//! Lookup hit rate of this process and a sample of the hot key families
//! (statistics snapshots and reviewer option lists) with their remaining
//! TTLs. Backend failures are reported as an error so the caller can tell an
//! empty cache from an unreachable one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheBackend, ReviewCache};
use crate::constants::cache_monitor::{SAMPLED_PREFIXES, SAMPLE_LIMIT};
use crate::error::{ReviewError, ReviewResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedKey {
    pub key: String,
    /// Whole seconds left, `None` for keys without expiry
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub key_count: u64,
    pub hot_keys: Vec<CachedKey>,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheMonitor {
    cache: ReviewCache,
}

impl CacheMonitor {
    pub fn new(cache: ReviewCache) -> Self {
        Self { cache }
    }

    pub async fn snapshot(&self) -> ReviewResult<CacheSnapshot> {
        let provider = self.cache.provider();
        let unavailable = |e: crate::cache::CacheError| {
            ReviewError::internal(format!("cache metrics unavailable: {e}"))
        };

        let key_count = provider.key_count().await.map_err(unavailable)?;
        let mut hot_keys = Vec::new();
        for prefix in SAMPLED_PREFIXES {
            let samples = provider
                .sample_keys(prefix, SAMPLE_LIMIT)
                .await
                .map_err(unavailable)?;
            hot_keys.extend(samples.into_iter().map(|sample| CachedKey {
                key: sample.key,
                ttl_seconds: sample.ttl.map(|ttl| ttl.as_secs()),
            }));
        }

        let lookups = self.cache.lookups();
        Ok(CacheSnapshot {
            backend: provider.backend_name().to_owned(),
            hits: lookups.hits,
            misses: lookups.misses,
            hit_rate: lookups.hit_rate(),
            key_count,
            hot_keys,
            taken_at: Utc::now(),
        })
    }
}
