//! # Review Cache
//!
//! Typed, best-effort access to the cache families used by the services:
//! statistics snapshots, reviewer option lists and miss sentinels.
//!
//! Nothing here returns an error. A failing backend is logged and treated as
//! a miss, and a failed eviction never undoes the write that triggered it.
//!
//! Statistics fills are generation checked. Every eviction of a statistics
//! key bumps its generation before deleting, and a fill writes only if the
//! generation it read before counting is still current after the write.
//! A snapshot counted before a mutation therefore never outlives the
//! mutation's eviction. Shared backends also get a delayed second eviction
//! for fills running in other processes.
//!
//! Value lookups are counted per process for the cache monitor. Miss
//! sentinel reads are not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::keys;
use super::provider::CacheProvider;
use super::traits::CacheBackend;
use crate::config::CacheConfig;
use crate::constants::{cache_keys::MISS_MARKER, ttl};
use crate::models::{ReviewerOption, TaskStatistics};

/// Apply a symmetric random jitter of `ratio * nominal` and clamp to
/// [`ttl::MINIMUM`]
pub fn jittered_ttl(nominal: Duration, ratio: f64) -> Duration {
    jittered_ttl_with(nominal, ratio, &mut rand::thread_rng())
}

pub fn jittered_ttl_with<R: Rng + ?Sized>(nominal: Duration, ratio: f64, rng: &mut R) -> Duration {
    let ratio = ratio.clamp(0.0, 1.0);
    let factor = if ratio > 0.0 {
        rng.gen_range(1.0 - ratio..=1.0 + ratio)
    } else {
        1.0
    };
    nominal.mul_f64(factor).max(ttl::MINIMUM)
}

/// Hit and miss totals of value lookups since startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLookups {
    pub hits: u64,
    pub misses: u64,
}

impl CacheLookups {
    /// 1.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct LookupCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct ReviewCache {
    provider: Arc<CacheProvider>,
    statistics_ttl: Duration,
    reviewer_options_ttl: Duration,
    miss_ttl: Duration,
    jitter_ratio: f64,
    generations: Arc<DashMap<String, u64>>,
    lookups: Arc<LookupCounters>,
}

impl ReviewCache {
    pub fn new(provider: Arc<CacheProvider>, config: &CacheConfig) -> Self {
        Self {
            provider,
            statistics_ttl: config.statistics_ttl(),
            reviewer_options_ttl: config.reviewer_options_ttl(),
            miss_ttl: config.miss_ttl(),
            jitter_ratio: config.jitter_ratio,
            generations: Arc::new(DashMap::new()),
            lookups: Arc::new(LookupCounters::default()),
        }
    }

    /// Always-miss cache
    pub fn disabled() -> Self {
        Self::new(Arc::new(CacheProvider::disabled()), &CacheConfig::default())
    }

    pub fn provider(&self) -> &CacheProvider {
        &self.provider
    }

    pub fn lookups(&self) -> CacheLookups {
        CacheLookups {
            hits: self.lookups.hits.load(Ordering::Relaxed),
            misses: self.lookups.misses.load(Ordering::Relaxed),
        }
    }

    fn record_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.lookups.hits
        } else {
            &self.lookups.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and decode a JSON value; undecodable entries are dropped
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.provider.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.record_lookup(false);
                return None;
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed, treating as miss");
                self.record_lookup(false);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.record_lookup(true);
                Some(value)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Discarding undecodable cache entry");
                self.record_lookup(false);
                self.evict(&[key.to_owned()]).await;
                None
            }
        }
    }

    /// Encode and write a JSON value with jittered TTL
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, nominal_ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key, error = %e, "Cache value serialization failed");
                return;
            }
        };
        let ttl = jittered_ttl(nominal_ttl, self.jitter_ratio);
        if let Err(e) = self.provider.write(key, &raw, ttl).await {
            warn!(key = key, error = %e, "Cache write failed");
        }
    }

    pub async fn evict(&self, keys: &[String]) -> u64 {
        match self.provider.remove(keys).await {
            Ok(count) => count,
            Err(e) => {
                warn!(keys = ?keys, error = %e, "Cache eviction failed");
                0
            }
        }
    }

    pub async fn evict_prefix(&self, prefix: &str) -> u64 {
        match self.provider.remove_prefix(prefix).await {
            Ok(count) => count,
            Err(e) => {
                warn!(prefix = prefix, error = %e, "Cache prefix eviction failed");
                0
            }
        }
    }

    pub async fn statistics(&self, key: &str) -> Option<TaskStatistics> {
        self.get_json(key).await
    }

    /// Current generation of a statistics key
    pub fn statistics_generation(&self, key: &str) -> u64 {
        *self.generations.entry(key.to_owned()).or_insert(0)
    }

    /// Cache a snapshot counted while `generation` was current.
    ///
    /// Returns false, leaving nothing cached, when the key was evicted since.
    pub async fn store_statistics(
        &self,
        key: &str,
        statistics: &TaskStatistics,
        generation: u64,
    ) -> bool {
        if self.statistics_generation(key) != generation {
            return false;
        }
        self.put_json(key, statistics, self.statistics_ttl).await;
        if self.statistics_generation(key) != generation {
            self.evict(&[key.to_owned()]).await;
            return false;
        }
        true
    }

    /// Drop the creator's and reviewer's statistics snapshots
    pub async fn evict_statistics(&self, tenant_id: i64, creator_id: i64, reviewer_id: i64) {
        let stat_keys = [
            keys::user_statistics(tenant_id, creator_id),
            keys::reviewer_statistics(tenant_id, reviewer_id),
        ];
        for key in &stat_keys {
            *self.generations.entry(key.clone()).or_insert(0) += 1;
        }
        self.evict(&stat_keys).await;
        debug!(
            tenant_id = tenant_id,
            creator_id = creator_id,
            reviewer_id = reviewer_id,
            "Statistics cache evicted"
        );

        if self.provider.shares_state() {
            let provider = Arc::clone(&self.provider);
            tokio::spawn(async move {
                tokio::time::sleep(ttl::SECOND_EVICTION_DELAY).await;
                if let Err(e) = provider.remove(&stat_keys).await {
                    warn!(keys = ?stat_keys, error = %e, "Second statistics eviction failed");
                }
            });
        }
    }

    /// Drop every statistics snapshot of a tenant
    pub async fn evict_tenant_statistics(&self, tenant_id: i64) -> u64 {
        let prefixes = keys::tenant_statistics_prefixes(tenant_id);
        for mut entry in self.generations.iter_mut() {
            if prefixes.iter().any(|p| entry.key().starts_with(p.as_str())) {
                *entry.value_mut() += 1;
            }
        }

        let mut deleted = 0;
        for prefix in &prefixes {
            deleted += self.evict_prefix(prefix).await;
        }
        deleted
    }

    pub async fn reviewer_options(&self, tenant_id: i64) -> Option<Vec<ReviewerOption>> {
        self.get_json(&keys::reviewer_options(tenant_id)).await
    }

    pub async fn store_reviewer_options(&self, tenant_id: i64, options: &[ReviewerOption]) {
        self.put_json(
            &keys::reviewer_options(tenant_id),
            options,
            self.reviewer_options_ttl,
        )
        .await;
    }

    pub async fn evict_reviewer_options(&self, tenant_id: i64) {
        self.evict(&[keys::reviewer_options(tenant_id)]).await;
    }

    pub async fn is_task_missing(&self, task_id: i64) -> bool {
        self.is_miss_marked(&keys::task_miss(task_id)).await
    }

    pub async fn mark_task_missing(&self, task_id: i64) {
        self.mark_miss(&keys::task_miss(task_id)).await;
    }

    pub async fn is_version_missing(&self, version_id: i64) -> bool {
        self.is_miss_marked(&keys::version_miss(version_id)).await
    }

    pub async fn mark_version_missing(&self, version_id: i64) {
        self.mark_miss(&keys::version_miss(version_id)).await;
    }

    /// Remove a sentinel for an id that now exists
    pub async fn clear_version_missing(&self, version_id: i64) {
        self.evict(&[keys::version_miss(version_id)]).await;
    }

    async fn is_miss_marked(&self, key: &str) -> bool {
        match self.provider.read(key).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(key = key, error = %e, "Miss sentinel read failed");
                false
            }
        }
    }

    async fn mark_miss(&self, key: &str) {
        let ttl = jittered_ttl(self.miss_ttl, self.jitter_ratio);
        if let Err(e) = self.provider.write(key, MISS_MARKER, ttl).await {
            warn!(key = key, error = %e, "Miss sentinel write failed");
        }
    }
}
