//! Backend contract for the cache consistency layer

use std::future::Future;
use std::time::Duration;

use super::errors::CacheResult;

/// A live key and its remaining time to live, if it expires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySample {
    pub key: String,
    pub ttl: Option<Duration>,
}

/// Raw string storage with per-entry expiry.
///
/// Values are opaque to the backend; [`ReviewCache`](super::ReviewCache)
/// owns encoding. Removal takes several keys at once because every write
/// path in the services invalidates more than one family.
pub trait CacheBackend: Send + Sync {
    fn read(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    fn write(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Remove the given keys, returning how many existed
    fn remove(&self, keys: &[String]) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Remove every key starting with `prefix`
    fn remove_prefix(&self, prefix: &str) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Number of live keys owned by this backend
    fn key_count(&self) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Up to `limit` live keys starting with `prefix`
    fn sample_keys(
        &self,
        prefix: &str,
        limit: usize,
    ) -> impl Future<Output = CacheResult<Vec<KeySample>>> + Send;

    fn ping(&self) -> impl Future<Output = CacheResult<bool>> + Send;

    fn backend_name(&self) -> &'static str;

    /// Whether other processes observe this backend's evictions
    fn shares_state(&self) -> bool {
        false
    }
}
