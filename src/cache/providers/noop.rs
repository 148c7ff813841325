//! Backend used when caching is switched off or the configured backend
//! could not be reached at startup. Every read misses.

use std::time::Duration;

use crate::cache::errors::CacheResult;
use crate::cache::traits::{CacheBackend, KeySample};

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

impl CacheBackend for DisabledBackend {
    async fn read(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn write(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn remove(&self, _keys: &[String]) -> CacheResult<u64> {
        Ok(0)
    }

    async fn remove_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn key_count(&self) -> CacheResult<u64> {
        Ok(0)
    }

    async fn sample_keys(&self, _prefix: &str, _limit: usize) -> CacheResult<Vec<KeySample>> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}
