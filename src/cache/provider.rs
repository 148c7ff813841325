//! Backend selection.
//!
//! Building a provider never fails. When the configured backend cannot be
//! reached the cache is disabled and the services keep running against the
//! store alone.

use std::time::Duration;

use tracing::{info, warn};

use super::errors::CacheResult;
use super::providers::{DisabledBackend, MokaBackend};
use super::traits::{CacheBackend, KeySample};
use crate::config::{CacheBackendKind, CacheConfig};

#[cfg(feature = "cache-redis")]
use super::providers::RedisBackend;

#[derive(Debug, Clone)]
pub enum CacheProvider {
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisBackend>),
    Moka(MokaBackend),
    Disabled(DisabledBackend),
}

macro_rules! each_backend {
    ($self:ident, $backend:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "cache-redis")]
            CacheProvider::Redis($backend) => $body,
            CacheProvider::Moka($backend) => $body,
            CacheProvider::Disabled($backend) => $body,
        }
    };
}

impl CacheProvider {
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Cache disabled by configuration");
            return Self::disabled();
        }

        let provider = match config.backend {
            CacheBackendKind::Noop => Self::disabled(),
            CacheBackendKind::Moka => Self::Moka(MokaBackend::new(&config.moka)),
            CacheBackendKind::Redis => Self::redis(config).await,
        };
        info!(backend = provider.backend_name(), "🗄️ Cache backend selected");
        provider
    }

    #[cfg(feature = "cache-redis")]
    async fn redis(config: &CacheConfig) -> Self {
        match RedisBackend::connect(&config.redis).await {
            Ok(backend) => Self::Redis(Box::new(backend)),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, running without cache");
                Self::disabled()
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn redis(_config: &CacheConfig) -> Self {
        warn!("Redis cache configured but the cache-redis feature is off, running without cache");
        Self::disabled()
    }

    pub fn disabled() -> Self {
        Self::Disabled(DisabledBackend)
    }

    pub fn moka(max_capacity: u64) -> Self {
        Self::Moka(MokaBackend::with_capacity(max_capacity))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled(_))
    }
}

impl CacheBackend for CacheProvider {
    async fn read(&self, key: &str) -> CacheResult<Option<String>> {
        each_backend!(self, b => b.read(key).await)
    }

    async fn write(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        each_backend!(self, b => b.write(key, value, ttl).await)
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<u64> {
        each_backend!(self, b => b.remove(keys).await)
    }

    async fn remove_prefix(&self, prefix: &str) -> CacheResult<u64> {
        each_backend!(self, b => b.remove_prefix(prefix).await)
    }

    async fn key_count(&self) -> CacheResult<u64> {
        each_backend!(self, b => b.key_count().await)
    }

    async fn sample_keys(&self, prefix: &str, limit: usize) -> CacheResult<Vec<KeySample>> {
        each_backend!(self, b => b.sample_keys(prefix, limit).await)
    }

    async fn ping(&self) -> CacheResult<bool> {
        each_backend!(self, b => b.ping().await)
    }

    fn backend_name(&self) -> &'static str {
        each_backend!(self, b => b.backend_name())
    }

    fn shares_state(&self) -> bool {
        each_backend!(self, b => b.shares_state())
    }
}
