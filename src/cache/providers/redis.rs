//! Shared Redis backend (feature `cache-redis`).
//!
//! All keys live under the configured namespace so several deployments can
//! share one Redis. Prefix removal walks the keyspace with SCAN.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::{CacheBackend, KeySample};
use crate::config::loader::redact_url;
use crate::config::RedisConfig;

const NAME: &str = "redis";
const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    namespace: String,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let unreachable = |e: redis::RedisError| CacheError::Unreachable {
            backend: NAME,
            reason: e.to_string(),
        };
        let client = redis::Client::open(config.url.as_str()).map_err(unreachable)?;
        let connection = ConnectionManager::new(client).await.map_err(unreachable)?;

        debug!(
            url = %redact_url(&config.url),
            namespace = %config.namespace,
            "🔌 Redis cache connected"
        );
        Ok(Self {
            connection,
            namespace: config.namespace.clone(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Walk keys matching `prefix`, stopping once `limit` have been seen
    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> CacheResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.namespaced(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::command(NAME, "SCAN", e))?;
            keys.extend(batch);

            if next == 0 || limit.is_some_and(|limit| keys.len() >= limit) {
                break;
            }
            cursor = next;
        }
        if let Some(limit) = limit {
            keys.truncate(limit);
        }
        Ok(keys)
    }
}

impl CacheBackend for RedisBackend {
    async fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(self.namespaced(key))
            .await
            .map_err(|e| CacheError::command(NAME, "GET", e))
    }

    async fn write(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        conn.pset_ex::<_, _, ()>(self.namespaced(key), value, millis)
            .await
            .map_err(|e| CacheError::command(NAME, "PSETEX", e))
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let namespaced: Vec<String> = keys.iter().map(|k| self.namespaced(k)).collect();
        conn.del(namespaced)
            .await
            .map_err(|e| CacheError::command(NAME, "DEL", e))
    }

    async fn remove_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.namespaced(prefix));
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::command(NAME, "SCAN", e))?;

            if !batch.is_empty() {
                let count: u64 = redis::cmd("UNLINK")
                    .arg(&batch)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| CacheError::command(NAME, "UNLINK", e))?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }

    async fn key_count(&self) -> CacheResult<u64> {
        let keys = self.scan_prefix("", None).await?;
        Ok(keys.len() as u64)
    }

    async fn sample_keys(&self, prefix: &str, limit: usize) -> CacheResult<Vec<KeySample>> {
        let mut conn = self.connection.clone();
        let mut samples = Vec::new();
        for namespaced in self.scan_prefix(prefix, Some(limit)).await? {
            // -2 when the key expired mid-scan, -1 when it has no expiry
            let millis: i64 = conn
                .pttl(&namespaced)
                .await
                .map_err(|e| CacheError::command(NAME, "PTTL", e))?;
            if millis == -2 {
                continue;
            }
            let key = namespaced
                .strip_prefix(self.namespace.as_str())
                .unwrap_or(&namespaced)
                .to_owned();
            samples.push(KeySample {
                key,
                ttl: u64::try_from(millis).ok().map(Duration::from_millis),
            });
        }
        Ok(samples)
    }

    async fn ping(&self) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::command(NAME, "PING", e))?;
        Ok(reply == "PONG")
    }

    fn backend_name(&self) -> &'static str {
        NAME
    }

    fn shares_state(&self) -> bool {
        true
    }
}
