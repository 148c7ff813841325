//! # Cache Consistency Layer
//!
//! ```text
//! ReviewCache                     <- typed families, jittered TTLs, never errors
//!   └── CacheProvider (enum)      <- dispatch, graceful degradation
//!         ├── Redis               <- shared, namespaced (feature `cache-redis`)
//!         ├── Moka                <- in-process, per-entry TTL
//!         └── Disabled            <- always miss
//! ```
//!
//! Reads go cache first; writes to the store are followed by evictions of
//! the affected keys after the store commits.

pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod review_cache;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use provider::CacheProvider;
pub use providers::{DisabledBackend, MokaBackend};
pub use review_cache::{jittered_ttl, CacheLookups, ReviewCache};
pub use traits::{CacheBackend, KeySample};

#[cfg(feature = "cache-redis")]
pub use providers::RedisBackend;
