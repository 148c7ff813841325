mod moka;
mod noop;
#[cfg(feature = "cache-redis")]
mod redis;

pub use self::moka::MokaBackend;
pub use self::noop::DisabledBackend;
#[cfg(feature = "cache-redis")]
pub use self::redis::RedisBackend;
