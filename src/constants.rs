//! # System Constants
//!
//! Queue names, cache key prefixes and default TTLs shared by the
//! orchestrator, the worker and the cache layer.

use std::time::Duration;

/// Message channel defaults
pub mod queues {
    /// Durable main queue carrying copy jobs
    pub const FILE_COPY_QUEUE: &str = "file.copy.queue";
    /// Dead-letter queue for copy jobs that failed unrecoverably
    pub const FILE_COPY_DEAD_LETTER_QUEUE: &str = "file.copy.dlx";
    /// Exchange the copy queues are bound to on brokers that route by exchange
    pub const REVIEW_EXCHANGE: &str = "review.exchange";
    pub const FILE_COPY_ROUTING_KEY: &str = "file.copy";
    pub const FILE_COPY_DEAD_LETTER_ROUTING_KEY: &str = "file.copy.dlx";
}

/// Cache key prefixes
pub mod cache_keys {
    pub const USER_STATISTICS_PREFIX: &str = "stat:user:";
    pub const REVIEWER_STATISTICS_PREFIX: &str = "stat:reviewer:";
    pub const REVIEWER_OPTIONS_PREFIX: &str = "options:reviewers:";
    pub const TASK_MISS_PREFIX: &str = "task:miss:";
    pub const VERSION_MISS_PREFIX: &str = "version:miss:";
    /// Value stored under miss sentinels
    pub const MISS_MARKER: &str = "1";
}

/// Nominal cache TTLs before jitter
pub mod ttl {
    use super::Duration;

    pub const STATISTICS: Duration = Duration::from_secs(60);
    pub const REVIEWER_OPTIONS: Duration = Duration::from_secs(600);
    pub const MISS_SENTINEL: Duration = Duration::from_secs(30);
    /// Floor applied after jitter
    pub const MINIMUM: Duration = Duration::from_secs(1);
    /// Fraction of the nominal TTL used as the jitter window (±)
    pub const JITTER_RATIO: f64 = 0.2;
    /// Delay of the second statistics eviction on shared backends, covering
    /// fills started in other processes before the first one
    pub const SECOND_EVICTION_DELAY: Duration = Duration::from_secs(2);
}

/// Queue backlog thresholds for the monitor
pub mod backlog {
    pub const WARNING_THRESHOLD: u64 = 100;
    pub const DANGER_THRESHOLD: u64 = 500;
}

/// Task list paging
pub mod listing {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 200;
}

/// Cache key families sampled by the cache monitor, and how many of each
pub mod cache_monitor {
    pub const SAMPLED_PREFIXES: [&str; 2] = ["stat:", "options:reviewers:"];
    pub const SAMPLE_LIMIT: usize = 20;
}

/// Longest accepted task name, in characters
pub const MAX_TASK_NAME_LENGTH: usize = 128;

/// Longest accepted submit description or review comment, in characters
pub const MAX_TEXT_LENGTH: usize = 2000;
