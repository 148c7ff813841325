//! Cache key builders

use crate::constants::cache_keys::{
    REVIEWER_OPTIONS_PREFIX, REVIEWER_STATISTICS_PREFIX, TASK_MISS_PREFIX,
    USER_STATISTICS_PREFIX, VERSION_MISS_PREFIX,
};

/// `stat:user:{tenant}:{user}`
pub fn user_statistics(tenant_id: i64, user_id: i64) -> String {
    format!("{USER_STATISTICS_PREFIX}{tenant_id}:{user_id}")
}

/// `stat:reviewer:{tenant}:{reviewer}`
pub fn reviewer_statistics(tenant_id: i64, reviewer_id: i64) -> String {
    format!("{REVIEWER_STATISTICS_PREFIX}{tenant_id}:{reviewer_id}")
}

/// `options:reviewers:{tenant}`
pub fn reviewer_options(tenant_id: i64) -> String {
    format!("{REVIEWER_OPTIONS_PREFIX}{tenant_id}")
}

pub fn task_miss(task_id: i64) -> String {
    format!("{TASK_MISS_PREFIX}{task_id}")
}

pub fn version_miss(version_id: i64) -> String {
    format!("{VERSION_MISS_PREFIX}{version_id}")
}

/// Prefixes covering every statistics key of a tenant
pub fn tenant_statistics_prefixes(tenant_id: i64) -> [String; 2] {
    [
        format!("{USER_STATISTICS_PREFIX}{tenant_id}:"),
        format!("{REVIEWER_STATISTICS_PREFIX}{tenant_id}:"),
    ]
}
