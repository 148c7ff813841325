//! # Review Services
//!
//! Request-path operations outside the resubmission lifecycle: task
//! submission, task lists, statistics, entity reads, and queue and cache
//! monitoring.

pub mod cache_monitor;
pub mod entity_lookup;
pub mod queue_monitor;
pub mod reviewer_directory;
pub mod statistics;
pub mod task_query;
pub mod task_submission;

pub use cache_monitor::{CacheMonitor, CacheSnapshot, CachedKey};
pub use entity_lookup::EntityLookup;
pub use queue_monitor::{AlertLevel, QueueMonitor, QueueSnapshot};
pub use reviewer_directory::{InMemoryReviewerDirectory, ReviewerDirectory};
pub use statistics::StatisticsService;
pub use task_query::{TaskListQuery, TaskQueryService};
pub use task_submission::{NewTaskRequest, TaskSubmissionService};
