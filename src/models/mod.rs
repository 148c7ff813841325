//! # Data Models
//!
//! Plain records for the review domain. Persistence lives behind
//! [`crate::database::ReviewStore`]; these types carry no storage logic.
//!
//! - [`ReviewTask`] - a named review thread owned by a creator
//! - [`ReviewVersion`] - one numbered submission attempt within a task
//! - [`ReviewFile`] - file metadata attached to a version
//! - [`TaskStatistics`] - per-user review counters
//! - [`ReviewerOption`] / [`UserProfile`] - directory records
//! - [`TaskListItem`] / [`ReviewDetail`] - read views assembled by the services

pub mod file;
pub mod listing;
pub mod reviewer;
pub mod statistics;
pub mod task;
pub mod version;

pub use file::{NewReviewFile, ReviewFile};
pub use listing::{
    Page, PageRequest, PreviousVersionInfo, ReviewDetail, TaskListFilter, TaskListItem, UserRef,
};
pub use reviewer::{ReviewerOption, UserProfile};
pub use statistics::{StatisticsScope, TaskCountFilter, TaskStatistics};
pub use task::{NewReviewTask, ReviewTask};
pub use version::{
    FinalizeVersion, NewPreparingVersion, PreparingInsert, RecordReview, ReviewVersion,
    VersionStatusView,
};
