//! # Review Store
//!
//! Persistence seam for tasks, versions and file metadata. Every method is
//! atomic on its own; the multi-row ones (task creation, PREPARING insert,
//! finalize, review, replication) run inside a single transaction in the
//! Postgres implementation and under a single lock in the in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::StoreResult;
use crate::models::{
    FinalizeVersion, NewPreparingVersion, NewReviewFile, NewReviewTask, Page, PreparingInsert,
    RecordReview, ReviewFile, ReviewTask, ReviewVersion, TaskCountFilter, TaskListFilter,
};

/// Name of the unique constraint on `(tenant_id, task_name)`
pub const TASK_NAME_CONSTRAINT: &str = "uq_review_task_tenant_name";

/// Name of the partial unique index allowing one PREPARING version per task
pub const PREPARING_CONSTRAINT: &str = "uq_review_version_preparing";

/// Result of replicating a version's file rows onto another version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationOutcome {
    /// Rows inserted by this call (zero when the target already had rows)
    pub inserted: i64,
    /// Rows now attached to the target version
    pub file_count: i64,
    /// Whether the target's readiness flag was written
    pub marked_ready: bool,
}

#[async_trait]
pub trait ReviewStore: Send + Sync + 'static {
    /// Create a task and its first version (REVIEWING, files ready, no files).
    ///
    /// Fails with a constraint violation on [`TASK_NAME_CONSTRAINT`] when the
    /// tenant already has a task with this name.
    async fn create_task(&self, new_task: NewReviewTask)
        -> StoreResult<(ReviewTask, ReviewVersion)>;

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<ReviewTask>>;

    async fn task_name_exists(&self, tenant_id: i64, task_name: &str) -> StoreResult<bool>;

    /// Count tasks matching a predicate
    async fn count_tasks(&self, filter: &TaskCountFilter) -> StoreResult<i64>;

    /// One page of tasks matching a predicate, most recently updated first
    /// (ties broken by id, newest first)
    async fn list_tasks(&self, filter: &TaskListFilter) -> StoreResult<Page<ReviewTask>>;

    /// The version each task currently points at, for the given task ids
    async fn find_current_versions(&self, task_ids: &[i64]) -> StoreResult<Vec<ReviewVersion>>;

    async fn find_version(&self, version_id: i64) -> StoreResult<Option<ReviewVersion>>;

    async fn find_preparing_version(&self, task_id: i64) -> StoreResult<Option<ReviewVersion>>;

    /// All versions of a task, newest first
    async fn list_versions(&self, task_id: i64) -> StoreResult<Vec<ReviewVersion>>;

    /// Open a PREPARING version numbered `max + 1`.
    ///
    /// When another PREPARING version exists for the task (including one
    /// inserted concurrently) nothing is written and that version is returned
    /// as [`PreparingInsert::Existing`].
    async fn insert_preparing_version(
        &self,
        new_version: NewPreparingVersion,
    ) -> StoreResult<PreparingInsert>;

    /// PREPARING → REVIEWING for the version and the task's current pointer.
    ///
    /// Applied only while the version is PREPARING with ready files; returns
    /// `None` when that condition no longer holds.
    async fn finalize_version(&self, finalize: FinalizeVersion)
        -> StoreResult<Option<ReviewVersion>>;

    /// REVIEWING → APPROVED / REJECTED for the version and the task status.
    ///
    /// Applied only while the version is REVIEWING; returns `None` otherwise.
    async fn record_review(&self, review: RecordReview) -> StoreResult<Option<ReviewVersion>>;

    /// Set `files_ready = 1` and the file count on a PREPARING version
    async fn mark_files_ready(&self, version_id: i64, file_count: i32) -> StoreResult<bool>;

    /// Set `files_ready = -1` on a PREPARING version whose files are not ready
    async fn mark_files_failed(&self, version_id: i64) -> StoreResult<bool>;

    /// Move a PREPARING version whose files are copying or failed back to copying
    async fn reset_files_copying(&self, version_id: i64) -> StoreResult<bool>;

    /// PREPARING versions stuck copying since before `older_than`
    async fn find_stale_copies(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ReviewVersion>>;

    async fn list_files(&self, version_id: i64) -> StoreResult<Vec<ReviewFile>>;

    async fn count_files(&self, version_id: i64) -> StoreResult<i64>;

    async fn insert_file(&self, file: NewReviewFile) -> StoreResult<ReviewFile>;

    /// Copy every file row of `source_version_id` onto `target_version_id`
    /// and mark the target ready, in one transaction.
    ///
    /// Idempotent: when the target already has rows nothing is inserted and
    /// only the readiness flag is re-asserted. A target that is no longer
    /// PREPARING is left untouched. Returns `None` when the target does not
    /// exist.
    async fn replicate_files(
        &self,
        source_version_id: i64,
        target_version_id: i64,
    ) -> StoreResult<Option<ReplicationOutcome>>;

    async fn health_check(&self) -> StoreResult<bool>;
}
