//! # Copy Worker
//!
//! Executes a single [`CopyJob`]: replicate the file rows of the source
//! version onto the PREPARING target and flip its readiness flag.
//!
//! Execution is idempotent. The store skips insertion when the target
//! already has rows, so a redelivered job only re-asserts readiness.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::database::{ReplicationOutcome, ReviewStore};
use crate::error::{ReviewError, ReviewResult};
use crate::logging::log_replication_operation;
use crate::messaging::CopyJob;
use crate::models::ReviewVersion;
use crate::state_machine::VersionStatus;

/// Replicates file metadata between versions
#[derive(Clone)]
pub struct CopyWorker {
    store: Arc<dyn ReviewStore>,
}

impl std::fmt::Debug for CopyWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyWorker").finish_non_exhaustive()
    }
}

impl CopyWorker {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// Run `job` to completion.
    ///
    /// Any failure leaves the target at `files_ready = -1` and is returned as
    /// [`ReviewError::CopyFailed`]. A target that is no longer PREPARING is
    /// reported as a no-op success so a late redelivery can be acked.
    #[instrument(skip(self, job), fields(trace_id = %job.trace_id, target = job.new_version_id))]
    pub async fn execute_copy(&self, job: &CopyJob) -> ReviewResult<ReplicationOutcome> {
        log_replication_operation(
            "execute_copy",
            &job.trace_id,
            job.old_version_id,
            job.new_version_id,
            "started",
            None,
        );

        match self.try_copy(job).await {
            Ok(outcome) => {
                log_replication_operation(
                    "execute_copy",
                    &job.trace_id,
                    job.old_version_id,
                    job.new_version_id,
                    if outcome.marked_ready { "completed" } else { "skipped" },
                    Some(outcome.file_count),
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    trace_id = %job.trace_id,
                    source_version_id = job.old_version_id,
                    target_version_id = job.new_version_id,
                    error = %err,
                    "❌ Copy job failed"
                );
                self.mark_copy_failed(job).await;
                log_replication_operation(
                    "execute_copy",
                    &job.trace_id,
                    job.old_version_id,
                    job.new_version_id,
                    "failed",
                    None,
                );
                Err(ReviewError::CopyFailed {
                    version_id: job.new_version_id,
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn try_copy(&self, job: &CopyJob) -> ReviewResult<ReplicationOutcome> {
        let target = self.load_target(job).await?;

        if target.status != VersionStatus::Preparing {
            info!(
                trace_id = %job.trace_id,
                target_version_id = target.id,
                status = %target.status,
                "Copy target already left PREPARING, nothing to do"
            );
            return Ok(ReplicationOutcome {
                inserted: 0,
                file_count: i64::from(target.file_count),
                marked_ready: false,
            });
        }

        let source = self
            .store
            .find_version(job.old_version_id)
            .await?
            .ok_or(ReviewError::VersionNotFound {
                version_id: job.old_version_id,
            })?;
        if source.task_id != target.task_id {
            return Err(ReviewError::invalid_state(format!(
                "source version {} belongs to task {}, target to task {}",
                source.id, source.task_id, target.task_id
            )));
        }

        let source_files = self.store.list_files(source.id).await?;
        if source_files.is_empty() {
            let marked_ready = self.store.mark_files_ready(target.id, 0).await?;
            return Ok(ReplicationOutcome {
                inserted: 0,
                file_count: 0,
                marked_ready,
            });
        }

        self.store
            .replicate_files(source.id, target.id)
            .await?
            .ok_or(ReviewError::VersionNotFound {
                version_id: target.id,
            })
    }

    async fn load_target(&self, job: &CopyJob) -> ReviewResult<ReviewVersion> {
        let target = self
            .store
            .find_version(job.new_version_id)
            .await?
            .ok_or(ReviewError::VersionNotFound {
                version_id: job.new_version_id,
            })?;

        if target.tenant_id != job.tenant_id || target.task_id != job.task_id {
            return Err(ReviewError::invalid_state(format!(
                "copy job for tenant {} task {} does not match version {}",
                job.tenant_id, job.task_id, target.id
            )));
        }
        Ok(target)
    }

    /// Best-effort failure marker; never replaces the original error
    async fn mark_copy_failed(&self, job: &CopyJob) {
        match self.store.mark_files_failed(job.new_version_id).await {
            Ok(true) => warn!(
                trace_id = %job.trace_id,
                version_id = job.new_version_id,
                "⚠️ Version marked as copy failed"
            ),
            Ok(false) => info!(
                trace_id = %job.trace_id,
                version_id = job.new_version_id,
                "Copy failure not recorded: version is ready or no longer PREPARING"
            ),
            Err(e) => error!(
                trace_id = %job.trace_id,
                version_id = job.new_version_id,
                error = %e,
                "Failed to record copy failure"
            ),
        }
    }
}
