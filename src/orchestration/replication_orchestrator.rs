//! # Replication Orchestrator
//!
//! Opens the PREPARING version of a resubmission, dispatches the copy job
//! that fills it with the files of an earlier version, and finalizes it into
//! REVIEWING once the files are in place.
//!
//! ```text
//! start_resubmission ──► PREPARING (files 0) ──► CopyJob ──► worker ──► files 1
//!        │                                                               │
//!        └─► PREPARING (files 1, reuse=false)     finalize_resubmission ◄┘
//!                                                        │
//!                                                    REVIEWING
//! ```
//!
//! Uniqueness of the PREPARING version is enforced by the store, so two
//! concurrent starts resolve to one version and one dispatched job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::dispatcher::CopyDispatcher;
use crate::cache::ReviewCache;
use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::Actor;
use crate::logging::log_review_operation;
use crate::messaging::CopyJob;
use crate::models::{
    FinalizeVersion, NewPreparingVersion, PreparingInsert, ReviewTask, ReviewVersion,
    VersionStatusView,
};
use crate::services::EntityLookup;
use crate::state_machine::{
    ensure_resubmission_allowed, FilesReady, VersionEvent, VersionStateMachine, VersionStatus,
};
use crate::validation::normalize_text;

/// Identity of the PREPARING version a resubmission works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResubmissionTicket {
    pub version_id: i64,
    pub version_number: i32,
    pub files_ready: FilesReady,
    /// False when an existing PREPARING version was returned
    pub created: bool,
}

impl ResubmissionTicket {
    fn from_version(version: &ReviewVersion, created: bool) -> Self {
        Self {
            version_id: version.id,
            version_number: version.version_number,
            files_ready: version.files_ready,
            created,
        }
    }
}

#[derive(Clone)]
pub struct ReplicationOrchestrator {
    store: Arc<dyn ReviewStore>,
    lookup: EntityLookup,
    cache: ReviewCache,
    dispatcher: CopyDispatcher,
}

impl std::fmt::Debug for ReplicationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationOrchestrator")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl ReplicationOrchestrator {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        lookup: EntityLookup,
        cache: ReviewCache,
        dispatcher: CopyDispatcher,
    ) -> Self {
        Self {
            store,
            lookup,
            cache,
            dispatcher,
        }
    }

    /// Open (or return the already open) PREPARING version of a rejected task.
    ///
    /// With `reuse_old_files` the version starts copying and a [`CopyJob`]
    /// from `source_version_id` is dispatched; without it the version is
    /// ready immediately and files are attached by the caller.
    #[instrument(skip(self, actor), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn start_resubmission(
        &self,
        actor: &Actor,
        task_id: i64,
        source_version_id: i64,
        reuse_old_files: bool,
    ) -> ReviewResult<ResubmissionTicket> {
        let task = self.owned_task(actor, task_id).await?;
        let source = self
            .lookup
            .version_of_task(actor, task.id, source_version_id)
            .await?;

        if let Some(existing) = self.store.find_preparing_version(task.id).await? {
            info!(
                task_id = task.id,
                version_id = existing.id,
                "Resubmission already in progress, returning PREPARING version"
            );
            return Ok(ResubmissionTicket::from_version(&existing, false));
        }

        ensure_resubmission_allowed(task.current_status)
            .map_err(|e| ReviewError::invalid_state(e.to_string()))?;

        let files_ready = if reuse_old_files {
            FilesReady::Copying
        } else {
            FilesReady::Ready
        };

        let inserted = self
            .store
            .insert_preparing_version(NewPreparingVersion {
                task_id: task.id,
                tenant_id: task.tenant_id,
                files_ready,
                reviewer_id: task.reviewer_id,
            })
            .await?;

        let version = match inserted {
            PreparingInsert::Existing(version) => {
                info!(
                    task_id = task.id,
                    version_id = version.id,
                    "Lost PREPARING race, returning winner's version"
                );
                return Ok(ResubmissionTicket::from_version(&version, false));
            }
            PreparingInsert::Created(version) => version,
        };
        self.lookup.version_created(version.id).await;

        log_review_operation(
            "start_resubmission",
            task.tenant_id,
            Some(task.id),
            Some(version.id),
            version.status.as_str(),
            Some(if reuse_old_files { "reuse_old_files" } else { "fresh_files" }),
        );

        if reuse_old_files {
            let job = CopyJob::new(task.tenant_id, task.id, source.id, version.id);
            self.dispatch_or_mark_failed(job).await?;
        }

        Ok(ResubmissionTicket::from_version(&version, true))
    }

    /// PREPARING → REVIEWING once the version's files are ready and present
    #[instrument(skip(self, actor, submit_desc), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn finalize_resubmission(
        &self,
        actor: &Actor,
        task_id: i64,
        version_id: i64,
        submit_desc: Option<String>,
    ) -> ReviewResult<ReviewVersion> {
        let task = self.owned_task(actor, task_id).await?;
        let version = self.lookup.version_of_task(actor, task.id, version_id).await?;
        let submit_desc = normalize_text("submit_desc", submit_desc)?;

        // Authoritative count from the file store, not the cached column
        let file_count = self.store.count_files(version.id).await?;
        VersionStateMachine::for_version(&version)
            .with_file_count(file_count)
            .transition(VersionEvent::Submit)
            .map_err(|e| ReviewError::from_transition(version.id, e))?;

        let file_count = i32::try_from(file_count)
            .map_err(|_| ReviewError::internal(format!("file count {file_count} out of range")))?;

        let finalized = self
            .store
            .finalize_version(FinalizeVersion {
                task_id: task.id,
                version_id: version.id,
                submit_desc,
                file_count,
            })
            .await?;

        let finalized = match finalized {
            Some(v) => v,
            None => return Err(self.explain_lost_finalize(version.id).await),
        };

        self.cache
            .evict_statistics(task.tenant_id, task.creator_id, task.reviewer_id)
            .await;

        log_review_operation(
            "finalize_resubmission",
            task.tenant_id,
            Some(task.id),
            Some(finalized.id),
            finalized.status.as_str(),
            None,
        );
        Ok(finalized)
    }

    /// Re-dispatch the copy for a PREPARING version whose files are still
    /// copying or failed
    #[instrument(skip(self, actor), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn retrigger_copy(
        &self,
        actor: &Actor,
        task_id: i64,
        version_id: i64,
        source_version_id: i64,
    ) -> ReviewResult<VersionStatusView> {
        let task = self.owned_task(actor, task_id).await?;
        let version = self.lookup.version_of_task(actor, task.id, version_id).await?;

        if version.status != VersionStatus::Preparing {
            return Err(ReviewError::invalid_state(format!(
                "version {} is {}, only PREPARING versions can be re-copied",
                version.id, version.status
            )));
        }
        if version.files_ready.is_ready() {
            return Err(ReviewError::invalid_state(format!(
                "files of version {} are already ready",
                version.id
            )));
        }

        let source = self
            .lookup
            .version_of_task(actor, task.id, source_version_id)
            .await?;
        if source.id == version.id {
            return Err(ReviewError::validation(
                "source_version_id",
                "a version cannot copy files from itself",
            ));
        }

        if !self.store.reset_files_copying(version.id).await? {
            return Err(ReviewError::invalid_state(format!(
                "version {} changed while re-triggering its copy",
                version.id
            )));
        }

        let job = CopyJob::new(task.tenant_id, task.id, source.id, version.id);
        info!(
            task_id = task.id,
            version_id = version.id,
            trace_id = %job.trace_id,
            "🔁 Re-triggering file copy"
        );
        self.dispatch_or_mark_failed(job).await?;

        Ok(VersionStatusView {
            files_ready: FilesReady::Copying,
            ..version.status_view()
        })
    }

    /// Status snapshot for clients polling a version
    pub async fn get_version_status(
        &self,
        actor: &Actor,
        version_id: i64,
    ) -> ReviewResult<VersionStatusView> {
        let version = self.lookup.version_in_tenant(actor, version_id).await?;
        Ok(version.status_view())
    }

    async fn owned_task(&self, actor: &Actor, task_id: i64) -> ReviewResult<ReviewTask> {
        let task = self.lookup.task_in_tenant(actor, task_id).await?;
        if !task.is_created_by(actor.user_id) {
            return Err(ReviewError::forbidden(format!(
                "only the creator of task {} may resubmit it",
                task.id
            )));
        }
        Ok(task)
    }

    async fn dispatch_or_mark_failed(&self, job: CopyJob) -> ReviewResult<()> {
        let version_id = job.new_version_id;
        let trace_id = job.trace_id.clone();

        let err = match self.dispatcher.dispatch(job).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        warn!(
            trace_id = %trace_id,
            version_id = version_id,
            error = %err,
            "⚠️ Copy job dispatch failed, marking version failed"
        );
        if let Err(mark_err) = self.store.mark_files_failed(version_id).await {
            warn!(
                version_id = version_id,
                error = %mark_err,
                "Could not record dispatch failure on version"
            );
        }
        Err(err)
    }

    /// Work out why a guarded finalize matched no row
    async fn explain_lost_finalize(&self, version_id: i64) -> ReviewError {
        match self.store.find_version(version_id).await {
            Ok(Some(current)) if current.status != VersionStatus::Preparing => {
                ReviewError::invalid_state(format!(
                    "version {} is already {}",
                    current.id, current.status
                ))
            }
            Ok(Some(current)) => ReviewError::files_not_ready(current.id, current.files_ready),
            Ok(None) => ReviewError::VersionNotFound { version_id },
            Err(e) => e.into(),
        }
    }
}
