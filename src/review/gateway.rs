//! # Review Gateway
//!
//! Approve/reject entry point. Checks the caller and the version, records the
//! decision with a write that only applies while the version is REVIEWING,
//! and evicts the statistics the decision changes.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::cache::ReviewCache;
use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::logging::log_review_operation;
use crate::models::{RecordReview, ReviewVersion};
use crate::services::EntityLookup;
use crate::state_machine::{ReviewDecision, VersionEvent, VersionStateMachine, VersionStatus};
use crate::validation::normalize_text;

#[derive(Clone)]
pub struct ReviewGateway {
    store: Arc<dyn ReviewStore>,
    lookup: EntityLookup,
    cache: ReviewCache,
}

impl std::fmt::Debug for ReviewGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewGateway").finish_non_exhaustive()
    }
}

impl ReviewGateway {
    pub fn new(store: Arc<dyn ReviewStore>, lookup: EntityLookup, cache: ReviewCache) -> Self {
        Self {
            store,
            lookup,
            cache,
        }
    }

    /// Record `decision` on a REVIEWING version.
    ///
    /// Of two concurrent reviews exactly one wins; the other fails with
    /// [`ReviewError::AlreadyReviewed`].
    #[instrument(skip(self, actor, comment), fields(tenant_id = actor.tenant_id, reviewer_id = actor.user_id))]
    pub async fn review(
        &self,
        actor: &Actor,
        version_id: i64,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> ReviewResult<ReviewVersion> {
        if !actor.has_role(Role::Reviewer) {
            return Err(ReviewError::forbidden("reviewer role required"));
        }

        let version = self.lookup.version_in_tenant(actor, version_id).await?;
        let task = self.lookup.task_in_tenant(actor, version.task_id).await?;
        if !task.is_assigned_to(actor.user_id) {
            return Err(ReviewError::forbidden(format!(
                "user {} is not the reviewer of task {}",
                actor.user_id, task.id
            )));
        }

        if matches!(version.status, VersionStatus::Approved | VersionStatus::Rejected) {
            return Err(ReviewError::AlreadyReviewed {
                version_id: version.id,
            });
        }
        VersionStateMachine::for_version(&version)
            .transition(VersionEvent::from(decision))
            .map_err(|e| ReviewError::from_transition(version.id, e))?;

        let comment = normalize_text("comment", comment)?;

        let reviewed = self
            .store
            .record_review(RecordReview {
                task_id: task.id,
                version_id: version.id,
                reviewer_id: actor.user_id,
                decision,
                comment,
            })
            .await?
            .ok_or(ReviewError::AlreadyReviewed {
                version_id: version.id,
            })?;

        self.cache
            .evict_statistics(task.tenant_id, task.creator_id, task.reviewer_id)
            .await;

        log_review_operation(
            "review",
            task.tenant_id,
            Some(task.id),
            Some(reviewed.id),
            reviewed.status.as_str(),
            None,
        );
        info!(
            task_id = task.id,
            version_id = reviewed.id,
            decision = ?decision,
            "✅ Review recorded"
        );
        Ok(reviewed)
    }
}
