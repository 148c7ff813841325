//! Reviewer's view of one version: the task, the submission, its files and
//! how the version before it was decided.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::models::{PreviousVersionInfo, ReviewDetail, ReviewVersion, UserRef};
use crate::services::reviewer_directory::{display_names, ReviewerDirectory};
use crate::services::EntityLookup;

#[derive(Clone)]
pub struct ReviewDetailService {
    store: Arc<dyn ReviewStore>,
    lookup: EntityLookup,
    directory: Arc<dyn ReviewerDirectory>,
}

impl std::fmt::Debug for ReviewDetailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewDetailService").finish_non_exhaustive()
    }
}

impl ReviewDetailService {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        lookup: EntityLookup,
        directory: Arc<dyn ReviewerDirectory>,
    ) -> Self {
        Self {
            store,
            lookup,
            directory,
        }
    }

    /// Detail of a version for the reviewer assigned to its task
    #[instrument(skip(self, actor), fields(tenant_id = actor.tenant_id, reviewer_id = actor.user_id))]
    pub async fn get_review_detail(
        &self,
        actor: &Actor,
        version_id: i64,
    ) -> ReviewResult<ReviewDetail> {
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

        let (files, history) = futures::try_join!(
            self.store.list_files(version.id),
            self.store.list_versions(task.id),
        )?;
        let previous_version = previous_of(&version, &history);
        let names = display_names(
            self.directory.as_ref(),
            actor.tenant_id,
            [task.creator_id, task.reviewer_id],
        )
        .await?;

        debug!(
            version_id = version.id,
            files = files.len(),
            has_previous = previous_version.is_some(),
            "🔎 Review detail assembled"
        );
        Ok(ReviewDetail {
            task_id: task.id,
            task_name: task.task_name,
            version_id: version.id,
            version_number: version.version_number,
            status: version.status,
            submit_desc: version.submit_desc,
            submit_time: version.submit_time,
            files_ready: version.files_ready,
            file_count: version.file_count,
            creator: UserRef::named(task.creator_id, &names),
            reviewer: UserRef::named(task.reviewer_id, &names),
            files,
            previous_version,
        })
    }
}

fn previous_of(version: &ReviewVersion, history: &[ReviewVersion]) -> Option<PreviousVersionInfo> {
    history
        .iter()
        .find(|v| v.version_number == version.version_number - 1)
        .map(|previous| PreviousVersionInfo {
            version_id: previous.id,
            version_number: previous.version_number,
            status: previous.status,
            review_comment: previous.review_comment.clone(),
            review_time: previous.review_time,
        })
}
