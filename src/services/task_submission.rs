//! # Task Submission
//!
//! Creates a review task together with its first version. The first version
//! goes straight to REVIEWING with an empty, ready file set; files are
//! attached through the file collaborator afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::reviewer_directory::ReviewerDirectory;
use crate::cache::ReviewCache;
use crate::database::{ReviewStore, StoreError, TASK_NAME_CONSTRAINT};
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::logging::log_review_operation;
use crate::models::{NewReviewTask, ReviewTask, ReviewVersion};
use crate::validation::{normalize_text, validate_task_name};

/// Client input for [`TaskSubmissionService::submit_task`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRequest {
    pub name: String,
    pub reviewer_id: i64,
    #[serde(default)]
    pub submit_desc: Option<String>,
}

#[derive(Clone)]
pub struct TaskSubmissionService {
    store: Arc<dyn ReviewStore>,
    directory: Arc<dyn ReviewerDirectory>,
    cache: ReviewCache,
}

impl std::fmt::Debug for TaskSubmissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubmissionService")
            .finish_non_exhaustive()
    }
}

impl TaskSubmissionService {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        directory: Arc<dyn ReviewerDirectory>,
        cache: ReviewCache,
    ) -> Self {
        Self {
            store,
            directory,
            cache,
        }
    }

    #[instrument(skip(self, actor, request), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn submit_task(
        &self,
        actor: &Actor,
        request: NewTaskRequest,
    ) -> ReviewResult<(ReviewTask, ReviewVersion)> {
        if !actor.has_role(Role::User) {
            return Err(ReviewError::forbidden("user role required to submit tasks"));
        }

        let task_name = validate_task_name(&request.name)?;
        let submit_desc = normalize_text("submit_desc", request.submit_desc)?;

        let reviewer = self
            .directory
            .find_user(actor.tenant_id, request.reviewer_id)
            .await?
            .filter(|profile| profile.tenant_id == actor.tenant_id)
            .ok_or_else(|| {
                ReviewError::validation("reviewer_id", "reviewer not found in tenant")
            })?;
        if !reviewer.is_active_reviewer() {
            return Err(ReviewError::validation(
                "reviewer_id",
                "user is not an active reviewer",
            ));
        }

        // Fast rejection; the unique constraint below is what actually holds
        if self
            .store
            .task_name_exists(actor.tenant_id, &task_name)
            .await?
        {
            return Err(ReviewError::DuplicateTaskName { name: task_name });
        }

        let created = self
            .store
            .create_task(NewReviewTask {
                tenant_id: actor.tenant_id,
                task_name: task_name.clone(),
                creator_id: actor.user_id,
                reviewer_id: reviewer.user_id,
                submit_desc,
            })
            .await;

        let (task, version) = match created {
            Ok(created) => created,
            Err(StoreError::ConstraintViolation { constraint, .. })
                if constraint == TASK_NAME_CONSTRAINT =>
            {
                return Err(ReviewError::DuplicateTaskName { name: task_name });
            }
            Err(e) => return Err(e.into()),
        };

        self.cache
            .evict_statistics(task.tenant_id, task.creator_id, task.reviewer_id)
            .await;

        log_review_operation(
            "submit_task",
            task.tenant_id,
            Some(task.id),
            Some(version.id),
            task.current_status.as_str(),
            None,
        );
        Ok((task, version))
    }
}
