//! # Entity Lookup
//!
//! Tenant-scoped reads of tasks and versions, fronted by miss sentinels so
//! repeated lookups of ids that do not exist stop at the cache.
//!
//! A task or version of another tenant is reported as not found rather than
//! forbidden, so ids of other tenants stay hidden.

use std::sync::Arc;

use tracing::debug;

use crate::cache::ReviewCache;
use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::models::{ReviewTask, ReviewVersion};

#[derive(Clone)]
pub struct EntityLookup {
    store: Arc<dyn ReviewStore>,
    cache: ReviewCache,
}

impl std::fmt::Debug for EntityLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityLookup")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl EntityLookup {
    pub fn new(store: Arc<dyn ReviewStore>, cache: ReviewCache) -> Self {
        Self { store, cache }
    }

    /// Task by id, consulting the miss sentinel first
    pub async fn find_task(&self, task_id: i64) -> ReviewResult<ReviewTask> {
        if self.cache.is_task_missing(task_id).await {
            debug!(task_id = task_id, "Task miss sentinel hit");
            return Err(ReviewError::TaskNotFound { task_id });
        }

        match self.store.find_task(task_id).await? {
            Some(task) => Ok(task),
            None => {
                self.cache.mark_task_missing(task_id).await;
                Err(ReviewError::TaskNotFound { task_id })
            }
        }
    }

    /// Version by id, consulting the miss sentinel first
    pub async fn find_version(&self, version_id: i64) -> ReviewResult<ReviewVersion> {
        if self.cache.is_version_missing(version_id).await {
            debug!(version_id = version_id, "Version miss sentinel hit");
            return Err(ReviewError::VersionNotFound { version_id });
        }

        match self.store.find_version(version_id).await? {
            Some(version) => Ok(version),
            None => {
                self.cache.mark_version_missing(version_id).await;
                Err(ReviewError::VersionNotFound { version_id })
            }
        }
    }

    /// Task visible to the actor's tenant
    pub async fn task_in_tenant(&self, actor: &Actor, task_id: i64) -> ReviewResult<ReviewTask> {
        let task = self.find_task(task_id).await?;
        if task.tenant_id != actor.tenant_id {
            return Err(ReviewError::TaskNotFound { task_id });
        }
        Ok(task)
    }

    /// Version visible to the actor's tenant
    pub async fn version_in_tenant(
        &self,
        actor: &Actor,
        version_id: i64,
    ) -> ReviewResult<ReviewVersion> {
        let version = self.find_version(version_id).await?;
        if version.tenant_id != actor.tenant_id {
            return Err(ReviewError::VersionNotFound { version_id });
        }
        Ok(version)
    }

    /// Version of `task_id`; a version of another task is treated as missing
    pub async fn version_of_task(
        &self,
        actor: &Actor,
        task_id: i64,
        version_id: i64,
    ) -> ReviewResult<ReviewVersion> {
        let version = self.version_in_tenant(actor, version_id).await?;
        if !version.belongs_to(task_id) {
            return Err(ReviewError::VersionNotFound { version_id });
        }
        Ok(version)
    }

    /// Task detail for its creator, its reviewer or a tenant admin
    pub async fn get_task(&self, actor: &Actor, task_id: i64) -> ReviewResult<ReviewTask> {
        let task = self.task_in_tenant(actor, task_id).await?;
        ensure_readable(actor, &task)?;
        Ok(task)
    }

    /// Version history of a task, newest first
    pub async fn list_versions(
        &self,
        actor: &Actor,
        task_id: i64,
    ) -> ReviewResult<Vec<ReviewVersion>> {
        let task = self.get_task(actor, task_id).await?;
        Ok(self.store.list_versions(task.id).await?)
    }

    /// Forget a version miss sentinel after the id starts to exist
    pub async fn version_created(&self, version_id: i64) {
        self.cache.clear_version_missing(version_id).await;
    }
}

fn ensure_readable(actor: &Actor, task: &ReviewTask) -> ReviewResult<()> {
    if task.is_created_by(actor.user_id)
        || task.is_assigned_to(actor.user_id)
        || actor.has_role(Role::TenantAdmin)
    {
        Ok(())
    } else {
        Err(ReviewError::forbidden(format!(
            "user {} cannot read task {}",
            actor.user_id, task.id
        )))
    }
}
