//! # Statistics Service
//!
//! Read-through statistics for creators and reviewers, and the cached list
//! of reviewers a creator may assign.
//!
//! Snapshots are counted on each task's current status. Writers evict the
//! affected keys after commit, so a read right after a state change always
//! reaches the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use super::reviewer_directory::ReviewerDirectory;
use crate::cache::{keys, ReviewCache};
use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::identity::{Actor, Role};
use crate::models::statistics::month_start;
use crate::models::{ReviewerOption, StatisticsScope, TaskCountFilter, TaskStatistics};
use crate::state_machine::TaskStatus;

#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn ReviewStore>,
    directory: Arc<dyn ReviewerDirectory>,
    cache: ReviewCache,
}

impl std::fmt::Debug for StatisticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl StatisticsService {
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

    /// Counters over the tasks the actor created
    #[instrument(skip(self, actor), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn load_creator_statistics(&self, actor: &Actor) -> ReviewResult<TaskStatistics> {
        let key = keys::user_statistics(actor.tenant_id, actor.user_id);
        self.load(
            &key,
            actor.tenant_id,
            StatisticsScope::Creator(actor.user_id),
        )
        .await
    }

    /// Counters over the tasks assigned to the actor
    #[instrument(skip(self, actor), fields(tenant_id = actor.tenant_id, user_id = actor.user_id))]
    pub async fn load_reviewer_statistics(&self, actor: &Actor) -> ReviewResult<TaskStatistics> {
        if !actor.has_role(Role::Reviewer) {
            return Err(ReviewError::forbidden("reviewer role required"));
        }
        let key = keys::reviewer_statistics(actor.tenant_id, actor.user_id);
        self.load(
            &key,
            actor.tenant_id,
            StatisticsScope::Reviewer(actor.user_id),
        )
        .await
    }

    /// Active reviewers of the actor's tenant
    pub async fn list_reviewers(&self, actor: &Actor) -> ReviewResult<Vec<ReviewerOption>> {
        if let Some(options) = self.cache.reviewer_options(actor.tenant_id).await {
            debug!(tenant_id = actor.tenant_id, "Reviewer options cache hit");
            return Ok(options);
        }

        let options: Vec<ReviewerOption> = self
            .directory
            .list_active_reviewers(actor.tenant_id)
            .await?
            .iter()
            .map(ReviewerOption::from)
            .collect();

        self.cache
            .store_reviewer_options(actor.tenant_id, &options)
            .await;
        Ok(options)
    }

    /// Drop the cached reviewer list after the directory changed
    pub async fn evict_reviewer_options(&self, tenant_id: i64) {
        self.cache.evict_reviewer_options(tenant_id).await;
    }

    async fn load(
        &self,
        key: &str,
        tenant_id: i64,
        scope: StatisticsScope,
    ) -> ReviewResult<TaskStatistics> {
        if let Some(stats) = self.cache.statistics(key).await {
            debug!(key = key, "Statistics cache hit");
            return Ok(stats);
        }

        // Taken before counting so an eviction racing the count is noticed
        let generation = self.cache.statistics_generation(key);
        let stats = self.count(tenant_id, scope).await?;
        if !self.cache.store_statistics(key, &stats, generation).await {
            debug!(key = key, "Statistics evicted while counting, snapshot not cached");
        }
        Ok(stats)
    }

    async fn count(&self, tenant_id: i64, scope: StatisticsScope) -> ReviewResult<TaskStatistics> {
        let since = month_start(Utc::now());
        let all = TaskCountFilter::new(tenant_id, scope);
        let reviewing = all.with_status(TaskStatus::Reviewing);
        let approved = all.with_status(TaskStatus::Approved);
        let rejected = all.with_status(TaskStatus::Rejected);
        let this_month = all.created_since(since);
        let approved_this_month = approved.created_since(since);

        let (total, reviewing, approved, rejected, month_total, month_approved) = futures::try_join!(
            self.store.count_tasks(&all),
            self.store.count_tasks(&reviewing),
            self.store.count_tasks(&approved),
            self.store.count_tasks(&rejected),
            self.store.count_tasks(&this_month),
            self.store.count_tasks(&approved_this_month),
        )?;

        Ok(TaskStatistics::from_counts(
            total,
            reviewing,
            approved,
            rejected,
            month_total,
            month_approved,
        ))
    }
}
