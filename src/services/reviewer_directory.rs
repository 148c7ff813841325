//! # Reviewer Directory
//!
//! Read-only view of the user collaborator: who exists in a tenant, which
//! roles they hold and whether they are active. User CRUD lives elsewhere.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::try_join_all;

use crate::error::ReviewResult;
use crate::models::UserProfile;

#[async_trait]
pub trait ReviewerDirectory: Send + Sync + 'static {
    async fn find_user(&self, tenant_id: i64, user_id: i64) -> ReviewResult<Option<UserProfile>>;

    /// Active users of the tenant holding the reviewer role
    async fn list_active_reviewers(&self, tenant_id: i64) -> ReviewResult<Vec<UserProfile>>;
}

/// Display names of `user_ids` within a tenant. Users the directory does
/// not know are left out.
pub async fn display_names(
    directory: &dyn ReviewerDirectory,
    tenant_id: i64,
    user_ids: impl IntoIterator<Item = i64>,
) -> ReviewResult<HashMap<i64, String>> {
    let distinct: BTreeSet<i64> = user_ids.into_iter().collect();
    let profiles = try_join_all(
        distinct
            .into_iter()
            .map(|user_id| directory.find_user(tenant_id, user_id)),
    )
    .await?;
    Ok(profiles
        .into_iter()
        .flatten()
        .map(|profile| (profile.user_id, profile.display_name))
        .collect())
}

/// Directory backed by a concurrent map, for tests and embedded use
#[derive(Debug, Default)]
pub struct InMemoryReviewerDirectory {
    users: DashMap<(i64, i64), UserProfile>,
    listings: AtomicU64,
}

impl InMemoryReviewerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: UserProfile) {
        self.users
            .insert((profile.tenant_id, profile.user_id), profile);
    }

    pub fn set_active(&self, tenant_id: i64, user_id: i64, active: bool) {
        if let Some(mut profile) = self.users.get_mut(&(tenant_id, user_id)) {
            profile.active = active;
        }
    }

    /// Number of `list_active_reviewers` calls served (cache hit checks)
    pub fn listing_count(&self) -> u64 {
        self.listings.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReviewerDirectory for InMemoryReviewerDirectory {
    async fn find_user(&self, tenant_id: i64, user_id: i64) -> ReviewResult<Option<UserProfile>> {
        Ok(self
            .users
            .get(&(tenant_id, user_id))
            .map(|entry| entry.value().clone()))
    }

    async fn list_active_reviewers(&self, tenant_id: i64) -> ReviewResult<Vec<UserProfile>> {
        self.listings.fetch_add(1, Ordering::Relaxed);
        let mut reviewers: Vec<UserProfile> = self
            .users
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && entry.is_active_reviewer())
            .map(|entry| entry.value().clone())
            .collect();
        reviewers.sort_by_key(|p| p.user_id);
        Ok(reviewers)
    }
}
