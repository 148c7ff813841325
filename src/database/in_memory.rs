//! # In-Memory Review Store
//!
//! Complete [`ReviewStore`] backed by in-process maps for tests and local
//! development. All mutations of one call happen under a single lock, which
//! gives the same atomicity the Postgres transactions provide.
//!
//! Faults can be injected per operation with [`InMemoryReviewStore::fail_on`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::errors::{StoreError, StoreResult};
use super::store::{ReplicationOutcome, ReviewStore, TASK_NAME_CONSTRAINT};
use crate::models::statistics::StatisticsScope;
use crate::models::{
    FinalizeVersion, NewPreparingVersion, NewReviewFile, NewReviewTask, Page, PreparingInsert,
    RecordReview, ReviewFile, ReviewTask, ReviewVersion, TaskCountFilter, TaskListFilter,
};
use crate::state_machine::{FilesReady, TaskStatus, VersionStatus};

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    CreateTask,
    InsertPreparingVersion,
    FinalizeVersion,
    RecordReview,
    MarkFilesReady,
    MarkFilesFailed,
    ListFiles,
    ReplicateFiles,
}

#[derive(Debug, Default)]
struct InMemoryState {
    tasks: HashMap<i64, ReviewTask>,
    versions: HashMap<i64, ReviewVersion>,
    files: HashMap<i64, ReviewFile>,
    next_task_id: i64,
    next_version_id: i64,
    next_file_id: i64,
}

impl InMemoryState {
    fn next_task_id(&mut self) -> i64 {
        self.next_task_id += 1;
        self.next_task_id
    }

    fn next_version_id(&mut self) -> i64 {
        self.next_version_id += 1;
        self.next_version_id
    }

    fn next_file_id(&mut self) -> i64 {
        self.next_file_id += 1;
        self.next_file_id
    }

    fn preparing_for(&self, task_id: i64) -> Option<&ReviewVersion> {
        self.versions
            .values()
            .find(|v| v.task_id == task_id && v.status == VersionStatus::Preparing)
    }

    fn file_count(&self, version_id: i64) -> i64 {
        self.files
            .values()
            .filter(|f| f.version_id == version_id)
            .count() as i64
    }

    fn insert_file(&mut self, file: NewReviewFile, now: DateTime<Utc>) -> ReviewFile {
        let id = self.next_file_id();
        let row = ReviewFile {
            id,
            tenant_id: file.tenant_id,
            version_id: file.version_id,
            file_name: file.file_name,
            object_name: file.object_name,
            content_hash: file.content_hash,
            file_size: file.file_size,
            content_type: file.content_type,
            created_at: now,
        };
        self.files.insert(id, row.clone());
        row
    }
}

/// In-memory store for testing
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    state: Mutex<InMemoryState>,
    faults: DashMap<FaultPoint, u32>,
    count_gate: Mutex<Option<Arc<Semaphore>>>,
    held_counts: AtomicUsize,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls at `point` fail with an unavailable error
    pub fn fail_on(&self, point: FaultPoint, times: u32) {
        self.faults.insert(point, times);
    }

    /// Make every call at `point` fail until [`Self::clear_faults`]
    pub fn fail_always(&self, point: FaultPoint) {
        self.faults.insert(point, u32::MAX);
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Hold every `count_tasks` call after it has read its count, until
    /// [`Self::release_counts`]
    pub fn hold_counts(&self) {
        *self.count_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_counts(&self) {
        if let Some(gate) = self.count_gate.lock().take() {
            gate.close();
        }
    }

    /// Number of `count_tasks` calls currently held
    pub fn held_counts(&self) -> usize {
        self.held_counts.load(Ordering::SeqCst)
    }

    /// Backdate a version's `updated_at` (for stale copy tests)
    pub fn set_version_updated_at(&self, version_id: i64, at: DateTime<Utc>) {
        if let Some(version) = self.state.lock().versions.get_mut(&version_id) {
            version.updated_at = at;
        }
    }

    /// Move a task's timestamps (for list ordering and date window tests)
    pub fn set_task_times(&self, task_id: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        if let Some(task) = self.state.lock().tasks.get_mut(&task_id) {
            task.created_at = created_at;
            task.updated_at = updated_at;
        }
    }

    /// Move a version's `submit_time` (for pending day tests)
    pub fn set_version_submit_time(&self, version_id: i64, at: DateTime<Utc>) {
        if let Some(version) = self.state.lock().versions.get_mut(&version_id) {
            version.submit_time = Some(at);
        }
    }

    /// Number of PREPARING versions for a task
    pub fn preparing_count(&self, task_id: i64) -> usize {
        self.state
            .lock()
            .versions
            .values()
            .filter(|v| v.task_id == task_id && v.status == VersionStatus::Preparing)
            .count()
    }

    fn check_fault(&self, point: FaultPoint) -> StoreResult<()> {
        let mut remove = false;
        let tripped = match self.faults.get_mut(&point) {
            Some(mut remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                    remove = *remaining == 0;
                }
                true
            }
            _ => false,
        };
        if remove {
            self.faults.remove(&point);
        }
        if tripped {
            Err(StoreError::unavailable(format!(
                "injected fault at {point:?}"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn create_task(
        &self,
        new_task: NewReviewTask,
    ) -> StoreResult<(ReviewTask, ReviewVersion)> {
        self.check_fault(FaultPoint::CreateTask)?;
        let mut state = self.state.lock();

        if state
            .tasks
            .values()
            .any(|t| t.tenant_id == new_task.tenant_id && t.task_name == new_task.task_name)
        {
            return Err(StoreError::constraint_violation(
                TASK_NAME_CONSTRAINT,
                format!("task name '{}' already exists", new_task.task_name),
            ));
        }

        let now = Utc::now();
        let task_id = state.next_task_id();
        let task = ReviewTask {
            id: task_id,
            tenant_id: new_task.tenant_id,
            task_name: new_task.task_name,
            creator_id: new_task.creator_id,
            reviewer_id: new_task.reviewer_id,
            current_version: 1,
            current_status: TaskStatus::Reviewing,
            created_at: now,
            updated_at: now,
        };

        let version_id = state.next_version_id();
        let version = ReviewVersion {
            id: version_id,
            task_id,
            tenant_id: task.tenant_id,
            version_number: 1,
            status: VersionStatus::Reviewing,
            files_ready: FilesReady::Ready,
            file_count: 0,
            submit_desc: new_task.submit_desc,
            review_result: None,
            review_comment: None,
            reviewer_id: Some(task.reviewer_id),
            submit_time: Some(now),
            review_time: None,
            created_at: now,
            updated_at: now,
        };

        state.tasks.insert(task_id, task.clone());
        state.versions.insert(version_id, version.clone());
        Ok((task, version))
    }

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<ReviewTask>> {
        Ok(self.state.lock().tasks.get(&task_id).cloned())
    }

    async fn task_name_exists(&self, tenant_id: i64, task_name: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .tasks
            .values()
            .any(|t| t.tenant_id == tenant_id && t.task_name == task_name))
    }

    async fn count_tasks(&self, filter: &TaskCountFilter) -> StoreResult<i64> {
        let count = {
            let state = self.state.lock();
            state
                .tasks
                .values()
                .filter(|t| t.tenant_id == filter.tenant_id)
                .filter(|t| match filter.scope {
                    StatisticsScope::Creator(user_id) => t.creator_id == user_id,
                    StatisticsScope::Reviewer(user_id) => t.reviewer_id == user_id,
                })
                .filter(|t| filter.status.map_or(true, |s| t.current_status == s))
                .filter(|t| filter.created_since.map_or(true, |since| t.created_at >= since))
                .count()
        };

        let gate = self.count_gate.lock().clone();
        if let Some(gate) = gate {
            self.held_counts.fetch_add(1, Ordering::SeqCst);
            // Closed on release; the acquire never succeeds
            let _ = gate.acquire().await;
            self.held_counts.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(count as i64)
    }

    async fn list_tasks(&self, filter: &TaskListFilter) -> StoreResult<Page<ReviewTask>> {
        let state = self.state.lock();
        let mut matching: Vec<&ReviewTask> =
            state.tasks.values().filter(|t| filter.matches(t)).collect();
        matching.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.page.offset() as usize)
            .take(filter.page.limit() as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, filter.page))
    }

    async fn find_current_versions(&self, task_ids: &[i64]) -> StoreResult<Vec<ReviewVersion>> {
        let state = self.state.lock();
        Ok(task_ids
            .iter()
            .filter_map(|id| state.tasks.get(id))
            .filter_map(|task| {
                state.versions.values().find(|v| {
                    v.task_id == task.id && v.version_number == task.current_version
                })
            })
            .cloned()
            .collect())
    }

    async fn find_version(&self, version_id: i64) -> StoreResult<Option<ReviewVersion>> {
        Ok(self.state.lock().versions.get(&version_id).cloned())
    }

    async fn find_preparing_version(&self, task_id: i64) -> StoreResult<Option<ReviewVersion>> {
        Ok(self.state.lock().preparing_for(task_id).cloned())
    }

    async fn list_versions(&self, task_id: i64) -> StoreResult<Vec<ReviewVersion>> {
        let state = self.state.lock();
        let mut versions: Vec<ReviewVersion> = state
            .versions
            .values()
            .filter(|v| v.task_id == task_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn insert_preparing_version(
        &self,
        new_version: NewPreparingVersion,
    ) -> StoreResult<PreparingInsert> {
        self.check_fault(FaultPoint::InsertPreparingVersion)?;
        let mut state = self.state.lock();

        if let Some(existing) = state.preparing_for(new_version.task_id) {
            return Ok(PreparingInsert::Existing(existing.clone()));
        }

        let next_number = state
            .versions
            .values()
            .filter(|v| v.task_id == new_version.task_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;

        let now = Utc::now();
        let id = state.next_version_id();
        let version = ReviewVersion {
            id,
            task_id: new_version.task_id,
            tenant_id: new_version.tenant_id,
            version_number: next_number,
            status: VersionStatus::Preparing,
            files_ready: new_version.files_ready,
            file_count: 0,
            submit_desc: None,
            review_result: None,
            review_comment: None,
            reviewer_id: Some(new_version.reviewer_id),
            submit_time: None,
            review_time: None,
            created_at: now,
            updated_at: now,
        };
        state.versions.insert(id, version.clone());
        Ok(PreparingInsert::Created(version))
    }

    async fn finalize_version(
        &self,
        finalize: FinalizeVersion,
    ) -> StoreResult<Option<ReviewVersion>> {
        self.check_fault(FaultPoint::FinalizeVersion)?;
        let mut state = self.state.lock();
        let now = Utc::now();

        let Some(version) = state.versions.get_mut(&finalize.version_id) else {
            return Ok(None);
        };
        if version.task_id != finalize.task_id
            || version.status != VersionStatus::Preparing
            || !version.files_ready.is_ready()
        {
            return Ok(None);
        }

        version.status = VersionStatus::Reviewing;
        version.submit_desc = finalize.submit_desc;
        version.file_count = finalize.file_count;
        version.submit_time = Some(now);
        version.review_result = None;
        version.review_comment = None;
        version.review_time = None;
        version.updated_at = now;
        let version = version.clone();

        if let Some(task) = state.tasks.get_mut(&finalize.task_id) {
            task.current_version = version.version_number;
            task.current_status = TaskStatus::Reviewing;
            task.updated_at = now;
        }

        Ok(Some(version))
    }

    async fn record_review(&self, review: RecordReview) -> StoreResult<Option<ReviewVersion>> {
        self.check_fault(FaultPoint::RecordReview)?;
        let mut state = self.state.lock();
        let now = Utc::now();
        let target = review.decision.target_status();

        let Some(version) = state.versions.get_mut(&review.version_id) else {
            return Ok(None);
        };
        if version.task_id != review.task_id || version.status != VersionStatus::Reviewing {
            return Ok(None);
        }

        version.status = target;
        version.review_result = Some(target);
        version.review_comment = review.comment;
        version.reviewer_id = Some(review.reviewer_id);
        version.review_time = Some(now);
        version.updated_at = now;
        let version = version.clone();

        if let Some(task) = state.tasks.get_mut(&review.task_id) {
            if let Ok(status) = TaskStatus::try_from(target) {
                task.current_status = status;
            }
            task.updated_at = now;
        }

        Ok(Some(version))
    }

    async fn mark_files_ready(&self, version_id: i64, file_count: i32) -> StoreResult<bool> {
        self.check_fault(FaultPoint::MarkFilesReady)?;
        let mut state = self.state.lock();
        match state.versions.get_mut(&version_id) {
            Some(v) if v.status == VersionStatus::Preparing => {
                v.files_ready = FilesReady::Ready;
                v.file_count = file_count;
                v.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_files_failed(&self, version_id: i64) -> StoreResult<bool> {
        self.check_fault(FaultPoint::MarkFilesFailed)?;
        let mut state = self.state.lock();
        match state.versions.get_mut(&version_id) {
            Some(v) if v.status == VersionStatus::Preparing && !v.files_ready.is_ready() => {
                v.files_ready = FilesReady::Failed;
                v.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_files_copying(&self, version_id: i64) -> StoreResult<bool> {
        let mut state = self.state.lock();
        match state.versions.get_mut(&version_id) {
            Some(v) if v.status == VersionStatus::Preparing && !v.files_ready.is_ready() => {
                v.files_ready = FilesReady::Copying;
                v.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_stale_copies(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ReviewVersion>> {
        let state = self.state.lock();
        let mut stale: Vec<ReviewVersion> = state
            .versions
            .values()
            .filter(|v| {
                v.status == VersionStatus::Preparing
                    && v.files_ready == FilesReady::Copying
                    && v.updated_at <= older_than
            })
            .cloned()
            .collect();
        stale.sort_by_key(|v| v.updated_at);
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }

    async fn list_files(&self, version_id: i64) -> StoreResult<Vec<ReviewFile>> {
        self.check_fault(FaultPoint::ListFiles)?;
        let state = self.state.lock();
        let mut files: Vec<ReviewFile> = state
            .files
            .values()
            .filter(|f| f.version_id == version_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| f.id);
        Ok(files)
    }

    async fn count_files(&self, version_id: i64) -> StoreResult<i64> {
        Ok(self.state.lock().file_count(version_id))
    }

    async fn insert_file(&self, file: NewReviewFile) -> StoreResult<ReviewFile> {
        let mut state = self.state.lock();
        Ok(state.insert_file(file, Utc::now()))
    }

    async fn replicate_files(
        &self,
        source_version_id: i64,
        target_version_id: i64,
    ) -> StoreResult<Option<ReplicationOutcome>> {
        self.check_fault(FaultPoint::ReplicateFiles)?;
        let mut state = self.state.lock();
        let now = Utc::now();

        let target_status = match state.versions.get(&target_version_id) {
            Some(v) => v.status,
            None => return Ok(None),
        };

        let existing = state.file_count(target_version_id);
        if target_status != VersionStatus::Preparing {
            return Ok(Some(ReplicationOutcome {
                inserted: 0,
                file_count: existing,
                marked_ready: false,
            }));
        }

        let mut inserted = 0;
        if existing == 0 {
            let mut sources: Vec<ReviewFile> = state
                .files
                .values()
                .filter(|f| f.version_id == source_version_id)
                .cloned()
                .collect();
            sources.sort_by_key(|f| f.id);
            for source in sources {
                state.insert_file(source.copy_to(target_version_id), now);
                inserted += 1;
            }
        }

        let file_count = existing + inserted;
        if let Some(target) = state.versions.get_mut(&target_version_id) {
            target.files_ready = FilesReady::Ready;
            target.file_count = file_count as i32;
            target.updated_at = now;
        }

        Ok(Some(ReplicationOutcome {
            inserted,
            file_count,
            marked_ready: true,
        }))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}
