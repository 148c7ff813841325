//! # PostgreSQL Review Store
//!
//! [`ReviewStore`] over a `sqlx` Postgres pool. Multi-row operations run in a
//! single transaction; status-changing updates carry their precondition in
//! the `WHERE` clause so concurrent writers resolve to one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::store::{ReplicationOutcome, ReviewStore, TASK_NAME_CONSTRAINT};
use crate::config::DatabaseConfig;
use crate::models::statistics::StatisticsScope;
use crate::models::{
    FinalizeVersion, NewPreparingVersion, NewReviewFile, NewReviewTask, Page, PreparingInsert,
    RecordReview, ReviewFile, ReviewTask, ReviewVersion, TaskCountFilter, TaskListFilter,
};
use crate::state_machine::{FilesReady, TaskStatus, VersionStatus};

const TASK_COLUMNS: &str = "id, tenant_id, task_name, creator_id, reviewer_id, \
     current_version, current_status, created_at, updated_at";

const VERSION_COLUMNS: &str = "id, task_id, tenant_id, version_number, status, files_ready, \
     file_count, submit_desc, review_result, review_comment, reviewer_id, submit_time, \
     review_time, created_at, updated_at";

const FILE_COLUMNS: &str = "id, tenant_id, version_id, file_name, object_name, content_hash, \
     file_size, content_type, created_at";

#[derive(Debug, Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;
        debug!(
            max_connections = config.max_connections,
            "Review store connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape LIKE wildcards so a keyword matches literally
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_list_predicate(query: &mut QueryBuilder<'_, Postgres>, filter: &TaskListFilter) {
    query.push(" WHERE tenant_id = ").push_bind(filter.tenant_id);
    match filter.scope {
        StatisticsScope::Creator(user_id) => {
            query.push(" AND creator_id = ").push_bind(user_id);
        }
        StatisticsScope::Reviewer(user_id) => {
            query.push(" AND reviewer_id = ").push_bind(user_id);
        }
    }
    if let Some(status) = filter.status {
        query.push(" AND current_status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &filter.name_contains {
        query
            .push(" AND task_name ILIKE ")
            .push_bind(like_pattern(keyword));
    }
    if let Some(from) = filter.created_from {
        query.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(before) = filter.created_before {
        query.push(" AND created_at < ").push_bind(before);
    }
}

fn task_from_row(row: &PgRow) -> StoreResult<ReviewTask> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("current_status")?;
    let current_status = status
        .parse::<TaskStatus>()
        .map_err(|e| StoreError::corrupt_row("review_task", id, e))?;

    Ok(ReviewTask {
        id,
        tenant_id: row.try_get("tenant_id")?,
        task_name: row.try_get("task_name")?,
        creator_id: row.try_get("creator_id")?,
        reviewer_id: row.try_get("reviewer_id")?,
        current_version: row.try_get("current_version")?,
        current_status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn version_from_row(row: &PgRow) -> StoreResult<ReviewVersion> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<VersionStatus>()
        .map_err(|e| StoreError::corrupt_row("review_version", id, e))?;
    let files_ready: i16 = row.try_get("files_ready")?;
    let files_ready = FilesReady::try_from(files_ready)
        .map_err(|e| StoreError::corrupt_row("review_version", id, e))?;
    let review_result: Option<String> = row.try_get("review_result")?;
    let review_result = review_result
        .map(|r| r.parse::<VersionStatus>())
        .transpose()
        .map_err(|e| StoreError::corrupt_row("review_version", id, e))?;

    Ok(ReviewVersion {
        id,
        task_id: row.try_get("task_id")?,
        tenant_id: row.try_get("tenant_id")?,
        version_number: row.try_get("version_number")?,
        status,
        files_ready,
        file_count: row.try_get("file_count")?,
        submit_desc: row.try_get("submit_desc")?,
        review_result,
        review_comment: row.try_get("review_comment")?,
        reviewer_id: row.try_get("reviewer_id")?,
        submit_time: row.try_get("submit_time")?,
        review_time: row.try_get("review_time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn file_from_row(row: &PgRow) -> StoreResult<ReviewFile> {
    Ok(ReviewFile {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        version_id: row.try_get("version_id")?,
        file_name: row.try_get("file_name")?,
        object_name: row.try_get("object_name")?,
        content_hash: row.try_get("content_hash")?,
        file_size: row.try_get("file_size")?,
        content_type: row.try_get("content_type")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Map a unique violation onto [`StoreError::ConstraintViolation`]
fn map_unique_violation(err: sqlx::Error, fallback_constraint: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::constraint_violation(
            db.constraint().unwrap_or(fallback_constraint),
            db.message(),
        ),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn create_task(
        &self,
        new_task: NewReviewTask,
    ) -> StoreResult<(ReviewTask, ReviewVersion)> {
        let mut tx = self.pool.begin().await?;

        let task_row = sqlx::query(&format!(
            "INSERT INTO review_task \
                 (tenant_id, task_name, creator_id, reviewer_id, current_version, current_status) \
             VALUES ($1, $2, $3, $4, 1, 'REVIEWING') \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(new_task.tenant_id)
        .bind(&new_task.task_name)
        .bind(new_task.creator_id)
        .bind(new_task.reviewer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, TASK_NAME_CONSTRAINT))?;
        let task = task_from_row(&task_row)?;

        let version_row = sqlx::query(&format!(
            "INSERT INTO review_version \
                 (task_id, tenant_id, version_number, status, files_ready, file_count, \
                  submit_desc, reviewer_id, submit_time) \
             VALUES ($1, $2, 1, 'REVIEWING', 1, 0, $3, $4, NOW()) \
             RETURNING {VERSION_COLUMNS}"
        ))
        .bind(task.id)
        .bind(task.tenant_id)
        .bind(&new_task.submit_desc)
        .bind(task.reviewer_id)
        .fetch_one(&mut *tx)
        .await?;
        let version = version_from_row(&version_row)?;

        tx.commit().await?;
        Ok((task, version))
    }

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<ReviewTask>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM review_task WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn task_name_exists(&self, tenant_id: i64, task_name: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM review_task WHERE tenant_id = $1 AND task_name = $2)",
        )
        .bind(tenant_id)
        .bind(task_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_tasks(&self, filter: &TaskCountFilter) -> StoreResult<i64> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM review_task WHERE tenant_id = ");
        query.push_bind(filter.tenant_id);

        match filter.scope {
            StatisticsScope::Creator(user_id) => {
                query.push(" AND creator_id = ").push_bind(user_id);
            }
            StatisticsScope::Reviewer(user_id) => {
                query.push(" AND reviewer_id = ").push_bind(user_id);
            }
        }
        if let Some(status) = filter.status {
            query.push(" AND current_status = ").push_bind(status.as_str());
        }
        if let Some(since) = filter.created_since {
            query.push(" AND created_at >= ").push_bind(since);
        }

        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_tasks(&self, filter: &TaskListFilter) -> StoreResult<Page<ReviewTask>> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM review_task");
        push_list_predicate(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        if total == 0 {
            return Ok(Page::new(Vec::new(), 0, filter.page));
        }

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM review_task"));
        push_list_predicate(&mut query, filter);
        query
            .push(" ORDER BY updated_at DESC, id DESC LIMIT ")
            .push_bind(filter.page.limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let rows = query.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(task_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total, filter.page))
    }

    async fn find_current_versions(&self, task_ids: &[i64]) -> StoreResult<Vec<ReviewVersion>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM review_version \
             WHERE (task_id, version_number) IN \
                   (SELECT id, current_version FROM review_task WHERE id = ANY($1))"
        ))
        .bind(task_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn find_version(&self, version_id: i64) -> StoreResult<Option<ReviewVersion>> {
        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM review_version WHERE id = $1"
        ))
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn find_preparing_version(&self, task_id: i64) -> StoreResult<Option<ReviewVersion>> {
        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM review_version \
             WHERE task_id = $1 AND status = 'PREPARING'"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn list_versions(&self, task_id: i64) -> StoreResult<Vec<ReviewVersion>> {
        let rows = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM review_version \
             WHERE task_id = $1 ORDER BY version_number DESC"
        ))
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn insert_preparing_version(
        &self,
        new_version: NewPreparingVersion,
    ) -> StoreResult<PreparingInsert> {
        let mut tx = self.pool.begin().await?;

        // Serializes version numbering per task
        sqlx::query("SELECT id FROM review_task WHERE id = $1 FOR UPDATE")
            .bind(new_version.task_id)
            .fetch_optional(&mut *tx)
            .await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO review_version \
                 (task_id, tenant_id, version_number, status, files_ready, file_count, reviewer_id) \
             SELECT $1, $2, COALESCE(MAX(version_number), 0) + 1, 'PREPARING', $3, 0, $4 \
               FROM review_version WHERE task_id = $1 \
             ON CONFLICT (task_id) WHERE status = 'PREPARING' DO NOTHING \
             RETURNING {VERSION_COLUMNS}"
        ))
        .bind(new_version.task_id)
        .bind(new_version.tenant_id)
        .bind(new_version.files_ready.as_i16())
        .bind(new_version.reviewer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(row) => PreparingInsert::Created(version_from_row(&row)?),
            None => {
                let row = sqlx::query(&format!(
                    "SELECT {VERSION_COLUMNS} FROM review_version \
                     WHERE task_id = $1 AND status = 'PREPARING'"
                ))
                .bind(new_version.task_id)
                .fetch_one(&mut *tx)
                .await?;
                PreparingInsert::Existing(version_from_row(&row)?)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn finalize_version(
        &self,
        finalize: FinalizeVersion,
    ) -> StoreResult<Option<ReviewVersion>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE review_version \
                SET status = 'REVIEWING', submit_desc = $3, file_count = $4, submit_time = NOW(), \
                    review_result = NULL, review_comment = NULL, review_time = NULL, \
                    updated_at = NOW() \
              WHERE id = $1 AND task_id = $2 AND status = 'PREPARING' AND files_ready = 1 \
             RETURNING {VERSION_COLUMNS}"
        ))
        .bind(finalize.version_id)
        .bind(finalize.task_id)
        .bind(&finalize.submit_desc)
        .bind(finalize.file_count)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let version = version_from_row(&row)?;

        sqlx::query(
            "UPDATE review_task \
                SET current_version = $2, current_status = 'REVIEWING', updated_at = NOW() \
              WHERE id = $1",
        )
        .bind(finalize.task_id)
        .bind(version.version_number)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(version))
    }

    async fn record_review(&self, review: RecordReview) -> StoreResult<Option<ReviewVersion>> {
        let target = review.decision.target_status();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE review_version \
                SET status = $3, review_result = $3, review_comment = $4, reviewer_id = $5, \
                    review_time = NOW(), updated_at = NOW() \
              WHERE id = $1 AND task_id = $2 AND status = 'REVIEWING' \
             RETURNING {VERSION_COLUMNS}"
        ))
        .bind(review.version_id)
        .bind(review.task_id)
        .bind(target.as_str())
        .bind(&review.comment)
        .bind(review.reviewer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let version = version_from_row(&row)?;

        sqlx::query(
            "UPDATE review_task SET current_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(review.task_id)
        .bind(target.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(version))
    }

    async fn mark_files_ready(&self, version_id: i64, file_count: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE review_version SET files_ready = 1, file_count = $2, updated_at = NOW() \
              WHERE id = $1 AND status = 'PREPARING'",
        )
        .bind(version_id)
        .bind(file_count)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_files_failed(&self, version_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE review_version SET files_ready = -1, updated_at = NOW() \
              WHERE id = $1 AND status = 'PREPARING' AND files_ready <> 1",
        )
        .bind(version_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_files_copying(&self, version_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE review_version SET files_ready = 0, updated_at = NOW() \
              WHERE id = $1 AND status = 'PREPARING' AND files_ready <> 1",
        )
        .bind(version_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_stale_copies(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ReviewVersion>> {
        let rows = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM review_version \
              WHERE status = 'PREPARING' AND files_ready = 0 AND updated_at <= $1 \
              ORDER BY updated_at ASC LIMIT $2"
        ))
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn list_files(&self, version_id: i64) -> StoreResult<Vec<ReviewFile>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM review_file WHERE version_id = $1 ORDER BY id"
        ))
        .bind(version_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(file_from_row).collect()
    }

    async fn count_files(&self, version_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_file WHERE version_id = $1")
            .bind(version_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_file(&self, file: NewReviewFile) -> StoreResult<ReviewFile> {
        let row = sqlx::query(&format!(
            "INSERT INTO review_file \
                 (tenant_id, version_id, file_name, object_name, content_hash, file_size, content_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(file.tenant_id)
        .bind(file.version_id)
        .bind(&file.file_name)
        .bind(&file.object_name)
        .bind(&file.content_hash)
        .bind(file.file_size)
        .bind(&file.content_type)
        .fetch_one(&self.pool)
        .await?;
        file_from_row(&row)
    }

    async fn replicate_files(
        &self,
        source_version_id: i64,
        target_version_id: i64,
    ) -> StoreResult<Option<ReplicationOutcome>> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM review_version WHERE id = $1 FOR UPDATE")
                .bind(target_version_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(status) = status else {
            tx.rollback().await?;
            return Ok(None);
        };

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review_file WHERE version_id = $1")
                .bind(target_version_id)
                .fetch_one(&mut *tx)
                .await?;

        if status != VersionStatus::Preparing.as_str() {
            tx.rollback().await?;
            return Ok(Some(ReplicationOutcome {
                inserted: 0,
                file_count: existing,
                marked_ready: false,
            }));
        }

        let inserted = if existing == 0 {
            sqlx::query(
                "INSERT INTO review_file \
                     (tenant_id, version_id, file_name, object_name, content_hash, file_size, content_type) \
                 SELECT tenant_id, $2, file_name, object_name, content_hash, file_size, content_type \
                   FROM review_file WHERE version_id = $1 ORDER BY id",
            )
            .bind(source_version_id)
            .bind(target_version_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64
        } else {
            0
        };

        let file_count = existing + inserted;
        sqlx::query(
            "UPDATE review_version SET files_ready = 1, file_count = $2, updated_at = NOW() \
              WHERE id = $1",
        )
        .bind(target_version_id)
        .bind(file_count as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(ReplicationOutcome {
            inserted,
            file_count,
            marked_ready: true,
        }))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 AS health").fetch_one(&self.pool).await?;
        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }
}
