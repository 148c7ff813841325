//! # Database Migration System
//!
//! Applies the embedded review schema with version tracking. Concurrent
//! starters (several worker processes booting at once) serialize on a
//! PostgreSQL advisory lock:
//!
//! ```sql
//! SELECT pg_advisory_lock(7311503120846221)
//! ```
//!
//! Every migration is idempotent SQL, so re-applying after a crash between
//! the script and its tracking row is harmless.

use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::info;

use super::errors::StoreResult;

/// Lock key for schema initialization
const LOCK_KEY: i64 = 7_311_503_120_846_221;

const MIGRATION_TABLE: &str = "review_schema_migrations";

/// A single embedded migration script
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: &'static str,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Ordered by version
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: "20260301000000",
    name: "create_review_schema",
    sql: include_str!("../../migrations/20260301000000_create_review_schema.sql"),
}];

/// Manages database schema migrations with concurrency safety.
pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Run all outstanding migrations in order
    pub async fn run_all(pool: &PgPool) -> StoreResult<usize> {
        let mut conn = pool.acquire().await?;

        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let result = Self::apply_outstanding(&mut conn).await;

        // Always release the lock
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        result
    }

    async fn apply_outstanding(conn: &mut sqlx::PgConnection) -> StoreResult<usize> {
        sqlx::raw_sql(&format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
                version VARCHAR(14) PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ))
        .execute(&mut *conn)
        .await?;

        let applied: HashSet<String> =
            sqlx::query(&format!("SELECT version FROM {MIGRATION_TABLE}"))
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| row.try_get::<String, _>("version"))
                .collect::<Result<_, _>>()?;

        let mut count = 0;
        for migration in MIGRATIONS {
            if applied.contains(migration.version) {
                continue;
            }
            info!(
                version = migration.version,
                name = migration.name,
                "🗄️ Applying migration"
            );
            sqlx::raw_sql(migration.sql).execute(&mut *conn).await?;
            sqlx::query(&format!(
                "INSERT INTO {MIGRATION_TABLE} (version) VALUES ($1) ON CONFLICT DO NOTHING"
            ))
            .bind(migration.version)
            .execute(&mut *conn)
            .await?;
            count += 1;
        }

        Ok(count)
    }
}
