//! # Database Operations
//!
//! Persistence for review tasks, versions and file metadata.
//!
//! - [`store`] - the [`ReviewStore`] trait every service talks to
//! - [`postgres`] - PostgreSQL implementation over a `sqlx` pool
//! - [`in_memory`] - in-process implementation with fault injection for tests
//! - [`migrations`] - embedded schema with advisory-lock protected application

pub mod errors;
pub mod in_memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use in_memory::{FaultPoint, InMemoryReviewStore};
pub use migrations::DatabaseMigrations;
pub use postgres::PgReviewStore;
pub use store::{ReplicationOutcome, ReviewStore, PREPARING_CONSTRAINT, TASK_NAME_CONSTRAINT};
