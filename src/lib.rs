#![allow(clippy::missing_errors_doc)]

//! # Review Core
//!
//! Lifecycle engine for multi-tenant document review.
//!
//! ## Overview
//!
//! A submitter opens a task, attaches files to a numbered version and a
//! reviewer approves or rejects it. A rejected task is resubmitted with a new
//! version, optionally reusing the files of an earlier one. Those files are
//! replicated asynchronously by a worker fleet, and every read model that a
//! state change touches is evicted from the cache before the call returns.
//!
//! ## Architecture
//!
//! ```text
//! client ──► ReplicationOrchestrator ──► message channel ──► CopyJobConsumer
//!                  │                                               │
//!                  ▼                                               ▼
//!            ReviewStore ◄──────────────────────────────────── CopyWorker
//!                  ▲
//! client ──► ReviewGateway ──► ReviewCache (evict after commit)
//! ```
//!
//! ## Module Organization
//!
//! - [`state_machine`] - legal version and task status transitions
//! - [`orchestration`] - resubmission lifecycle, copy dispatch, stale copy reaper
//! - [`worker`] - copy job execution and the queue consumer loop
//! - [`review`] - approve/reject gateway
//! - [`services`] - task submission, statistics, entity reads, queue monitor
//! - [`cache`] - cache providers and the typed review cache
//! - [`messaging`] - copy job transport (RabbitMQ or in-memory)
//! - [`database`] - store trait, PostgreSQL and in-memory stores, migrations
//! - [`config`] - layered configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use review_core::config::ConfigManager;
//! use review_core::identity::{Actor, Role};
//! use review_core::services::InMemoryReviewerDirectory;
//! use review_core::SystemContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?;
//! let context =
//!     SystemContext::from_config(config, Arc::new(InMemoryReviewerDirectory::new())).await?;
//!
//! let creator = Actor::new(1, 10, [Role::User]);
//! let ticket = context
//!     .replication_orchestrator()
//!     .start_resubmission(&creator, 42, 7, true)
//!     .await?;
//! println!("version {} files {}", ticket.version_id, ticket.files_ready);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod identity;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod review;
pub mod services;
pub mod state_machine;
pub mod system_context;
pub mod validation;
pub mod worker;

pub use config::{ConfigManager, ReviewConfig};
pub use error::{ErrorKind, ReviewError, ReviewResult};
pub use identity::{Actor, Role};
pub use orchestration::{ReplicationOrchestrator, ResubmissionTicket, StaleCopyReaper};
pub use review::ReviewGateway;
pub use state_machine::{FilesReady, ReviewDecision, TaskStatus, VersionStatus};
pub use system_context::{SystemContext, SystemHealth};
pub use worker::{CopyJobConsumer, CopyWorker};
