//! # Replication Orchestration
//!
//! Resubmission lifecycle on the request path, plus the background reaper
//! that turns lost copy jobs into explicit failures.
//!
//! - [`ReplicationOrchestrator`] - start, finalize and re-trigger resubmissions
//! - [`CopyDispatcher`] - queue or inline execution of copy jobs
//! - [`StaleCopyReaper`] - marks copies stuck past their timeout as failed

pub mod dispatcher;
pub mod reaper;
pub mod replication_orchestrator;

pub use dispatcher::CopyDispatcher;
pub use reaper::StaleCopyReaper;
pub use replication_orchestrator::{ReplicationOrchestrator, ResubmissionTicket};
