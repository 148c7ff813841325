// Version lifecycle state machine.
//
// Pure decision logic: which status transitions are legal for a version and
// when a task may open a new version. Storage and side effects live in the
// orchestration and review layers.

pub mod errors;
pub mod events;
pub mod guards;
pub mod states;
pub mod version_state_machine;

// Re-export main types for convenient access
pub use errors::{GuardError, StateMachineError, StateMachineResult};
pub use events::VersionEvent;
pub use guards::{
    can_start_resubmission, can_transition, ensure_resubmission_allowed, ensure_transition,
    StateGuard, TransitionContext,
};
pub use states::{FilesReady, ReviewDecision, TaskStatus, VersionStatus};
pub use version_state_machine::VersionStateMachine;
