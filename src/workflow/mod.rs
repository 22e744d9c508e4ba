//! Configurable task-status workflow engine
//!
//! Tasks move through a graph-shaped state machine described by a
//! [`WorkflowDefinition`]: statuses are nodes, transitions are directed
//! edges, and edges may be gated to specific roles. There is no fixed linear
//! status list; each tenant's graph is authored by an admin and swapped
//! atomically on update.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskflow::workflow::{Actor, WorkflowOrchestrator};
//!
//! let orchestrator = WorkflowOrchestrator::new(db.clone());
//! let actor = Actor::new(user_id, role);
//!
//! // probe first so the UI only offers legal actions
//! let probe = orchestrator
//!     .validate_transition(workflow_id, "pending", "in_progress", &actor.role)
//!     .await?;
//!
//! if probe.valid {
//!     let task = orchestrator.change_status(task_id, "in_progress", &actor).await?;
//! }
//! ```

pub mod definition;
pub mod entities;
pub mod events;
pub mod orchestrator;
pub mod store;
pub mod validator;

pub use definition::{
    RoleRestrictionSpec, StatusSpec, TransitionSpec, WorkflowDefinition, WorkflowGraph,
};
pub use events::{EventSink, NullSink, StatusChanged};
pub use orchestrator::{Actor, Probe, WorkflowOrchestrator};
pub use validator::{validate, Admitted};
