//! Transition admissibility
//!
//! [`validate`] is a pure function over a definition snapshot: no side
//! effects, safe to call speculatively (the UI uses it to decide which
//! actions to offer) and safe to call concurrently.

use crate::error::{Rejection, RejectionCode};
use crate::workflow::definition::WorkflowDefinition;

/// Proof that a transition was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted;

/// Decide whether `actor_role` may move a task from `from` to `to`
///
/// Checks run in a fixed order so rejections are stable:
/// 1. `from == to` is a [`RejectionCode::NoOpTransition`] regardless of the
///    graph; self-loops are never admitted.
/// 2. Either endpoint missing from the definition is
///    [`RejectionCode::UnknownStatus`] (stale client, or a task orphaned by a
///    definition swap).
/// 3. A missing edge is [`RejectionCode::IllegalTransition`].
/// 4. A role gate the actor is not part of is [`RejectionCode::Forbidden`].
pub fn validate(
    definition: &WorkflowDefinition,
    from: &str,
    to: &str,
    actor_role: &str,
) -> Result<Admitted, Rejection> {
    if from == to {
        return Err(Rejection::new(
            RejectionCode::NoOpTransition,
            format!("task is already in status '{}'", from),
        ));
    }

    if !definition.contains_status(from) {
        return Err(Rejection::new(
            RejectionCode::UnknownStatus,
            format!(
                "status '{}' is not part of workflow '{}'",
                from,
                definition.name()
            ),
        ));
    }

    if !definition.contains_status(to) {
        return Err(Rejection::new(
            RejectionCode::UnknownStatus,
            format!(
                "status '{}' is not part of workflow '{}'",
                to,
                definition.name()
            ),
        ));
    }

    if !definition.has_edge(from, to) {
        return Err(Rejection::new(
            RejectionCode::IllegalTransition,
            format!("no transition from '{}' to '{}'", from, to),
        ));
    }

    if let Some(roles) = definition.allowed_roles(from, to) {
        if !roles.contains(actor_role) {
            return Err(Rejection::new(
                RejectionCode::Forbidden,
                format!(
                    "role '{}' may not move tasks from '{}' to '{}'",
                    actor_role, from, to
                ),
            ));
        }
    }

    Ok(Admitted)
}
