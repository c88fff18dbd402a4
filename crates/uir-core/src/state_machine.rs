//! Step transition table
//!
//! `Pending -> Executing -> {Succeeded | Failed}`; a failed step is either
//! aborted or returned to `Pending` by a replan. Steps that never ran are
//! aborted when the orchestration stops.

use crate::error::StateMachineError;
use crate::types::StepStatus;

/// Validates a step transition.
///
/// # Errors
/// [`StateMachineError::IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(from: StepStatus, to: StepStatus) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// Statuses reachable from `from` in one transition
#[must_use]
pub fn allowed_transitions(from: StepStatus) -> Vec<StepStatus> {
    use StepStatus::{Aborted, Executing, Failed, Pending, Succeeded};
    match from {
        Pending => vec![Executing, Aborted],
        Executing => vec![Succeeded, Failed],
        Failed => vec![Pending, Aborted],
        Succeeded | Aborted => vec![],
    }
}
