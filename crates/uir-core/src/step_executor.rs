//! Step Executor
//!
//! Drives one plan step through successive single-shot grounding rounds:
//! - `finished` from the oracle: the step succeeded
//! - a verified action: record it and ask for the next one
//! - retry ceiling reached: replan
//! - backend, capture or verifier failure: abort
//!
//! A step that needs more than `MAX_ACTIONS_ALLOWED` rounds is handed back
//! for replanning. Whole steps are never retried here.

use crate::context::{tools, RecoveryContext};
use crate::error::RecoveryError;
use crate::prompts::step_instruction;
use crate::types::{FailureContext, Step, StepExecutionResult, StepStatus};
use uir_grounding::{GroundingRequest, GroundingStatus, MAX_ACTIONS_EXCEEDED};

/// Inputs of one step execution besides the step itself
#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    /// Failure being recovered
    pub failure: &'a FailureContext,
    /// Descriptions of steps already completed in this plan
    pub completed: &'a [String],
    /// Whether this is the last step of the plan
    pub is_final: bool,
}

/// Executes plan steps against the live UI
#[derive(Debug, Clone, Copy, Default)]
pub struct StepExecutor;

impl StepExecutor {
    /// Create a step executor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Execute `step`, leaving it `Succeeded` or `Failed`.
    ///
    /// # Errors
    /// [`RecoveryError::InvalidArgument`] for a blank step description and
    /// [`RecoveryError::StateMachine`] when the step is not pending. Every
    /// other outcome is reported through the returned signal.
    pub async fn execute(
        &self,
        ctx: &RecoveryContext,
        step: &mut Step,
        request: StepRequest<'_>,
    ) -> Result<StepExecutionResult, RecoveryError> {
        if step.description.trim().is_empty() {
            return Err(RecoveryError::InvalidArgument(
                "step description must not be empty".to_string(),
            ));
        }
        step.transition(StepStatus::Executing)?;
        tracing::info!(step = step.index, description = %step.description, "executing step");

        let mut history: Vec<String> = request.completed.to_vec();
        let rounds = ctx.grounding_config().max_actions_allowed;

        for round in 1..=rounds {
            let instruction =
                step_instruction(request.failure, &step.description, &history, request.is_final);
            let guarded = ctx
                .invoke(tools::GROUND_ACTION, async {
                    Ok(ctx
                        .grounding_loop()
                        .run(&GroundingRequest::single_shot(instruction))
                        .await)
                })
                .await;
            let throttled = guarded.throttled;
            let outcome = guarded.result?;

            match outcome.status {
                GroundingStatus::Finished => {
                    step.transition(StepStatus::Succeeded)?;
                    return Ok(StepExecutionResult::success(outcome.message));
                }
                GroundingStatus::Verified => {
                    tracing::debug!(step = step.index, round, "step action verified");
                    if let Some(message) = throttled {
                        step.transition(StepStatus::Failed)?;
                        return Ok(StepExecutionResult::abort(message));
                    }
                    history.extend(
                        outcome
                            .executed
                            .iter()
                            .filter(|executed| executed.verified())
                            .map(|executed| executed.action.action.to_string()),
                    );
                }
                GroundingStatus::Exhausted => {
                    step.transition(StepStatus::Failed)?;
                    return Ok(StepExecutionResult::replan(outcome.message));
                }
                GroundingStatus::Fatal => {
                    step.transition(StepStatus::Failed)?;
                    return Ok(StepExecutionResult::abort(outcome.message));
                }
            }
        }

        tracing::warn!(step = step.index, rounds, "step did not finish within action ceiling");
        step.transition(StepStatus::Failed)?;
        Ok(StepExecutionResult::replan(MAX_ACTIONS_EXCEEDED))
    }
}
