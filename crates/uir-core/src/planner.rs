//! Plan Generator
//!
//! Failure context plus the current screenshot in, [`RecoveryPlan`] out.
//! The generator holds no state; its oracle call is guarded by the caller.

use crate::context::RecoveryContext;
use crate::error::{PlanError, RecoveryError};
use crate::prompts::{planner_request, PLANNER_SYSTEM};
use crate::types::{FailureContext, RecoveryPlan};
use uir_grounding::Conversation;
use uir_vision::Screenshot;

/// Produces recovery plans through the planner oracle
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanGenerator;

impl PlanGenerator {
    /// Create a plan generator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Ask the planner oracle for a plan
    ///
    /// # Errors
    /// [`RecoveryError::Planning`] when the oracle fails or its answer is not a
    /// non-empty plan.
    pub async fn generate(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
        screenshot: &Screenshot,
        replan_reason: Option<&str>,
    ) -> Result<RecoveryPlan, RecoveryError> {
        let mut conversation = Conversation::new().with_system(PLANNER_SYSTEM);
        conversation.push_user_with_screenshot(
            planner_request(failure, replan_reason),
            screenshot.clone(),
        );

        let response = ctx
            .collaborators()
            .planner
            .complete(&conversation)
            .await
            .map_err(PlanError::from)?;
        let plan = parse_plan(&response)?;

        tracing::info!(
            recovery_id = %ctx.id(),
            steps = plan.steps.len(),
            replan = replan_reason.is_some(),
            "recovery plan generated"
        );
        Ok(plan)
    }
}

/// Extract a plan from oracle text: bare JSON, fenced JSON, or JSON inside prose.
///
/// Step descriptions are trimmed and blank ones dropped.
///
/// # Errors
/// [`PlanError::NoJson`], [`PlanError::Malformed`] or [`PlanError::EmptyPlan`].
pub fn parse_plan(text: &str) -> Result<RecoveryPlan, PlanError> {
    let start = text.find('{').ok_or(PlanError::NoJson)?;
    let end = text.rfind('}').ok_or(PlanError::NoJson)?;
    if end < start {
        return Err(PlanError::NoJson);
    }

    let mut plan: RecoveryPlan = serde_json::from_str(&text[start..=end])?;
    plan.steps = plan
        .steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if plan.steps.is_empty() {
        return Err(PlanError::EmptyPlan);
    }
    Ok(plan)
}
