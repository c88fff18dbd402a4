//! Prompt and instruction text for the recovery oracles

use crate::types::FailureContext;
use serde_json::Value;

/// Standing instructions for the plan generator
pub const PLANNER_SYSTEM: &str = "\
You diagnose failed steps of an RPA robot from the current screenshot and \
produce a recovery plan.

Group the work into coarse, logical steps (for example \"Fill in the login \
form\"), never one step per click or keystroke. The last step must leave the \
application ready for the failed activity to run again.

Reply with a single JSON object and nothing else:
{\"reasoning\": {\"failure_analysis\": \"...\", \"ui_state\": \"...\", \
\"recovery_approach\": \"...\", \"challenges\": \"...\"}, \"steps\": [\"...\"]}";

fn json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Failure summary shared by every strategy
#[must_use]
pub fn failure_summary(failure: &FailureContext) -> String {
    format!(
        "Task: {}\nAction History: {}\nFailed Action: {}\nFuture Activities: {}\nVariables: {}",
        failure.task,
        json(&failure.action_history),
        json(&Value::Object(failure.failed_activity.clone())),
        json(&failure.future_activities),
        json(&failure.variables),
    )
}

/// Planner user turn, optionally describing why the previous plan was dropped
#[must_use]
pub fn planner_request(failure: &FailureContext, replan_reason: Option<&str>) -> String {
    let mut text = failure_summary(failure);
    if let Some(reason) = replan_reason {
        text.push_str("\n\nThe previous recovery plan could not be completed: ");
        text.push_str(reason);
        text.push_str("\nPlan again from the current screen.");
    }
    text
}

/// Grounding instruction for one plan step
#[must_use]
pub fn step_instruction(
    failure: &FailureContext,
    step: &str,
    history: &[String],
    is_final: bool,
) -> String {
    let history = if history.is_empty() {
        "none".to_string()
    } else {
        history.join("; ")
    };
    let closing = if is_final {
        "This is the final step of the plan. Call finished() once it is done."
    } else {
        "Call finished() as soon as this step is done; later steps are handled separately."
    };
    format!(
        "Process goal: {}\nCurrent step: {step}\nStep history: {history}\nVariables: {}\n{closing}",
        failure.task,
        json(&failure.variables),
    )
}

/// Grounding instruction for plan-less strategies
#[must_use]
pub fn recovery_instruction(failure: &FailureContext) -> String {
    format!(
        "Recover the robot from the failed action below so that it can continue.\n{}",
        failure_summary(failure)
    )
}
