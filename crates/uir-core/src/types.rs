//! Core types for UIR
//!
//! Defines the recovery data model:
//! - Failure context received at intake
//! - Recovery plans and their reasoning
//! - Steps and step execution results
//! - The final recovery report and its wire shapes

use crate::config::StrategyKind;
use crate::error::{IntakeError, StateMachineError};
use crate::state_machine::validate_transition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Unique recovery identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecoveryId(pub Ulid);

impl RecoveryId {
    /// Generate new recovery ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RecoveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecoveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context of the GUI step that failed. Immutable after intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureContext {
    /// What the robot was trying to achieve
    pub task: String,
    /// Actions executed before the failure, oldest first
    pub action_history: Vec<Value>,
    /// The action that did not complete
    pub failed_activity: Map<String, Value>,
    /// Actions still planned after the failed one
    #[serde(default)]
    pub future_activities: Vec<Value>,
    /// Process variables
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl FailureContext {
    /// Create a context with empty history, future activities and variables
    #[must_use]
    pub fn new(task: impl Into<String>, failed_activity: Map<String, Value>) -> Self {
        Self {
            task: task.into(),
            action_history: Vec::new(),
            failed_activity,
            future_activities: Vec::new(),
            variables: Map::new(),
        }
    }

    /// With action history
    #[inline]
    #[must_use]
    pub fn with_action_history(mut self, history: Vec<Value>) -> Self {
        self.action_history = history;
        self
    }

    /// With future activities
    #[inline]
    #[must_use]
    pub fn with_future_activities(mut self, future: Vec<Value>) -> Self {
        self.future_activities = future;
        self
    }

    /// With variables
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Validate raw tool arguments into a context.
    ///
    /// `future_activities` and `variables` may be absent; every other field is required.
    /// Keys are accepted in snake case or camel case (`action_history` / `actionHistory`).
    ///
    /// # Errors
    /// [`IntakeError::Missing`] for absent or null fields, [`IntakeError::WrongType`]
    /// for fields of the wrong JSON type.
    pub fn from_value(args: &Value) -> Result<Self, IntakeError> {
        let object = args.as_object().ok_or(IntakeError::NotAnObject)?;
        let field = |name: &'static str| {
            object
                .get(name)
                .or_else(|| object.get(&camel_case(name)))
                .filter(|v| !v.is_null())
        };

        let task = match field("task") {
            None => return Err(IntakeError::Missing("task")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(wrong("task", "string")),
        };
        let action_history = match field("action_history") {
            None => return Err(IntakeError::Missing("action_history")),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return Err(wrong("action_history", "list")),
        };
        let failed_activity = match field("failed_activity") {
            None => return Err(IntakeError::Missing("failed_activity")),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(wrong("failed_activity", "mapping")),
        };
        let future_activities = match field("future_activities") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return Err(wrong("future_activities", "list")),
        };
        let variables = match field("variables") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(wrong("variables", "mapping")),
        };

        Ok(Self {
            task,
            action_history,
            failed_activity,
            future_activities,
            variables,
        })
    }

    /// Short name of the failed activity (`name` field, else its JSON)
    #[must_use]
    pub fn failed_activity_name(&self) -> String {
        self.failed_activity
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(self.failed_activity.clone()).to_string(), str::to_string)
    }
}

fn camel_case(name: &str) -> String {
    let mut parts = name.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn wrong(field: &'static str, expected: &'static str) -> IntakeError {
    IntakeError::WrongType { field, expected }
}

/// Diagnostic reasoning attached to a plan or report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanReasoning {
    /// Why the step failed
    pub failure_analysis: String,
    /// What the screen currently shows
    pub ui_state: String,
    /// How recovery will proceed
    pub recovery_approach: String,
    /// What may go wrong
    pub challenges: String,
}

/// Ordered recovery steps plus reasoning. Replaced wholesale on replan.
///
/// Serializes to the plan-generator report shape `{reasoning, steps}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    /// Diagnostic reasoning
    #[serde(default)]
    pub reasoning: PlanReasoning,
    /// Coarse-grained step descriptions, in order
    pub steps: Vec<String>,
}

impl RecoveryPlan {
    /// Fresh [`Step`]s for this plan, all pending
    #[must_use]
    pub fn to_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, description)| Step::new(index, description.clone()))
            .collect()
    }
}

/// Step lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started
    Pending,
    /// Grounding in progress
    Executing,
    /// Completed
    Succeeded,
    /// Could not be completed
    Failed,
    /// Orchestration stopped before or while running it
    Aborted,
}

impl StepStatus {
    /// Whether no further transition is expected
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted)
    }
}

/// One plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position in its plan
    pub index: usize,
    /// Natural-language description
    pub description: String,
    status: StepStatus,
}

impl Step {
    /// Create a pending step
    #[must_use]
    pub fn new(index: usize, description: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
            status: StepStatus::Pending,
        }
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Move to `to` if the transition table allows it
    ///
    /// # Errors
    /// [`StateMachineError::IllegalTransition`] otherwise; the status is unchanged.
    pub fn transition(&mut self, to: StepStatus) -> Result<(), StateMachineError> {
        validate_transition(self.status, to)?;
        tracing::debug!(step = self.index, from = ?self.status, ?to, "step transition");
        self.status = to;
        Ok(())
    }
}

/// Step executor signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepSignal {
    /// Continue with the next step
    Success,
    /// Discard the plan and ask for a new one
    Replan,
    /// Stop the whole orchestration
    Abort,
}

/// Step execution result shape `{status, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    /// Signal for the orchestrator
    pub status: StepSignal,
    /// Human-readable detail
    pub message: String,
}

impl StepExecutionResult {
    /// Success signal
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: StepSignal::Success,
            message: message.into(),
        }
    }

    /// Replan signal
    #[must_use]
    pub fn replan(message: impl Into<String>) -> Self {
        Self {
            status: StepSignal::Replan,
            message: message.into(),
        }
    }

    /// Abort signal
    #[must_use]
    pub fn abort(message: impl Into<String>) -> Self {
        Self {
            status: StepSignal::Abort,
            message: message.into(),
        }
    }
}

/// Terminal status of a recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    /// The failed step was recovered
    Solved,
    /// Replanning stopped before the plan could be completed
    ReplanExhausted,
    /// Recovery stopped on an abort, a ceiling or an internal failure
    Aborted,
}

/// Exception-handling report shape `{reasoning, steps, result}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionReport {
    /// Diagnostic reasoning
    pub reasoning: PlanReasoning,
    /// Steps of the last plan
    pub steps: Vec<String>,
    /// Outcome text
    pub result: String,
}

/// Final result of one recovery invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Invocation identifier
    pub recovery_id: RecoveryId,
    /// Strategy that ran
    pub strategy: StrategyKind,
    /// Terminal status
    pub status: RecoveryStatus,
    /// Diagnostic reasoning
    pub reasoning: PlanReasoning,
    /// Steps of the last plan (empty for plan-less strategies)
    pub steps: Vec<String>,
    /// Every step that entered execution, across replans
    pub executed_steps: Vec<Step>,
    /// Outcome text
    pub result: String,
    /// Fresh plans requested after the first
    pub replans: u32,
    /// Throttle warnings raised during the run
    pub warnings: Vec<String>,
    /// Final tool call counters
    pub tool_calls: BTreeMap<String, u64>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: DateTime<Utc>,
}

impl RecoveryReport {
    /// Whether recovery succeeded
    #[inline]
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.status == RecoveryStatus::Solved
    }

    /// Whether a usable fix was found (solved, or at least a plan exists)
    #[inline]
    #[must_use]
    pub fn has_fix(&self) -> bool {
        self.is_solved() || !self.steps.is_empty()
    }

    /// Exception-handling report view
    #[must_use]
    pub fn exception_report(&self) -> ExceptionReport {
        ExceptionReport {
            reasoning: self.reasoning.clone(),
            steps: self.steps.clone(),
            result: self.result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intake_accepts_complete_arguments() {
        let ctx = FailureContext::from_value(&json!({
            "task": "log in",
            "action_history": ["open browser"],
            "failed_activity": {"name": "click submit"},
            "future_activities": [],
            "variables": {"user": "alice"}
        }))
        .unwrap();
        assert_eq!(ctx.failed_activity_name(), "click submit");
        assert_eq!(ctx.variables["user"], "alice");
    }

    #[test]
    fn intake_accepts_camel_case_keys() {
        let ctx = FailureContext::from_value(&json!({
            "task": "log in",
            "actionHistory": ["open browser", "navigate login"],
            "failedActivity": {"name": "click submit"},
            "futureActivities": [{"name": "download"}]
        }))
        .unwrap();
        assert_eq!(ctx.action_history.len(), 2);
        assert_eq!(ctx.future_activities.len(), 1);
        assert_eq!(camel_case("failed_activity"), "failedActivity");
    }

    #[test]
    fn intake_optional_fields_default() {
        let ctx = FailureContext::from_value(&json!({
            "task": "t",
            "action_history": [],
            "failed_activity": {},
            "variables": null
        }))
        .unwrap();
        assert!(ctx.future_activities.is_empty());
        assert!(ctx.variables.is_empty());
    }

    #[test]
    fn intake_errors() {
        assert_eq!(FailureContext::from_value(&json!([])), Err(IntakeError::NotAnObject));
        assert_eq!(
            FailureContext::from_value(&json!({"task": "t", "failed_activity": {}})),
            Err(IntakeError::Missing("action_history"))
        );
        assert_eq!(
            FailureContext::from_value(&json!({
                "task": "t", "action_history": "oops", "failed_activity": {}
            })),
            Err(IntakeError::WrongType { field: "action_history", expected: "list" })
        );
    }

    #[test]
    fn step_signal_wire_names() {
        let result = StepExecutionResult::replan("again");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "replan", "message": "again"})
        );
    }

    #[test]
    fn exception_report_wire_shape() {
        let report = ExceptionReport {
            reasoning: PlanReasoning {
                failure_analysis: "submit greyed out".into(),
                ui_state: "login form".into(),
                recovery_approach: "fill password".into(),
                challenges: "none".into(),
            },
            steps: vec!["Fill in the password".into()],
            result: "solved".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "reasoning": {
                    "failure_analysis": "submit greyed out",
                    "ui_state": "login form",
                    "recovery_approach": "fill password",
                    "challenges": "none"
                },
                "steps": ["Fill in the password"],
                "result": "solved"
            })
        );
    }

    #[test]
    fn plan_reasoning_is_lenient() {
        let plan: RecoveryPlan =
            serde_json::from_value(json!({"steps": ["a"], "reasoning": {"ui_state": "login"}})).unwrap();
        assert_eq!(plan.reasoning.ui_state, "login");
        assert_eq!(plan.to_steps()[0].status(), StepStatus::Pending);
    }
}
