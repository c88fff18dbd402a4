//! Error types for UIR Core
//!
//! Provides error handling for:
//! - Failure-context intake validation
//! - Plan generation
//! - Configuration loading
//! - Step state transitions
//!
//! Stage-level operations convert these into report objects; they are
//! `Result`s only inside the crate and at tool boundaries.

use uir_grounding::OracleError;
use uir_guard::CallOutcome;
use uir_vision::{CaptureError, VisionError};

/// Main recovery error type
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// Tool arguments failed intake validation
    #[error("invalid arguments: {0}")]
    Intake(#[from] IntakeError),

    /// A single argument was rejected
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Plan generation failed
    #[error("plan generation failed: {0}")]
    Planning(#[from] PlanError),

    /// Screenshot acquisition failed
    #[error("screen capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Image decode or comparison failed
    #[error("visual verification failed: {0}")]
    Vision(#[from] VisionError),

    /// Illegal step transition
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RecoveryError {
    /// How the Tool Invocation Guard should account for a call that failed with this error
    #[must_use]
    pub fn call_outcome(&self) -> CallOutcome {
        match self {
            Self::Intake(e) if e.is_type_error() => CallOutcome::ArgumentTypeFailure,
            Self::Intake(_) | Self::InvalidArgument(_) => CallOutcome::ValidationFailure,
            _ => CallOutcome::Failure,
        }
    }
}

/// FailureContext intake errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    /// Arguments are not a JSON object
    #[error("arguments must be an object")]
    NotAnObject,

    /// Field absent or null
    #[error("{0} is required")]
    Missing(&'static str),

    /// Field present with the wrong JSON type
    #[error("{field} must be a {expected}")]
    WrongType {
        /// Field name
        field: &'static str,
        /// Expected JSON type
        expected: &'static str,
    },
}

impl IntakeError {
    /// Whether the arguments had the wrong shape rather than missing content
    #[inline]
    #[must_use]
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::NotAnObject | Self::WrongType { .. })
    }
}

/// Plan generation errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Planner oracle failed
    #[error("planner oracle failed: {0}")]
    Oracle(#[from] OracleError),

    /// Completion contained no JSON object
    #[error("planner response contains no JSON object")]
    NoJson,

    /// JSON did not match the plan shape
    #[error("planner response is not a valid plan: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Plan had no usable steps
    #[error("recovery plan has no steps")]
    EmptyPlan,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Environment variable could not be parsed
    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Value outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why it is invalid
        reason: String,
    },
}

/// Step state machine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the table
    #[error("illegal step transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current status
        from: crate::types::StepStatus,
        /// Requested status
        to: crate::types::StepStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_messages() {
        assert_eq!(IntakeError::Missing("task").to_string(), "task is required");
        assert_eq!(
            IntakeError::WrongType {
                field: "variables",
                expected: "mapping"
            }
            .to_string(),
            "variables must be a mapping"
        );
    }

    #[test]
    fn outcomes_for_guard() {
        let missing = RecoveryError::from(IntakeError::Missing("task"));
        assert_eq!(missing.call_outcome(), CallOutcome::ValidationFailure);

        let wrong = RecoveryError::from(IntakeError::WrongType {
            field: "action_history",
            expected: "list",
        });
        assert_eq!(wrong.call_outcome(), CallOutcome::ArgumentTypeFailure);

        let plan = RecoveryError::from(PlanError::EmptyPlan);
        assert_eq!(plan.call_outcome(), CallOutcome::Failure);
    }
}
