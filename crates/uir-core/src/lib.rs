//! UIR Core - recovery orchestration
//!
//! Recovers an RPA robot from a failed UI step:
//! - Validates the failure context handed over by the exception router
//! - Generates a recovery plan from the failure and a screenshot
//! - Executes plan steps through the grounding loop, replanning on request
//! - Runs plan-less direct and standalone strategies
//! - Accounts every tool call through a per-invocation guard
//!
//! # Example
//!
//! ```rust,ignore
//! use uir_core::{FailureContext, RecoveryConfig, RecoveryOrchestrator, StrategyKind};
//!
//! # async fn example(collaborators: uir_core::Collaborators, failure: FailureContext) {
//! let config = RecoveryConfig::load(None).unwrap().with_strategy(StrategyKind::Planned);
//! let orchestrator = RecoveryOrchestrator::new(config);
//! let ctx = orchestrator.context(collaborators);
//!
//! let report = orchestrator.recover(&ctx, &failure).await;
//! println!("{:?}: {}", report.status, report.result);
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod router;
pub mod state_machine;
pub mod step_executor;
pub mod strategy;
pub mod types;

pub use config::{GroundingSettings, RecoveryConfig, StrategyKind};
pub use context::{tools, Collaborators, Guarded, RecoveryContext};
pub use error::{ConfigError, IntakeError, PlanError, RecoveryError, StateMachineError};
pub use orchestrator::RecoveryOrchestrator;
pub use planner::{parse_plan, PlanGenerator};
pub use router::{
    ExceptionRouter, ExceptionType, RecoveryModule, RobotExceptionRequest, RoutingResponse,
    RoutingStatus,
};
pub use state_machine::{allowed_transitions, validate_transition};
pub use step_executor::{StepExecutor, StepRequest};
pub use strategy::{
    DirectStrategy, PlannedStrategy, RecoveryRun, RecoveryStrategy, RunSummary,
    StandaloneStrategy,
};
pub use types::{
    ExceptionReport, FailureContext, PlanReasoning, RecoveryId, RecoveryPlan, RecoveryReport,
    RecoveryStatus, Step, StepExecutionResult, StepSignal, StepStatus,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running recoveries
    pub use crate::{
        Collaborators, ExceptionRouter, FailureContext, RecoveryConfig, RecoveryContext,
        RecoveryOrchestrator, RecoveryReport, RecoveryStatus, StrategyKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
