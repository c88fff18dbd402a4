//! Recovery strategies
//!
//! Each strategy implements [`RecoveryRun`]; [`RecoveryStrategy`] is the
//! closed set chosen once when the orchestrator is built.

use crate::config::{RecoveryConfig, StrategyKind};
use crate::context::{tools, RecoveryContext};
use crate::error::RecoveryError;
use crate::planner::PlanGenerator;
use crate::prompts::recovery_instruction;
use crate::step_executor::{StepExecutor, StepRequest};
use crate::types::{
    FailureContext, PlanReasoning, RecoveryStatus, Step, StepExecutionResult, StepSignal,
    StepStatus,
};
use uir_grounding::{GroundingOutcome, GroundingRequest};

/// What a strategy run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Terminal status
    pub status: RecoveryStatus,
    /// Diagnostic reasoning
    pub reasoning: PlanReasoning,
    /// Steps of the last plan
    pub steps: Vec<String>,
    /// Steps that entered execution
    pub executed_steps: Vec<Step>,
    /// Outcome text
    pub result: String,
    /// Fresh plans requested after the first
    pub replans: u32,
}

/// "Run one recovery" contract
#[async_trait::async_trait]
pub trait RecoveryRun: Send + Sync {
    /// Run a recovery for `failure` within an open invocation
    async fn run(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> Result<RunSummary, RecoveryError>;
}

/// Plan, execute step by step, replan on request
#[derive(Debug, Clone, Copy)]
pub struct PlannedStrategy {
    planner: PlanGenerator,
    executor: StepExecutor,
    max_replans: u32,
}

impl PlannedStrategy {
    /// Create with a replan ceiling
    #[must_use]
    pub fn new(max_replans: u32) -> Self {
        Self {
            planner: PlanGenerator::new(),
            executor: StepExecutor::new(),
            max_replans,
        }
    }
}

#[async_trait::async_trait]
impl RecoveryRun for PlannedStrategy {
    async fn run(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> Result<RunSummary, RecoveryError> {
        let mut executed_steps: Vec<Step> = Vec::new();
        let mut replans = 0_u32;
        let mut replan_reason: Option<String> = None;
        let mut planner_throttled = false;

        loop {
            let screenshot = ctx.capture().await?;
            let guarded = ctx
                .invoke(
                    tools::PLAN_GENERATOR,
                    self.planner
                        .generate(ctx, failure, &screenshot, replan_reason.as_deref()),
                )
                .await;
            planner_throttled |= guarded.is_throttled();
            let plan = guarded.result?;

            let mut steps = plan.to_steps();
            let total = steps.len();
            let mut completed: Vec<String> = Vec::new();
            let mut stop: Option<(RecoveryStatus, String)> = None;
            let mut replan_requested: Option<String> = None;

            for index in 0..total {
                let request = StepRequest {
                    failure,
                    completed: &completed,
                    is_final: index + 1 == total,
                };
                let step = &mut steps[index];
                let guarded = ctx
                    .invoke(tools::STEP_EXECUTOR, self.executor.execute(ctx, step, request))
                    .await;
                let result = match guarded.result {
                    Ok(result) => result,
                    Err(e) => StepExecutionResult::abort(e.to_string()),
                };

                match result.status {
                    StepSignal::Success => completed.push(step.description.clone()),
                    StepSignal::Replan => replan_requested = Some(result.message),
                    StepSignal::Abort => {
                        if step.status() == StepStatus::Failed {
                            step.transition(StepStatus::Aborted)?;
                        }
                        stop = Some((RecoveryStatus::Aborted, result.message));
                    }
                }
                // a throttled executor ends the run after the step it just ran
                let more_work = index + 1 < total || replan_requested.is_some();
                match guarded.throttled {
                    Some(message) if stop.is_none() && more_work => {
                        replan_requested = None;
                        stop = Some((RecoveryStatus::Aborted, message));
                    }
                    _ => {}
                }
                if stop.is_some() || replan_requested.is_some() {
                    break;
                }
            }

            let ran = steps
                .iter()
                .filter(|s| s.status() != StepStatus::Pending)
                .count();
            if stop.is_some() {
                for step in steps.iter_mut().filter(|s| s.status() == StepStatus::Pending) {
                    step.transition(StepStatus::Aborted)?;
                }
            }
            executed_steps.extend(steps.iter().take(ran).cloned());

            if let Some((status, result)) = stop {
                return Ok(RunSummary {
                    status,
                    reasoning: plan.reasoning,
                    steps: plan.steps,
                    executed_steps,
                    result,
                    replans,
                });
            }

            let Some(reason) = replan_requested else {
                return Ok(RunSummary {
                    status: RecoveryStatus::Solved,
                    reasoning: plan.reasoning,
                    steps: plan.steps,
                    executed_steps,
                    result: format!(
                        "Recovery plan executed successfully: {total} of {total} steps completed."
                    ),
                    replans,
                });
            };

            if planner_throttled || replans >= self.max_replans {
                tracing::warn!(replans, planner_throttled, "replanning exhausted");
                return Ok(RunSummary {
                    status: RecoveryStatus::ReplanExhausted,
                    reasoning: plan.reasoning,
                    steps: plan.steps,
                    executed_steps,
                    result: format!(
                        "Recovery stopped after {replans} replans. Last failure: {reason}"
                    ),
                    replans,
                });
            }
            replans += 1;
            tracing::info!(replans, %reason, "replanning");
            replan_reason = Some(reason);
        }
    }
}

/// One single-shot grounding round, no plan
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrategy;

#[async_trait::async_trait]
impl RecoveryRun for DirectStrategy {
    async fn run(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> Result<RunSummary, RecoveryError> {
        let request = GroundingRequest::single_shot(recovery_instruction(failure));
        let outcome = ctx
            .invoke(tools::DIRECT_RECOVERY, async {
                Ok(ctx.grounding_loop().run(&request).await)
            })
            .await
            .result?;
        Ok(summarize_grounding(failure, outcome))
    }
}

/// Iterative grounding until `finished`, no plan
#[derive(Debug, Clone, Copy, Default)]
pub struct StandaloneStrategy;

#[async_trait::async_trait]
impl RecoveryRun for StandaloneStrategy {
    async fn run(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> Result<RunSummary, RecoveryError> {
        let request = GroundingRequest::iterative(recovery_instruction(failure));
        let outcome = ctx
            .invoke(tools::STANDALONE_RECOVERY, async {
                Ok(ctx.grounding_loop().run(&request).await)
            })
            .await
            .result?;
        Ok(summarize_grounding(failure, outcome))
    }
}

/// Build a plan-less summary from the oracle's reasoning
fn summarize_grounding(failure: &FailureContext, outcome: GroundingOutcome) -> RunSummary {
    let status = if outcome.is_success() {
        RecoveryStatus::Solved
    } else {
        RecoveryStatus::Aborted
    };
    let reasoning = PlanReasoning {
        failure_analysis: format!("Failed activity: {}", failure.failed_activity_name()),
        ui_state: outcome.thoughts.first().cloned().unwrap_or_default(),
        recovery_approach: outcome.thoughts.join(" "),
        challenges: if outcome.is_success() {
            String::new()
        } else {
            outcome.message.clone()
        },
    };
    let steps = outcome
        .executed
        .iter()
        .filter(|executed| executed.verified())
        .map(|executed| executed.action.action.to_string())
        .collect();
    RunSummary {
        status,
        reasoning,
        steps,
        executed_steps: Vec::new(),
        result: outcome.message,
        replans: 0,
    }
}

/// Strategy chosen at construction
#[derive(Debug, Clone, Copy)]
pub enum RecoveryStrategy {
    /// Plan-then-execute
    Planned(PlannedStrategy),
    /// Single grounded round
    Direct(DirectStrategy),
    /// Iterative grounding
    Standalone(StandaloneStrategy),
}

impl RecoveryStrategy {
    /// Build the configured strategy
    #[must_use]
    pub fn from_config(config: &RecoveryConfig) -> Self {
        match config.strategy {
            StrategyKind::Planned => Self::Planned(PlannedStrategy::new(config.max_replans)),
            StrategyKind::Direct => Self::Direct(DirectStrategy),
            StrategyKind::Standalone => Self::Standalone(StandaloneStrategy),
        }
    }

    /// Strategy kind
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Planned(_) => StrategyKind::Planned,
            Self::Direct(_) => StrategyKind::Direct,
            Self::Standalone(_) => StrategyKind::Standalone,
        }
    }

    fn runner(&self) -> &dyn RecoveryRun {
        match self {
            Self::Planned(s) => s,
            Self::Direct(s) => s,
            Self::Standalone(s) => s,
        }
    }
}

#[async_trait::async_trait]
impl RecoveryRun for RecoveryStrategy {
    async fn run(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> Result<RunSummary, RecoveryError> {
        self.runner().run(ctx, failure).await
    }
}
