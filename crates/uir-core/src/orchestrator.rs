//! Recovery Orchestrator
//!
//! Entry point for one failure-recovery attempt. The orchestrator:
//! - Opens a fresh invocation on the context (counters reset)
//! - Runs the configured strategy
//! - Folds every outcome, including internal errors, into a [`RecoveryReport`]
//!
//! `recover` never fails; an error inside a strategy becomes an `Aborted`
//! report carrying the error text.

use crate::config::{RecoveryConfig, StrategyKind};
use crate::context::{Collaborators, RecoveryContext};
use crate::strategy::{RecoveryRun, RecoveryStrategy};
use crate::types::{FailureContext, PlanReasoning, RecoveryReport, RecoveryStatus};
use chrono::Utc;
use tracing::Instrument;

/// Runs recoveries with one configured strategy
#[derive(Debug, Clone)]
pub struct RecoveryOrchestrator {
    strategy: RecoveryStrategy,
    config: RecoveryConfig,
}

impl RecoveryOrchestrator {
    /// Create an orchestrator for `config`
    #[inline]
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            strategy: RecoveryStrategy::from_config(&config),
            config,
        }
    }

    /// Strategy selected at construction
    #[inline]
    #[must_use]
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Fresh context for one session
    #[must_use]
    pub fn context(&self, collaborators: Collaborators) -> RecoveryContext {
        RecoveryContext::new(collaborators, &self.config)
    }

    /// Recover from `failure` as a new invocation
    pub async fn recover(&self, ctx: &RecoveryContext, failure: &FailureContext) -> RecoveryReport {
        ctx.begin_invocation();
        self.run_invocation(ctx, failure).await
    }

    /// Recover from `failure` within an invocation the caller already opened
    pub async fn run_invocation(
        &self,
        ctx: &RecoveryContext,
        failure: &FailureContext,
    ) -> RecoveryReport {
        let started_at = Utc::now();
        let span = tracing::info_span!(
            "recovery",
            recovery_id = %ctx.id(),
            strategy = %self.strategy.kind(),
        );

        let outcome = async {
            tracing::info!(activity = %failure.failed_activity_name(), "recovery started");
            self.strategy.run(ctx, failure).await
        }
        .instrument(span)
        .await;

        let mut report = RecoveryReport {
            recovery_id: ctx.id(),
            strategy: self.strategy.kind(),
            status: RecoveryStatus::Aborted,
            reasoning: PlanReasoning::default(),
            steps: Vec::new(),
            executed_steps: Vec::new(),
            result: String::new(),
            replans: 0,
            warnings: ctx.warnings(),
            tool_calls: ctx.tool_calls(),
            started_at,
            finished_at: Utc::now(),
        };

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    recovery_id = %ctx.id(),
                    status = ?summary.status,
                    replans = summary.replans,
                    "recovery finished"
                );
                report.status = summary.status;
                report.reasoning = summary.reasoning;
                report.steps = summary.steps;
                report.executed_steps = summary.executed_steps;
                report.result = summary.result;
                report.replans = summary.replans;
            }
            Err(e) => {
                tracing::error!(recovery_id = %ctx.id(), error = %e, "recovery failed");
                report.reasoning.challenges = e.to_string();
                report.result = format!("Recovery aborted: {e}");
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_config() {
        let planned = RecoveryOrchestrator::new(RecoveryConfig::new().with_strategy(StrategyKind::Planned));
        assert_eq!(planned.strategy_kind(), StrategyKind::Planned);

        let default = RecoveryOrchestrator::new(RecoveryConfig::default());
        assert_eq!(default.strategy_kind(), StrategyKind::Standalone);
    }
}
