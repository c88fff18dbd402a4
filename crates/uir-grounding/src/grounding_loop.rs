//! Grounding Loop
//!
//! Turns one natural-language instruction into zero or more executed,
//! verified UI actions:
//!
//! 1. capture a "before" screenshot
//! 2. ask the oracle for the next action
//! 3. translate it (a parse failure is a failed attempt)
//! 4. stop on the `finished` sentinel
//! 5. dispatch the action and let the UI settle
//! 6. capture "after" and verify against the action's change expectation
//! 7. single-shot: stop on a verified action; iterative: send the new screen
//! 8. on failure, send a correction turn and try again
//!
//! Every oracle turn is one attempt. The loop admits at most
//! `MAX_UI_ACTION_RETRIES` attempts in single-shot mode and
//! `MAX_ACTIONS_ALLOWED` in iterative mode, then stops with an explicit
//! failure message. Backend disconnects, capture failures and verifier
//! errors stop the loop immediately.

use crate::action::{GroundedAction, UiAction};
use crate::backend::{dispatch, GuiBackend};
use crate::oracle::{CompletionOracle, ContentPart, Conversation};
use crate::prompt::grounding_prompt;
use crate::translator::{ActionTranslator, DEFAULT_REFERENCE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uir_vision::{Resolution, ScreenSource, Screenshot, VerificationResult, VisualVerifier};

/// Correction turn sent after a failed attempt
pub const CORRECTION_PROMPT: &str = "The action failed. Try again";
/// Result text of a verified single-shot action
pub const ACTION_SUCCEEDED: &str = "Action executed successfully.";
/// Result text once the single-shot ceiling is hit
pub const RETRIES_EXHAUSTED: &str = "Action failed after maximum retries.";
/// Result text once the iterative ceiling is hit
pub const MAX_ACTIONS_EXCEEDED: &str = "Exceeded maximum allowed actions.";

/// Loop limits and pacing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingConfig {
    /// Attempt ceiling for single-shot grounding
    pub max_ui_action_retries: u32,
    /// Attempt ceiling for iterative grounding
    pub max_actions_allowed: u32,
    /// Pause between dispatch and the "after" capture
    pub settle_delay: Duration,
    /// Duration of the `wait()` action
    pub wait_duration: Duration,
    /// Reference space of model coordinates
    pub reference: Resolution,
}

impl GroundingConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With single-shot attempt ceiling
    #[inline]
    #[must_use]
    pub fn with_max_ui_action_retries(mut self, max: u32) -> Self {
        self.max_ui_action_retries = max;
        self
    }

    /// With iterative attempt ceiling
    #[inline]
    #[must_use]
    pub fn with_max_actions_allowed(mut self, max: u32) -> Self {
        self.max_actions_allowed = max;
        self
    }

    /// With settle delay
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// With `wait()` duration
    #[inline]
    #[must_use]
    pub fn with_wait_duration(mut self, wait: Duration) -> Self {
        self.wait_duration = wait;
        self
    }

    /// With reference resolution
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: Resolution) -> Self {
        self.reference = reference;
        self
    }
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            max_ui_action_retries: 3,
            max_actions_allowed: 15,
            settle_delay: Duration::from_secs(1),
            wait_duration: Duration::from_secs(5),
            reference: DEFAULT_REFERENCE,
        }
    }
}

/// How far one loop run goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingMode {
    /// Stop after the first verified action
    SingleShot,
    /// Keep acting until `finished`
    Iterative,
}

impl GroundingMode {
    /// Attempt ceiling for this mode
    #[inline]
    #[must_use]
    pub fn ceiling(self, config: &GroundingConfig) -> u32 {
        match self {
            Self::SingleShot => config.max_ui_action_retries,
            Self::Iterative => config.max_actions_allowed,
        }
    }

    /// Failure text once the ceiling is hit
    #[inline]
    #[must_use]
    pub fn exhausted_message(self) -> &'static str {
        match self {
            Self::SingleShot => RETRIES_EXHAUSTED,
            Self::Iterative => MAX_ACTIONS_EXCEEDED,
        }
    }
}

/// One loop run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingRequest {
    /// What to achieve, in natural language
    pub instruction: String,
    /// Single-shot or iterative
    pub mode: GroundingMode,
    /// Overrides the per-action change expectation
    pub expect_change: Option<bool>,
}

impl GroundingRequest {
    /// Single-shot request
    #[must_use]
    pub fn single_shot(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            mode: GroundingMode::SingleShot,
            expect_change: None,
        }
    }

    /// Iterative request
    #[must_use]
    pub fn iterative(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            mode: GroundingMode::Iterative,
            expect_change: None,
        }
    }

    /// With change expectation override
    #[inline]
    #[must_use]
    pub fn with_expect_change(mut self, expect_change: bool) -> Self {
        self.expect_change = Some(expect_change);
        self
    }
}

/// Terminal state of a loop run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingStatus {
    /// Single-shot action executed and verified
    Verified,
    /// Oracle emitted the `finished` sentinel
    Finished,
    /// Attempt ceiling reached
    Exhausted,
    /// Unrecoverable backend, capture or verifier failure
    Fatal,
}

impl GroundingStatus {
    /// Whether the instruction was carried out
    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Verified | Self::Finished)
    }
}

/// An action that reached the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    /// The action
    pub action: GroundedAction,
    /// Before/after comparison; `None` for `wait()`
    pub verification: Option<VerificationResult>,
}

impl ExecutedAction {
    /// Whether the screen behaved as expected
    #[inline]
    #[must_use]
    pub fn verified(&self) -> bool {
        self.verification.map_or(true, |v| v.matches_expectation)
    }
}

/// Report of one loop run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingOutcome {
    /// Terminal state
    pub status: GroundingStatus,
    /// Human-readable result
    pub message: String,
    /// Oracle turns taken
    pub attempts: u32,
    /// Actions that reached the backend, in order
    pub executed: Vec<ExecutedAction>,
    /// `Thought:` sections of the oracle's turns
    pub thoughts: Vec<String>,
    /// Raw oracle turns
    pub transcript: Vec<String>,
}

impl GroundingOutcome {
    /// Whether the instruction was carried out
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    /// Action executed and the screen behaved as expected
    Verified,
    /// Oracle declared the instruction complete
    Finished(String),
    /// Parse failure, oracle failure, rejected action or verification mismatch
    Failed(String),
    /// Nothing more can be done against this desktop
    Fatal(String),
}

/// What the loop does after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Stop(GroundingStatus),
    Retry,
    Advance,
}

/// Attempt transition table
fn transition(mode: GroundingMode, verdict: &Verdict) -> Transition {
    match (mode, verdict) {
        (_, Verdict::Finished(_)) => Transition::Stop(GroundingStatus::Finished),
        (_, Verdict::Fatal(_)) => Transition::Stop(GroundingStatus::Fatal),
        (GroundingMode::SingleShot, Verdict::Verified) => Transition::Stop(GroundingStatus::Verified),
        (GroundingMode::Iterative, Verdict::Verified) => Transition::Advance,
        (_, Verdict::Failed(_)) => Transition::Retry,
    }
}

/// Whether another attempt may start after `taken` attempts
#[inline]
fn admits(taken: u32, ceiling: u32) -> bool {
    taken < ceiling
}

#[derive(Debug, Default)]
struct RunRecord {
    attempts: u32,
    executed: Vec<ExecutedAction>,
    thoughts: Vec<String>,
    transcript: Vec<String>,
}

impl RunRecord {
    fn finish(self, status: GroundingStatus, message: impl Into<String>) -> GroundingOutcome {
        let message = message.into();
        tracing::info!(?status, attempts = self.attempts, %message, "grounding finished");
        GroundingOutcome {
            status,
            message,
            attempts: self.attempts,
            executed: self.executed,
            thoughts: self.thoughts,
            transcript: self.transcript,
        }
    }
}

/// Bounded attempt/verify/retry loop over borrowed collaborators
pub struct GroundingLoop<'a> {
    oracle: &'a dyn CompletionOracle,
    screen: &'a dyn ScreenSource,
    backend: &'a dyn GuiBackend,
    verifier: &'a VisualVerifier,
    config: &'a GroundingConfig,
    translator: ActionTranslator,
}

impl<'a> GroundingLoop<'a> {
    /// Create a loop
    #[must_use]
    pub fn new(
        oracle: &'a dyn CompletionOracle,
        screen: &'a dyn ScreenSource,
        backend: &'a dyn GuiBackend,
        verifier: &'a VisualVerifier,
        config: &'a GroundingConfig,
    ) -> Self {
        Self {
            oracle,
            screen,
            backend,
            verifier,
            config,
            translator: ActionTranslator::new(config.reference),
        }
    }

    /// Run the loop to a terminal state. Never fails; inspect the outcome.
    pub async fn run(&self, request: &GroundingRequest) -> GroundingOutcome {
        let mut record = RunRecord::default();

        let mut before = match self.screen.capture().await {
            Ok(shot) => shot,
            Err(e) => return record.finish(GroundingStatus::Fatal, e.to_string()),
        };
        let screen = match before.resolution() {
            Ok(resolution) => resolution,
            Err(e) => return record.finish(GroundingStatus::Fatal, e.to_string()),
        };

        let mut conversation = Conversation::new();
        conversation.push_user_with_screenshot(
            grounding_prompt(&request.instruction, request.mode, self.config.reference),
            before.clone(),
        );

        let ceiling = request.mode.ceiling(self.config);
        loop {
            if !admits(record.attempts, ceiling) {
                return record.finish(GroundingStatus::Exhausted, request.mode.exhausted_message());
            }
            record.attempts += 1;

            let verdict = self
                .attempt(&mut conversation, &mut before, screen, request, &mut record)
                .await;
            tracing::debug!(attempt = record.attempts, ceiling, ?verdict, "grounding attempt");

            match transition(request.mode, &verdict) {
                Transition::Stop(status) => {
                    let message = match verdict {
                        Verdict::Finished(content) if !content.trim().is_empty() => content,
                        Verdict::Fatal(reason) => reason,
                        _ => ACTION_SUCCEEDED.to_string(),
                    };
                    return record.finish(status, message);
                }
                Transition::Retry => {
                    if let Verdict::Failed(reason) = &verdict {
                        tracing::warn!(attempt = record.attempts, %reason, "grounding attempt failed");
                    }
                    conversation.push_user(vec![
                        ContentPart::Text(CORRECTION_PROMPT.to_string()),
                        ContentPart::Image(before.clone()),
                    ]);
                }
                Transition::Advance => {
                    conversation.push_user(vec![ContentPart::Image(before.clone())]);
                }
            }
        }
    }

    async fn attempt(
        &self,
        conversation: &mut Conversation,
        before: &mut Screenshot,
        screen: Resolution,
        request: &GroundingRequest,
        record: &mut RunRecord,
    ) -> Verdict {
        let response = match self.oracle.complete(conversation).await {
            Ok(text) => text,
            Err(e) => return Verdict::Failed(e.to_string()),
        };
        conversation.push_assistant(response.clone());
        record.transcript.push(response.clone());

        let mut action = match self.translator.translate(&response, screen) {
            Ok(action) => action,
            Err(e) => return Verdict::Failed(format!("unparseable action: {e}")),
        };
        if let Some(thought) = &action.thought {
            record.thoughts.push(thought.clone());
        }
        if let Some(expect_change) = request.expect_change {
            action = action.with_expect_change(expect_change);
        }

        if let UiAction::Finished { content } = &action.action {
            return Verdict::Finished(content.clone());
        }

        if let Err(e) = dispatch(self.backend, &action.action, self.config.wait_duration).await {
            return if e.is_fatal() {
                tracing::error!(error = %e, "backend lost");
                Verdict::Fatal(e.to_string())
            } else {
                Verdict::Failed(e.to_string())
            };
        }
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let after = match self.screen.capture().await {
            Ok(shot) => shot,
            Err(e) => return Verdict::Fatal(e.to_string()),
        };

        if action.action == UiAction::Wait {
            record.executed.push(ExecutedAction {
                action,
                verification: None,
            });
            *before = after;
            return Verdict::Verified;
        }

        let verification = match self.verifier.verify(before, &after, action.expect_change) {
            Ok(result) => result,
            Err(e) => {
                return Verdict::Fatal(format!("visual verification failed, manual judgment required: {e}"))
            }
        };
        record.executed.push(ExecutedAction {
            action,
            verification: Some(verification),
        });
        *before = after;

        if verification.matches_expectation {
            Verdict::Verified
        } else {
            Verdict::Failed(format!(
                "screen did not behave as expected (similarity {:.3})",
                verification.similarity
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use GroundingMode::{Iterative, SingleShot};
        let failed = Verdict::Failed("x".into());
        assert_eq!(transition(SingleShot, &Verdict::Verified), Transition::Stop(GroundingStatus::Verified));
        assert_eq!(transition(Iterative, &Verdict::Verified), Transition::Advance);
        assert_eq!(transition(SingleShot, &failed), Transition::Retry);
        assert_eq!(transition(Iterative, &failed), Transition::Retry);
        for mode in [SingleShot, Iterative] {
            assert_eq!(
                transition(mode, &Verdict::Finished(String::new())),
                Transition::Stop(GroundingStatus::Finished)
            );
            assert_eq!(
                transition(mode, &Verdict::Fatal("gone".into())),
                Transition::Stop(GroundingStatus::Fatal)
            );
        }
    }

    #[test]
    fn admission_is_bounded() {
        assert!(admits(0, 3));
        assert!(admits(2, 3));
        assert!(!admits(3, 3));
        assert!(!admits(0, 0));
    }

    #[test]
    fn ceilings_follow_mode() {
        let config = GroundingConfig::new()
            .with_max_ui_action_retries(2)
            .with_max_actions_allowed(9);
        assert_eq!(GroundingMode::SingleShot.ceiling(&config), 2);
        assert_eq!(GroundingMode::Iterative.ceiling(&config), 9);
        assert_eq!(GroundingMode::Iterative.exhausted_message(), MAX_ACTIONS_EXCEEDED);
    }
}
