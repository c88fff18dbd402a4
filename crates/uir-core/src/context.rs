//! Recovery context and guarded tool invocation
//!
//! Every component receives a [`RecoveryContext`] by parameter. It carries
//! the session collaborators, the per-invocation Tool Invocation Guard and
//! the verifier. There is no ambient state: two contexts never share counters.

use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::types::RecoveryId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use uir_grounding::{CompletionOracle, GroundingConfig, GroundingLoop, GuiBackend};
use uir_guard::{CallOutcome, ToolInvocationGuard};
use uir_vision::{CaptureError, ScreenSource, Screenshot, VisualVerifier};

/// Tool names counted by the guard
pub mod tools {
    /// Intake of a UI exception
    pub const UI_EXCEPTION_HANDLER: &str = "ui_exception_handler";
    /// Plan Generator
    pub const PLAN_GENERATOR: &str = "plan_generator";
    /// Step Executor
    pub const STEP_EXECUTOR: &str = "step_executor";
    /// One single-shot grounding round
    pub const GROUND_ACTION: &str = "ground_action";
    /// Direct strategy round
    pub const DIRECT_RECOVERY: &str = "direct_recovery";
    /// Standalone strategy loop
    pub const STANDALONE_RECOVERY: &str = "standalone_recovery";
    /// Screenshot acquisition
    pub const CAPTURE_SCREEN: &str = "capture_screen";
}

/// External collaborators of one session
#[derive(Clone)]
pub struct Collaborators {
    /// Oracle producing recovery plans
    pub planner: Arc<dyn CompletionOracle>,
    /// Oracle proposing UI actions
    pub grounder: Arc<dyn CompletionOracle>,
    /// Screenshot source
    pub screen: Arc<dyn ScreenSource>,
    /// Input injection backend
    pub backend: Arc<dyn GuiBackend>,
}

impl Collaborators {
    /// Bundle collaborators
    #[must_use]
    pub fn new(
        planner: Arc<dyn CompletionOracle>,
        grounder: Arc<dyn CompletionOracle>,
        screen: Arc<dyn ScreenSource>,
        backend: Arc<dyn GuiBackend>,
    ) -> Self {
        Self {
            planner,
            grounder,
            screen,
            backend,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Result of a guarded call
#[derive(Debug)]
pub struct Guarded<T> {
    /// What the call returned
    pub result: Result<T, RecoveryError>,
    /// Throttle message when the call was over its ceiling
    pub throttled: Option<String>,
}

impl<T> Guarded<T> {
    /// Whether the call was over its ceiling
    #[inline]
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.throttled.is_some()
    }
}

/// Per-invocation state passed down the call graph
#[derive(Debug)]
pub struct RecoveryContext {
    id: RecoveryId,
    collaborators: Collaborators,
    guard: ToolInvocationGuard,
    verifier: VisualVerifier,
    grounding: GroundingConfig,
    warnings: Mutex<Vec<String>>,
}

impl RecoveryContext {
    /// Create a context with a fresh guard
    #[must_use]
    pub fn new(collaborators: Collaborators, config: &RecoveryConfig) -> Self {
        Self {
            id: RecoveryId::new(),
            collaborators,
            guard: ToolInvocationGuard::new(config.tool_limits.clone()),
            verifier: VisualVerifier::new(config.verifier),
            grounding: config.grounding_config(),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Invocation identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> RecoveryId {
        self.id
    }

    /// Session collaborators
    #[inline]
    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Tool Invocation Guard of this invocation
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &ToolInvocationGuard {
        &self.guard
    }

    /// Grounding limits
    #[inline]
    #[must_use]
    pub fn grounding_config(&self) -> &GroundingConfig {
        &self.grounding
    }

    /// Visual verifier
    #[inline]
    #[must_use]
    pub fn verifier(&self) -> &VisualVerifier {
        &self.verifier
    }

    /// Invocation boundary: reset counters and warnings
    pub fn begin_invocation(&self) {
        self.guard.on_invocation_start();
        self.warnings.lock().clear();
        tracing::info!(recovery_id = %self.id, "invocation started");
    }

    /// Run `call` as tool `tool` under the guard.
    ///
    /// The call always runs. Over-ceiling calls carry a throttle message that
    /// is also kept for the final report. Calls failing on malformed
    /// arguments are not counted.
    pub async fn invoke<T, F>(&self, tool: &str, call: F) -> Guarded<T>
    where
        F: Future<Output = Result<T, RecoveryError>>,
    {
        let permit = self.guard.before_call(tool);
        let result = call.await;
        let outcome = match &result {
            Ok(_) => CallOutcome::Success,
            Err(e) => e.call_outcome(),
        };
        self.guard.after_call(tool, outcome);

        let throttled = permit.into_cancellation();
        self.note_throttle(throttled.as_ref());
        Guarded { result, throttled }
    }

    fn note_throttle(&self, message: Option<&String>) {
        if let Some(message) = message {
            let mut warnings = self.warnings.lock();
            if !warnings.contains(message) {
                warnings.push(message.clone());
            }
        }
    }

    /// Guarded screenshot acquisition
    ///
    /// # Errors
    /// [`RecoveryError::Capture`] when the source fails.
    pub async fn capture(&self) -> Result<Screenshot, RecoveryError> {
        ScreenSource::capture(self).await.map_err(RecoveryError::from)
    }

    /// Grounding loop over this context's collaborators
    ///
    /// The loop captures through this context, so its screenshots count
    /// against `capture_screen`.
    #[must_use]
    pub fn grounding_loop(&self) -> GroundingLoop<'_> {
        GroundingLoop::new(
            self.collaborators.grounder.as_ref(),
            self,
            self.collaborators.backend.as_ref(),
            &self.verifier,
            &self.grounding,
        )
    }

    /// Throttle warnings raised so far
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Tool counters, ordered by name
    #[must_use]
    pub fn tool_calls(&self) -> BTreeMap<String, u64> {
        self.guard.snapshot().into_iter().collect()
    }
}

#[async_trait::async_trait]
impl ScreenSource for RecoveryContext {
    async fn capture(&self) -> Result<Screenshot, CaptureError> {
        let permit = self.guard.before_call(tools::CAPTURE_SCREEN);
        let result = self.collaborators.screen.capture().await;
        let outcome = match &result {
            Ok(_) => CallOutcome::Success,
            Err(_) => CallOutcome::Failure,
        };
        self.guard.after_call(tools::CAPTURE_SCREEN, outcome);
        self.note_throttle(permit.into_cancellation().as_ref());
        result
    }
}
