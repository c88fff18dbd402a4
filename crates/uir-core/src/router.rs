//! Exception Router
//!
//! Thin external-facing dispatcher. Incoming robot exceptions are matched
//! against registered recovery modules in registration order; the first
//! enabled module handling the exception type gets a fresh
//! [`RecoveryContext`] and runs its orchestrator. Unhandled exceptions are
//! routed to a human operator.

use crate::context::{tools, Collaborators};
use crate::error::RecoveryError;
use crate::orchestrator::RecoveryOrchestrator;
use crate::types::{ExceptionReport, FailureContext, RecoveryReport};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Category of an incoming exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionType {
    /// Robot runtime failure
    RobotException,
    /// Infrastructure failure
    SystemException,
    /// Business-rule failure raised by the process
    UserException,
    /// UI element missing or unresponsive
    UiException,
}

/// Exception reported by a robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotExceptionRequest {
    /// Exception code
    pub code: String,
    /// Category
    pub exception_type: ExceptionType,
    /// Human-readable message
    pub message: String,
    /// Optional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Raw failure-context arguments
    #[serde(default)]
    pub payload: Value,
}

/// Recovery module descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryModule {
    /// Unique name
    pub name: String,
    /// What the module recovers
    pub description: String,
    /// Whether the module takes requests
    pub enabled: bool,
    /// Tool name the module is exposed under
    pub routing_tool: String,
    /// Exception types handled
    pub handles: Vec<ExceptionType>,
}

impl RecoveryModule {
    /// Enabled module handling UI exceptions through `ui_exception_handler`
    #[must_use]
    pub fn ui_recovery(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Recovers robots from UI interaction failures".to_string(),
            enabled: true,
            routing_tool: tools::UI_EXCEPTION_HANDLER.to_string(),
            handles: vec![ExceptionType::UiException],
        }
    }

    /// Whether this module takes `exception_type`
    #[inline]
    #[must_use]
    pub fn accepts(&self, exception_type: ExceptionType) -> bool {
        self.enabled && self.handles.contains(&exception_type)
    }
}

/// Routing verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    /// A module ran a recovery
    Accepted,
    /// No module handles the exception
    RoutedToHuman,
    /// The request could not be processed
    Error,
}

/// Router response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResponse {
    /// Verdict
    pub status: RoutingStatus,
    /// Module that handled the request
    pub module: Option<String>,
    /// Exception-handling view `{reasoning, steps, result}` of the report
    pub exception: Option<ExceptionReport>,
    /// Recovery report when a recovery ran
    pub report: Option<RecoveryReport>,
    /// Whether the failure was recovered
    pub solved: bool,
    /// Whether a usable fix was found
    pub has_fix: bool,
    /// Error text for `Error` responses
    pub error_message: Option<String>,
    /// Response time
    pub timestamp: DateTime<Utc>,
}

impl RoutingResponse {
    fn without_report(status: RoutingStatus, module: Option<String>, error: Option<String>) -> Self {
        Self {
            status,
            module,
            exception: None,
            report: None,
            solved: false,
            has_fix: false,
            error_message: error,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Registered {
    module: RecoveryModule,
    orchestrator: Arc<RecoveryOrchestrator>,
    seq: u64,
}

/// Registry of recovery modules
#[derive(Debug, Default)]
pub struct ExceptionRouter {
    modules: DashMap<String, Registered>,
    next_seq: AtomicU64,
}

impl ExceptionRouter {
    /// Create an empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module`, replacing any module of the same name
    pub fn register(&self, module: RecoveryModule, orchestrator: Arc<RecoveryOrchestrator>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        tracing::info!(module = %module.name, "recovery module registered");
        self.modules.insert(
            module.name.clone(),
            Registered {
                module,
                orchestrator,
                seq,
            },
        );
    }

    /// Remove a module, returning its descriptor
    pub fn unregister(&self, name: &str) -> Option<RecoveryModule> {
        self.modules.remove(name).map(|(_, registered)| registered.module)
    }

    /// Enable or disable a module; false when unknown
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.modules.get_mut(name) {
            Some(mut registered) => {
                registered.module.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Registered modules in registration order
    #[must_use]
    pub fn modules(&self) -> Vec<RecoveryModule> {
        let mut entries: Vec<(u64, RecoveryModule)> = self
            .modules
            .iter()
            .map(|entry| (entry.seq, entry.module.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, module)| module).collect()
    }

    /// First enabled module handling `exception_type`
    #[must_use]
    pub fn select(&self, exception_type: ExceptionType) -> Option<(RecoveryModule, Arc<RecoveryOrchestrator>)> {
        self.modules
            .iter()
            .filter(|entry| entry.module.accepts(exception_type))
            .min_by_key(|entry| entry.seq)
            .map(|entry| (entry.module.clone(), Arc::clone(&entry.orchestrator)))
    }

    /// Route `request` to a module and run its recovery
    pub async fn route(
        &self,
        request: &RobotExceptionRequest,
        collaborators: Collaborators,
    ) -> RoutingResponse {
        let Some((module, orchestrator)) = self.select(request.exception_type) else {
            tracing::info!(code = %request.code, kind = ?request.exception_type, "no module handles exception, routing to human");
            return RoutingResponse::without_report(RoutingStatus::RoutedToHuman, None, None);
        };

        let ctx = orchestrator.context(collaborators);
        ctx.begin_invocation();

        let intake = ctx
            .invoke(tools::UI_EXCEPTION_HANDLER, async {
                FailureContext::from_value(&request.payload).map_err(RecoveryError::from)
            })
            .await;
        let failure = match intake.result {
            Ok(failure) => failure,
            Err(e) => {
                tracing::warn!(module = %module.name, error = %e, "exception payload rejected");
                return RoutingResponse::without_report(
                    RoutingStatus::Error,
                    Some(module.name),
                    Some(e.to_string()),
                );
            }
        };

        let report = orchestrator.run_invocation(&ctx, &failure).await;
        RoutingResponse {
            status: RoutingStatus::Accepted,
            module: Some(module.name),
            solved: report.is_solved(),
            has_fix: report.has_fix(),
            exception: Some(report.exception_report()),
            report: Some(report),
            error_message: None,
            timestamp: Utc::now(),
        }
    }
}
