//! Tool Invocation Guard
//!
//! One guard instance owns the call counters of one top-level invocation.
//! Counters live behind a `parking_lot::Mutex`; every operation holds the
//! lock for a single map update.

use crate::limits::ToolLimits;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Result classification reported back to the guard after a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    /// Call completed
    Success,
    /// Arguments failed validation (missing or invalid fields)
    ValidationFailure,
    /// Arguments had the wrong type or shape
    ArgumentTypeFailure,
    /// Any other failure of the capability itself
    Failure,
}

impl CallOutcome {
    /// Whether the call failed purely because of malformed arguments
    #[inline]
    #[must_use]
    pub fn is_argument_failure(self) -> bool {
        matches!(self, Self::ValidationFailure | Self::ArgumentTypeFailure)
    }
}

/// Verdict returned by [`ToolInvocationGuard::before_call`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPermit {
    tool: String,
    count: u64,
    cancellation: Option<String>,
}

impl CallPermit {
    /// Tool the permit was issued for
    #[inline]
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Counter value after this call was counted
    #[inline]
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// True when the call is over its ceiling
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_some()
    }

    /// Message for the caller when the call is over its ceiling
    #[inline]
    #[must_use]
    pub fn cancellation(&self) -> Option<&str> {
        self.cancellation.as_deref()
    }

    /// Take the cancellation message
    #[inline]
    #[must_use]
    pub fn into_cancellation(self) -> Option<String> {
        self.cancellation
    }
}

/// Message attached to a call that exceeded its ceiling
#[must_use]
pub fn throttle_message(tool: &str) -> String {
    format!(
        "Tool '{tool}' has been invoked too many times and is now being throttled. \
         DO NOT CALL THIS TOOL ANYMORE."
    )
}

/// Counts calls per tool name within one invocation
#[derive(Debug, Default)]
pub struct ToolInvocationGuard {
    limits: ToolLimits,
    counts: Mutex<HashMap<String, u64>>,
}

impl ToolInvocationGuard {
    /// Create a guard with the given ceilings
    #[must_use]
    pub fn new(limits: ToolLimits) -> Self {
        Self {
            limits,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Guard that never cancels
    #[inline]
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Configured ceilings
    #[inline]
    #[must_use]
    pub fn limits(&self) -> &ToolLimits {
        &self.limits
    }

    /// Clear every counter. Called at the invocation boundary.
    pub fn on_invocation_start(&self) {
        self.counts.lock().clear();
        tracing::debug!("tool counters reset");
    }

    /// Count a call to `tool` and flag it when it exceeds the ceiling.
    ///
    /// The count is never capped, so every call past the ceiling is flagged.
    pub fn before_call(&self, tool: &str) -> CallPermit {
        let count = {
            let mut counts = self.counts.lock();
            let entry = counts.entry(tool.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };

        let cancellation = match self.limits.limit(tool) {
            Some(max) if count > max => {
                tracing::warn!(tool, count, max, "tool call over ceiling");
                Some(throttle_message(tool))
            }
            _ => None,
        };

        CallPermit {
            tool: tool.to_string(),
            count,
            cancellation,
        }
    }

    /// Roll back the count of a call that failed on malformed arguments.
    pub fn after_call(&self, tool: &str, outcome: CallOutcome) {
        if !outcome.is_argument_failure() {
            return;
        }
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(tool) {
            *count = count.saturating_sub(1);
            tracing::debug!(tool, count = *count, ?outcome, "tool call not counted");
        }
    }

    /// Current count for `tool`
    #[must_use]
    pub fn count(&self, tool: &str) -> u64 {
        self.counts.lock().get(tool).copied().unwrap_or(0)
    }

    /// Copy of every counter
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.lock().clone()
    }
}
