//! Error types for UIR Grounding
//!
//! - Translation failures (model text does not map to an action)
//! - Oracle failures (completion backend unavailable)
//! - Backend failures (input injection rejected or transport lost)

use uir_vision::Resolution;

/// Model text could not be turned into a [`GroundedAction`](crate::GroundedAction)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    /// Completion was empty or whitespace
    #[error("completion is empty")]
    Empty,

    /// No `name(...)` call found
    #[error("no action call found in completion")]
    NoAction,

    /// Call name outside the vocabulary
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    /// Required argument absent
    #[error("action `{action}` is missing argument `{argument}`")]
    MissingArgument {
        /// Action name
        action: &'static str,
        /// Argument name
        argument: &'static str,
    },

    /// Argument present but unreadable
    #[error("malformed argument `{argument}`: {reason}")]
    MalformedArgument {
        /// Argument name
        argument: String,
        /// What was wrong
        reason: String,
    },

    /// Argument list never closed
    #[error("unterminated argument list")]
    Unterminated,

    /// Coordinates outside the reference space
    #[error("point ({x}, {y}) lies outside the reference space {space}")]
    OutOfBounds {
        /// Reference-space x
        x: f64,
        /// Reference-space y
        y: f64,
        /// Reference resolution
        space: Resolution,
    },

    /// Hotkey with more than three keys
    #[error("hotkey has {0} keys, at most 3 are allowed")]
    TooManyKeys(usize),

    /// Scroll direction outside up/down/left/right
    #[error("unknown scroll direction `{0}`")]
    UnknownDirection(String),
}

/// Completion oracle errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// Backend could not be reached
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time
    #[error("oracle timed out after {secs}s")]
    Timeout {
        /// Elapsed seconds
        secs: u64,
    },

    /// Backend answered with an error
    #[error("oracle rejected the request: {0}")]
    Rejected(String),
}

/// GUI automation backend errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The primitive could not be performed; the UI is still reachable
    #[error("action rejected by backend: {0}")]
    Rejected(String),

    /// The connection to the desktop is gone
    #[error("backend disconnected: {0}")]
    Disconnected(String),
}

impl BackendError {
    /// Whether the desktop can no longer be driven
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}
