//! UIR Guard - Tool Invocation Guard
//!
//! Limits how many times each named capability may be invoked within one
//! top-level recovery invocation:
//! - Counters reset at the invocation boundary
//! - Calls past a configured ceiling are flagged, not blocked
//! - Calls rejected for malformed arguments are rolled back
//!
//! # Example
//!
//! ```rust
//! use uir_guard::{CallOutcome, ToolInvocationGuard, ToolLimits};
//!
//! let guard = ToolInvocationGuard::new(ToolLimits::new().with_limit("plan_generator", 1));
//! guard.on_invocation_start();
//!
//! assert!(!guard.before_call("plan_generator").is_cancelled());
//! guard.after_call("plan_generator", CallOutcome::Success);
//!
//! let second = guard.before_call("plan_generator");
//! assert!(second.is_cancelled());
//! assert_eq!(guard.count("plan_generator"), 2);
//! ```

#![warn(unreachable_pub)]

pub mod guard;
pub mod limits;

pub use guard::{throttle_message, CallOutcome, CallPermit, ToolInvocationGuard};
pub use limits::ToolLimits;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for guarding tool calls
    pub use crate::{CallOutcome, CallPermit, ToolInvocationGuard, ToolLimits};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
