//! UIR Grounding - from model text to verified UI actions
//!
//! Provides:
//! - [`UiAction`] / [`GroundedAction`]: the closed action vocabulary
//! - [`ActionTranslator`]: parses grounding-model text and rescales coordinates
//! - [`CompletionOracle`]: the opaque model completion interface
//! - [`GuiBackend`] and [`dispatch`]: fixed action-kind to primitive table
//! - [`GroundingLoop`]: bounded attempt/verify/retry state machine
//!
//! # Example
//!
//! ```rust,ignore
//! use uir_grounding::{GroundingConfig, GroundingLoop, GroundingRequest};
//!
//! let grounding = GroundingLoop::new(&oracle, &screen, &backend, &verifier, &config);
//! let outcome = grounding.run(&GroundingRequest::single_shot("Click the Submit button")).await;
//! if !outcome.is_success() {
//!     println!("{}", outcome.message);
//! }
//! ```

#![warn(unreachable_pub)]

pub mod action;
pub mod backend;
pub mod error;
pub mod grounding_loop;
pub mod oracle;
pub mod prompt;
pub mod translator;

pub use action::{ActionKind, GroundedAction, Point, ScrollDirection, UiAction};
pub use backend::{dispatch, GuiBackend, MouseButton};
pub use error::{BackendError, OracleError, TranslateError};
pub use grounding_loop::{
    ExecutedAction, GroundingConfig, GroundingLoop, GroundingMode, GroundingOutcome,
    GroundingRequest, GroundingStatus, ACTION_SUCCEEDED, CORRECTION_PROMPT, MAX_ACTIONS_EXCEEDED,
    RETRIES_EXHAUSTED,
};
pub use oracle::{CompletionOracle, ContentPart, Conversation, Message, Role};
pub use translator::ActionTranslator;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for grounding UI actions
    pub use crate::{
        ActionTranslator, CompletionOracle, Conversation, GroundedAction, GroundingConfig,
        GroundingLoop, GroundingOutcome, GroundingRequest, GuiBackend, UiAction,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
