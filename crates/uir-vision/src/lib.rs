//! UIR Vision - screen captures and the Visual Verifier
//!
//! Provides:
//! - [`Screenshot`]: encoded screen capture bytes with lazy dimension probing
//! - [`ScreenSource`]: the screenshot acquisition interface
//! - [`structural_similarity`]: windowed SSIM over grayscale images
//! - [`VisualVerifier`]: decides whether an expected UI change happened

#![warn(unreachable_pub)]

pub mod error;
pub mod screenshot;
pub mod ssim;
pub mod verifier;

pub use error::{CaptureError, VisionError};
pub use screenshot::{Resolution, ScreenSource, Screenshot};
pub use ssim::structural_similarity;
pub use verifier::{VerificationResult, VerifierConfig, VisualVerifier};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for capturing and comparing screens
    pub use crate::{
        Resolution, ScreenSource, Screenshot, VerificationResult, VerifierConfig, VisualVerifier,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
