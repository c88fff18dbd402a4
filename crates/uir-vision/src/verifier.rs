//! Visual Verifier
//!
//! Decides whether an action changed the screen the way it was expected to:
//! `matches_expectation = (similarity < threshold) == expect_change`.
//!
//! Both captures are converted to grayscale and brought to a common working
//! size before scoring, so captures of different resolution still compare.

use crate::error::VisionError;
use crate::screenshot::Screenshot;
use crate::ssim::{structural_similarity, DEFAULT_WINDOW};
use image::imageops::FilterType;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Verifier configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Similarity at or above which two captures count as unchanged
    pub threshold: f64,
    /// Captures wider than this are downscaled before scoring
    pub working_width: u32,
    /// SSIM window side in pixels
    pub window: u32,
}

impl VerifierConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With similarity threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// With working width
    #[inline]
    #[must_use]
    pub fn with_working_width(mut self, width: u32) -> Self {
        self.working_width = width;
        self
    }

    /// Check the threshold lies in (0, 1]
    ///
    /// # Errors
    /// Returns [`VisionError::InvalidThreshold`] otherwise.
    pub fn validate(&self) -> Result<(), VisionError> {
        if self.threshold > 0.0 && self.threshold <= 1.0 {
            Ok(())
        } else {
            Err(VisionError::InvalidThreshold(self.threshold))
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            working_width: 640,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Outcome of comparing a before/after pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Structural similarity in [0, 1], 1 = identical
    pub similarity: f64,
    /// Whether the caller expected the screen to change
    pub expect_change: bool,
    /// `(similarity < threshold) == expect_change`
    pub matches_expectation: bool,
}

impl VerificationResult {
    /// Whether the captures were judged different
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.matches_expectation == self.expect_change
    }
}

/// Compares before/after captures against an expectation
#[derive(Debug, Clone, Default)]
pub struct VisualVerifier {
    config: VerifierConfig,
}

impl VisualVerifier {
    /// Create a verifier
    #[inline]
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Compare two screenshots
    ///
    /// # Errors
    /// Any decode or scoring failure. The caller must not read an error as "no change".
    pub fn verify(
        &self,
        before: &Screenshot,
        after: &Screenshot,
        expect_change: bool,
    ) -> Result<VerificationResult, VisionError> {
        self.compare(before.bytes(), after.bytes(), expect_change)
    }

    /// Compare two encoded images
    ///
    /// # Errors
    /// Any decode or scoring failure.
    pub fn compare(
        &self,
        before: &[u8],
        after: &[u8],
        expect_change: bool,
    ) -> Result<VerificationResult, VisionError> {
        self.config.validate()?;

        let before = decode_luma(before, "before")?;
        let after = decode_luma(after, "after")?;
        let (width, height) = self.working_size(before.dimensions());

        let before = fit(before, width, height);
        let after = fit(after, width, height);
        let similarity = structural_similarity(&before, &after, self.config.window)?;
        let matches_expectation = (similarity < self.config.threshold) == expect_change;

        tracing::debug!(
            similarity,
            threshold = self.config.threshold,
            expect_change,
            matches_expectation,
            "visual verification"
        );

        Ok(VerificationResult {
            similarity,
            expect_change,
            matches_expectation,
        })
    }

    fn working_size(&self, (width, height): (u32, u32)) -> (u32, u32) {
        let max = self.config.working_width.max(1);
        if width <= max {
            return (width, height);
        }
        let scaled = u64::from(height) * u64::from(max) / u64::from(width);
        (max, u32::try_from(scaled).unwrap_or(u32::MAX).max(1))
    }
}

fn decode_luma(bytes: &[u8], which: &'static str) -> Result<GrayImage, VisionError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| VisionError::Decode { which, source })?
        .into_luma8();
    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::EmptyImage(which));
    }
    Ok(image)
}

fn fit(image: GrayImage, width: u32, height: u32) -> GrayImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    }
}
