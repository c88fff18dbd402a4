//! Error types for UIR Vision

/// Image decoding and comparison errors
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// Image bytes could not be decoded
    #[error("failed to decode {which} image: {source}")]
    Decode {
        /// Which image failed ("before", "after", "screenshot")
        which: &'static str,
        /// Underlying decoder error
        source: image::ImageError,
    },

    /// Image could not be encoded
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Image decoded to zero pixels
    #[error("{0} image has no pixels")]
    EmptyImage(&'static str),

    /// Images passed to a pixel-wise metric differ in size
    #[error("image dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        /// Left image (width, height)
        left: (u32, u32),
        /// Right image (width, height)
        right: (u32, u32),
    },

    /// Threshold outside (0, 1]
    #[error("similarity threshold {0} is outside (0, 1]")]
    InvalidThreshold(f64),
}

/// Screenshot acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Backend could not produce a capture
    #[error("screen capture unavailable: {0}")]
    Unavailable(String),

    /// Backend returned no bytes
    #[error("screen capture returned no data")]
    Empty,
}
