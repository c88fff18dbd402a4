//! Screen captures and their acquisition interface

use crate::error::{CaptureError, VisionError};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Pixel dimensions of a screen or image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a resolution
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Encoded screen capture (JPEG from live backends, any decodable format in tests)
#[derive(Clone, PartialEq, Eq)]
pub struct Screenshot {
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Screenshot {
    /// Wrap encoded image bytes
    ///
    /// # Errors
    /// Returns [`CaptureError::Empty`] when `data` is empty.
    pub fn new(data: Vec<u8>) -> Result<Self, CaptureError> {
        if data.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(Self {
            data,
            captured_at: Utc::now(),
        })
    }

    /// Encode an in-memory image
    ///
    /// # Errors
    /// Returns [`VisionError::Encode`] when the encoder rejects the image.
    pub fn from_image(image: &DynamicImage, format: ImageFormat) -> Result<Self, VisionError> {
        let mut data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut data), format)
            .map_err(VisionError::Encode)?;
        Ok(Self {
            data,
            captured_at: Utc::now(),
        })
    }

    /// Encoded bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into encoded bytes
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Capture time
    #[inline]
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// MIME type guessed from the magic bytes
    #[must_use]
    pub fn media_type(&self) -> &'static str {
        match image::guess_format(&self.data) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Gif) => "image/gif",
            Ok(ImageFormat::WebP) => "image/webp",
            _ => "image/jpeg",
        }
    }

    /// Read the image header to obtain its size without decoding pixels
    ///
    /// # Errors
    /// Returns [`VisionError::Decode`] when the header is unreadable.
    pub fn resolution(&self) -> Result<Resolution, VisionError> {
        let decode = |source| VisionError::Decode {
            which: "screenshot",
            source,
        };
        let (width, height) = ImageReader::new(Cursor::new(&self.data))
            .with_guessed_format()
            .map_err(|e| decode(image::ImageError::IoError(e)))?
            .into_dimensions()
            .map_err(decode)?;
        Ok(Resolution::new(width, height))
    }
}

impl std::fmt::Debug for Screenshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screenshot")
            .field("bytes", &self.data.len())
            .field("media_type", &self.media_type())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Produces screen captures on demand
#[async_trait::async_trait]
pub trait ScreenSource: Send + Sync {
    /// Capture the current screen
    async fn capture(&self) -> Result<Screenshot, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn empty_capture_rejected() {
        assert!(matches!(Screenshot::new(Vec::new()), Err(CaptureError::Empty)));
    }

    #[test]
    fn resolution_from_header() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 18, Rgb([10, 20, 30])));
        let shot = Screenshot::from_image(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(shot.resolution().unwrap(), Resolution::new(32, 18));
        assert_eq!(shot.media_type(), "image/jpeg");
    }

    #[test]
    fn garbage_has_no_resolution() {
        let shot = Screenshot::new(vec![1, 2, 3, 4]).unwrap();
        assert!(shot.resolution().is_err());
    }
}
