//! Structural similarity over grayscale images
//!
//! Mean SSIM over non-overlapping square windows. Edge windows are
//! truncated rather than dropped so every pixel contributes.

use crate::error::VisionError;
use image::GrayImage;

const DYNAMIC_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Default window side in pixels
pub const DEFAULT_WINDOW: u32 = 8;

/// Mean structural similarity of two equally sized grayscale images, clamped to `[0, 1]`.
///
/// # Errors
/// Returns [`VisionError::DimensionMismatch`] when the sizes differ and
/// [`VisionError::EmptyImage`] when the images have no pixels.
pub fn structural_similarity(
    left: &GrayImage,
    right: &GrayImage,
    window: u32,
) -> Result<f64, VisionError> {
    if left.dimensions() != right.dimensions() {
        return Err(VisionError::DimensionMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }
    let (width, height) = left.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage("comparison"));
    }

    let window = window.max(1);
    let c1 = (K1 * DYNAMIC_RANGE).powi(2);
    let c2 = (K2 * DYNAMIC_RANGE).powi(2);

    let mut total = 0.0;
    let mut windows = 0_u32;
    for y0 in (0..height).step_by(window as usize) {
        for x0 in (0..width).step_by(window as usize) {
            let x1 = (x0 + window).min(width);
            let y1 = (y0 + window).min(height);
            total += window_ssim(left, right, (x0, y0, x1, y1), c1, c2);
            windows += 1;
        }
    }

    Ok((total / f64::from(windows)).clamp(0.0, 1.0))
}

fn window_ssim(
    left: &GrayImage,
    right: &GrayImage,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
    c1: f64,
    c2: f64,
) -> f64 {
    let n = f64::from((x1 - x0) * (y1 - y0));

    let (mut sum_l, mut sum_r) = (0.0, 0.0);
    for y in y0..y1 {
        for x in x0..x1 {
            sum_l += f64::from(left.get_pixel(x, y)[0]);
            sum_r += f64::from(right.get_pixel(x, y)[0]);
        }
    }
    let mean_l = sum_l / n;
    let mean_r = sum_r / n;

    let (mut var_l, mut var_r, mut covar) = (0.0, 0.0, 0.0);
    for y in y0..y1 {
        for x in x0..x1 {
            let dl = f64::from(left.get_pixel(x, y)[0]) - mean_l;
            let dr = f64::from(right.get_pixel(x, y)[0]) - mean_r;
            var_l += dl * dl;
            var_r += dr * dr;
            covar += dl * dr;
        }
    }
    var_l /= n;
    var_r /= n;
    covar /= n;

    ((2.0 * mean_l * mean_r + c1) * (2.0 * covar + c2))
        / ((mean_l * mean_l + mean_r * mean_r + c1) * (var_l + var_r + c2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkerboard(size: u32, cell: u32, invert: bool) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            Luma([if on != invert { 255 } else { 0 }])
        })
    }

    #[test]
    fn identical_images_score_one() {
        let img = checkerboard(40, 5, false);
        let score = structural_similarity(&img, &img, DEFAULT_WINDOW).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_identical_images_score_one() {
        let img = GrayImage::from_pixel(17, 9, Luma([128]));
        let score = structural_similarity(&img, &img, DEFAULT_WINDOW).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_images_score_low() {
        let a = checkerboard(40, 4, false);
        let b = checkerboard(40, 4, true);
        let score = structural_similarity(&a, &b, DEFAULT_WINDOW).unwrap();
        assert!(score < 0.1, "score {score}");
    }

    #[test]
    fn black_and_white_score_low() {
        let a = GrayImage::from_pixel(16, 16, Luma([0]));
        let b = GrayImage::from_pixel(16, 16, Luma([255]));
        let score = structural_similarity(&a, &b, DEFAULT_WINDOW).unwrap();
        assert!(score < 0.01, "score {score}");
    }

    #[test]
    fn size_mismatch_is_error() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(5, 4);
        assert!(matches!(
            structural_similarity(&a, &b, DEFAULT_WINDOW),
            Err(VisionError::DimensionMismatch { .. })
        ));
    }
}
