//! Grayscale conversion and adaptive binarization.

use image::{DynamicImage, GrayImage, Luma};

/// Side of the local mean window used for adaptive thresholding
pub const THRESHOLD_WINDOW: u32 = 11;
/// Constant subtracted from the local mean before comparison
pub const THRESHOLD_BIAS: f64 = 2.0;

/// Convert any input image to 8-bit grayscale.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Binarize with an adaptive local mean threshold, inverted.
///
/// A pixel becomes foreground (255) when it is darker than the mean of its
/// local window minus a small bias, so dark drawing strokes on a light
/// background survive locally varying contrast where a single global
/// threshold would not. Windows are clamped at the image border.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    // Summed-area table with a one-pixel zero border, so window sums are O(1).
    let w = width as usize;
    let h = height as usize;
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32)[0]);
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    let radius = (THRESHOLD_WINDOW / 2) as i64;
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - radius).max(0) as usize;
            let y0 = (y - radius).max(0) as usize;
            let x1 = ((x + radius) as usize).min(w - 1);
            let y1 = ((y + radius) as usize).min(h - 1);

            let sum = integral[(y1 + 1) * (w + 1) + (x1 + 1)]
                + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + (x1 + 1)]
                - integral[(y1 + 1) * (w + 1) + x0];
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
            let mean = sum as f64 / count;

            let value = f64::from(gray.get_pixel(x as u32, y as u32)[0]);
            let pixel = if value <= mean - THRESHOLD_BIAS { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([pixel]));
        }
    }

    out
}
