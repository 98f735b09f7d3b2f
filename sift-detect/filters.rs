//! Filtering primitives: Gaussian kernels, 2D convolution and decimation.

use crate::error::{DetectError, DetectResult};
use rayon::prelude::*;
use sift_core::GrayImage;

/// Kernel size for a given sigma: `6*sigma + 1` truncated, forced odd.
pub fn kernel_size_for(sigma: f64) -> usize {
    let mut size = (6.0 * sigma) as usize + 1;
    if size % 2 == 0 {
        size += 1;
    }
    size
}

/// Square Gaussian kernel of the given odd size, row-major.
/// Value at (x, y) relative to the center is
/// `1/(2*pi*sigma^2) * exp(-(x^2 + y^2) / (2*sigma^2))`.
pub fn gaussian_kernel(size: usize, sigma: f64) -> DetectResult<Vec<f32>> {
    if size % 2 == 0 {
        return Err(DetectError::InvalidKernelSize { size });
    }
    let center = (size / 2) as f64;
    let norm = 1.0 / (2.0 * std::f64::consts::PI * sigma * sigma);
    let mut kernel = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f64 - center;
            let dy = y as f64 - center;
            kernel.push((norm * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()) as f32);
        }
    }
    Ok(kernel)
}

/// Scale a kernel so its weights sum to 1. The convolution truncates sums
/// back to u8, so callers pre-normalize to avoid unintended clipping.
pub fn normalize_kernel(kernel: &mut [f32]) {
    let sum: f32 = kernel.iter().sum();
    if sum != 0.0 {
        for w in kernel.iter_mut() {
            *w /= sum;
        }
    }
}

/// 2D convolution with replication padding: out-of-bounds reads clamp to the
/// nearest valid sample. The sum is truncated back to u8.
pub fn convolve(img: &GrayImage, kernel: &[f32], size: usize) -> GrayImage {
    debug_assert_eq!(kernel.len(), size * size);
    let (width, height) = (img.width(), img.height());
    let pad = (size / 2) as i32;

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(width);
            for x in 0..width {
                let mut sum = 0.0f32;
                for j in 0..size {
                    let yy = (y as i32 + j as i32 - pad).clamp(0, height as i32 - 1) as usize;
                    for i in 0..size {
                        let xx = (x as i32 + i as i32 - pad).clamp(0, width as i32 - 1) as usize;
                        sum += kernel[j * size + i] * img.get(xx, yy) as f32;
                    }
                }
                row.push(sum as u8);
            }
            row
        })
        .collect();

    GrayImage::from_raw(width, height, rows.into_iter().flatten().collect())
}

/// 2:1 decimation: keep every pixel at even coordinates. No extra anti-alias
/// blur beyond what the source level already carries.
pub fn decimate(img: &GrayImage) -> GrayImage {
    let width = img.width() / 2;
    let height = img.height() / 2;
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            out.set(x, y, img.get(2 * x, 2 * y));
        }
    }
    out
}
