use crate::error::{DetectError, DetectResult};
use rayon::prelude::*;
use sift_core::GrayImage;

/// Image preprocessing operations (grayscale conversion, contrast stretching,
/// histogram equalization, median filtering).
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Convert interleaved RGB samples to grayscale: each output sample is
    /// the floor-average of the three channels.
    pub fn grayscale_from_rgb(rgb: &[u8], width: usize, height: usize) -> DetectResult<GrayImage> {
        let expected_len = width * height * 3;
        if rgb.len() != expected_len {
            return Err(DetectError::InvalidImageData {
                expected_len,
                actual_len: rgb.len(),
            });
        }
        let data = rgb
            .chunks_exact(3)
            .map(|px| ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8)
            .collect();
        Ok(GrayImage::from_raw(width, height, data))
    }

    /// Stretch intensities so the full 0..=255 range is used.
    pub fn adjust_contrast(img: &GrayImage) -> GrayImage {
        let min = *img.data().iter().min().unwrap_or(&0);
        let max = *img.data().iter().max().unwrap_or(&0);
        if max == min {
            return img.clone();
        }
        let range = (max - min) as u16;
        let data = img
            .data()
            .iter()
            .map(|&p| (255 * (p - min) as u16 / range) as u8)
            .collect();
        GrayImage::from_raw(img.width(), img.height(), data)
    }

    /// Histogram equalization over the global intensity distribution.
    pub fn histogram_equalization(img: &GrayImage) -> GrayImage {
        if img.data().is_empty() {
            return img.clone();
        }
        let mut histogram = [0u32; 256];
        for &p in img.data() {
            histogram[p as usize] += 1;
        }

        let total = (img.width() * img.height()) as u64;
        let mut cdf = [0u8; 256];
        let mut cumulative = 0u64;
        for (i, &count) in histogram.iter().enumerate() {
            cumulative += count as u64;
            cdf[i] = (255 * cumulative / total) as u8;
        }

        let data = img.data().par_iter().map(|&p| cdf[p as usize]).collect();
        GrayImage::from_raw(img.width(), img.height(), data)
    }

    /// Median filter with the window clipped to the image; an even sample
    /// count at the borders averages the two middle values.
    pub fn median_filter(img: &GrayImage, size: usize) -> DetectResult<GrayImage> {
        if size % 2 == 0 {
            return Err(DetectError::InvalidKernelSize { size });
        }
        let (width, height) = (img.width(), img.height());
        let half = (size / 2) as i32;

        let rows: Vec<Vec<u8>> = (0..height)
            .into_par_iter()
            .map(|y| {
                let mut row = Vec::with_capacity(width);
                let mut values = Vec::with_capacity(size * size);
                for x in 0..width {
                    values.clear();
                    for dy in -half..=half {
                        let yy = y as i32 + dy;
                        if yy < 0 || yy >= height as i32 {
                            continue;
                        }
                        for dx in -half..=half {
                            let xx = x as i32 + dx;
                            if xx < 0 || xx >= width as i32 {
                                continue;
                            }
                            values.push(img.get(xx as usize, yy as usize));
                        }
                    }
                    values.sort_unstable();
                    let n = values.len();
                    let median = if n % 2 == 0 {
                        ((values[n / 2] as u16 + values[n / 2 - 1] as u16) / 2) as u8
                    } else {
                        values[n / 2]
                    };
                    row.push(median);
                }
                row
            })
            .collect();

        Ok(GrayImage::from_raw(width, height, rows.into_iter().flatten().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_is_floor_average() {
        let rgb = vec![10, 20, 31, 255, 255, 255];
        let img = ImagePreprocessing::grayscale_from_rgb(&rgb, 2, 1).unwrap();
        assert_eq!(img.get(0, 0), 20); // (10+20+31)/3 = 20.33 floored
        assert_eq!(img.get(1, 0), 255);
    }

    #[test]
    fn grayscale_rejects_short_buffer() {
        let rgb = vec![0u8; 5];
        assert!(matches!(
            ImagePreprocessing::grayscale_from_rgb(&rgb, 2, 1),
            Err(DetectError::InvalidImageData { expected_len: 6, actual_len: 5 })
        ));
    }

    #[test]
    fn contrast_stretch_uses_full_range() {
        let img = GrayImage::from_raw(3, 1, vec![100, 150, 200]);
        let out = ImagePreprocessing::adjust_contrast(&img);
        assert_eq!(out.get(0, 0), 0);
        assert_eq!(out.get(2, 0), 255);
    }

    #[test]
    fn contrast_stretch_leaves_flat_image_unchanged() {
        let img = GrayImage::from_raw(2, 2, vec![80; 4]);
        assert_eq!(ImagePreprocessing::adjust_contrast(&img), img);
    }

    #[test]
    fn equalization_maps_brightest_to_255() {
        let img = GrayImage::from_raw(2, 2, vec![0, 0, 128, 255]);
        let out = ImagePreprocessing::histogram_equalization(&img);
        assert_eq!(out.get(1, 1), 255);
        // Every pixel keeps its rank ordering.
        assert!(out.get(0, 0) <= out.get(0, 1));
        assert!(out.get(0, 1) <= out.get(1, 1));
    }

    #[test]
    fn median_filter_rejects_even_size() {
        let img = GrayImage::new(4, 4);
        assert!(matches!(
            ImagePreprocessing::median_filter(&img, 2),
            Err(DetectError::InvalidKernelSize { size: 2 })
        ));
    }

    #[test]
    fn median_filter_removes_impulse_noise() {
        let mut img = GrayImage::from_raw(5, 5, vec![50; 25]);
        img.set(2, 2, 255);
        let out = ImagePreprocessing::median_filter(&img, 3).unwrap();
        assert_eq!(out.get(2, 2), 50);
    }
}
