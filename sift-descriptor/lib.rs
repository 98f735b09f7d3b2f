//! Descriptor generation: turns a refined keypoint and one of its dominant
//! orientations into a quantized, rotation-normalized gradient histogram.

use rayon::prelude::*;
use sift_core::{Keypoint, SiftConfig, SiftDescriptor};
use sift_detect::{GaussianScaleSpace, OrientationAssigner};
use std::f64::consts::TAU;

pub struct DescriptorGenerator;

impl DescriptorGenerator {
    /// One descriptor per (keypoint, dominant orientation) pair. Keypoints
    /// are independent and processed in parallel.
    pub fn describe_all(
        space: &GaussianScaleSpace,
        keypoints: &[Keypoint],
        cfg: &SiftConfig,
    ) -> Vec<SiftDescriptor> {
        keypoints
            .par_iter()
            .flat_map_iter(|k| {
                OrientationAssigner::dominant_orientations(space, k, cfg)
                    .into_iter()
                    .map(|theta| Self::describe(space, k, theta, cfg))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Build the descriptor for a keypoint at orientation `theta` (radians).
    pub fn describe(
        space: &GaussianScaleSpace,
        k: &Keypoint,
        theta: f32,
        cfg: &SiftConfig,
    ) -> SiftDescriptor {
        let img = space.level(k.p, k.q);
        let (m, n) = (img.width() as i32, img.height() as i32);
        let theta = theta as f64;

        let level_scale = cfg.sigma_0 * 2f64.powf(k.q as f64 / cfg.levels_per_octave as f64);
        let descriptor_size = cfg.s_desc * level_scale;
        let weighting_width = 0.25 * descriptor_size;
        let cutoff = 2.5 * weighting_width;

        let u_min = ((k.x as f64 - cutoff).floor() as i32).max(1);
        let u_max = ((k.x as f64 + cutoff).ceil() as i32).min(m - 2);
        let v_min = ((k.y as f64 - cutoff).floor() as i32).max(1);
        let v_max = ((k.y as f64 + cutoff).ceil() as i32).min(n - 2);

        let (sin_t, cos_t) = (-theta).sin_cos();
        let mut histogram = vec![0.0f64; cfg.n_spat * cfg.n_spat * cfg.n_angl];

        for u in u_min..=u_max {
            for v in v_min..=v_max {
                let du = (u - k.x) as f64;
                let dv = (v - k.y) as f64;
                let r2 = du * du + dv * dv;
                if r2 >= cutoff * cutoff {
                    continue;
                }

                // Rotate into the keypoint frame and rescale to normalized
                // descriptor coordinates.
                let uu = (cos_t * du - sin_t * dv) / descriptor_size;
                let vv = (sin_t * du + cos_t * dv) / descriptor_size;

                let (magnitude, angle) =
                    OrientationAssigner::gradient_polar(img, u as usize, v as usize);
                let normalized_angle = (angle - theta).rem_euclid(TAU);
                let weight = (-r2 / (2.0 * weighting_width * weighting_width)).exp();

                Self::accumulate(
                    &mut histogram,
                    cfg,
                    uu,
                    vv,
                    normalized_angle,
                    magnitude * weight,
                );
            }
        }

        let features = Self::feature_vector(&histogram, cfg);
        let sigma = cfg.sigma_0
            * 2f64.powf(k.p as f64 + k.q as f64 / cfg.levels_per_octave as f64);

        SiftDescriptor {
            x: (1 << k.p) * k.x,
            y: (1 << k.p) * k.y,
            sigma: sigma as f32,
            orientation: theta as f32,
            features,
        }
    }

    /// Trilinear accumulation: two nearest bins on each spatial axis (bounds
    /// checked) and on the angular axis (wrapping).
    fn accumulate(
        histogram: &mut [f64],
        cfg: &SiftConfig,
        u: f64,
        v: f64,
        angle: f64,
        z: f64,
    ) {
        let n_spat = cfg.n_spat as i32;
        let n_angl = cfg.n_angl as i32;

        let i = cfg.n_spat as f64 * u + 0.5 * (cfg.n_spat as f64 - 1.0);
        let j = cfg.n_spat as f64 * v + 0.5 * (cfg.n_spat as f64 - 1.0);
        let kf = cfg.n_angl as f64 * angle / TAU;

        let i0 = i.floor() as i32;
        let j0 = j.floor() as i32;
        let a1 = i - i.floor();
        let b1 = j - j.floor();
        let k0 = (kf.floor() as i32).rem_euclid(n_angl);
        let g1 = kf - kf.floor();

        let spatial_i = [(i0, 1.0 - a1), (i0 + 1, a1)];
        let spatial_j = [(j0, 1.0 - b1), (j0 + 1, b1)];
        let angular = [(k0, 1.0 - g1), ((k0 + 1) % n_angl, g1)];

        for &(ii, wa) in &spatial_i {
            if ii < 0 || ii >= n_spat {
                continue;
            }
            for &(jj, wb) in &spatial_j {
                if jj < 0 || jj >= n_spat {
                    continue;
                }
                for &(kk, wc) in &angular {
                    let index =
                        (ii as usize * cfg.n_spat + jj as usize) * cfg.n_angl + kk as usize;
                    histogram[index] += z * wa * wb * wc;
                }
            }
        }
    }

    /// Flatten, L1-normalize, clip, re-normalize, quantize to bytes.
    pub fn feature_vector(histogram: &[f64], cfg: &SiftConfig) -> Vec<u8> {
        let mut f: Vec<f64> = histogram.to_vec();
        Self::normalize_l1(&mut f);
        for value in f.iter_mut() {
            *value = value.min(cfg.t_fclip as f64);
        }
        Self::normalize_l1(&mut f);
        f.iter()
            .map(|&value| ((cfg.s_fscale * value).round()).min(255.0) as u8)
            .collect()
    }

    fn normalize_l1(values: &mut [f64]) {
        let sum: f64 = values.iter().sum();
        if sum != 0.0 {
            for value in values.iter_mut() {
                *value /= sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::GrayImage;
    use sift_detect::SiftDetector;

    fn blob_image(width: usize, height: usize, cx: f64, cy: f64, spread: f64) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let v = 16.0 + 180.0 * (-(dx * dx + dy * dy) / (2.0 * spread * spread)).exp();
                img.set(x, y, v.min(255.0) as u8);
            }
        }
        img
    }

    fn test_config() -> SiftConfig {
        SiftConfig { octaves: 3, ..SiftConfig::default() }
    }

    #[test]
    fn feature_vector_is_l1_normalized_before_quantization() {
        let cfg = test_config();
        let mut histogram = vec![0.0f64; cfg.n_spat * cfg.n_spat * cfg.n_angl];
        histogram[0] = 3.0;
        histogram[17] = 1.0;
        // With the clip above every normalized component, quantization sees
        // the plain L1 normalization: 0.75 and 0.25.
        let relaxed = SiftConfig { t_fclip: 1.0, ..cfg };
        let bytes = DescriptorGenerator::feature_vector(&histogram, &relaxed);
        assert_eq!(bytes[0], 255); // min(255, round(512 * 0.75))
        assert_eq!(bytes[17], 128); // round(512 * 0.25)
        assert!(bytes.iter().skip(1).take(15).all(|&b| b == 0));
    }

    #[test]
    fn feature_vector_clips_peaks() {
        let cfg = test_config();
        let mut histogram = vec![0.0f64; cfg.n_spat * cfg.n_spat * cfg.n_angl];
        histogram[0] = 100.0;
        histogram[1] = 1.0;
        let bytes = DescriptorGenerator::feature_vector(&histogram, &cfg);
        // Dominant bin is clipped to t_fclip before the second normalization,
        // so the small bin keeps relative mass.
        assert!(bytes[1] > 0);
        assert!(bytes[0] <= 255);
    }

    #[test]
    fn empty_histogram_quantizes_to_zeros() {
        let cfg = test_config();
        let histogram = vec![0.0f64; cfg.n_spat * cfg.n_spat * cfg.n_angl];
        let bytes = DescriptorGenerator::feature_vector(&histogram, &cfg);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn descriptor_has_fixed_length_and_mapped_coordinates() {
        let cfg = test_config();
        let detector = SiftDetector::new(cfg.clone()).unwrap();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let (gaussian, dog) = detector.build_scale_space(&img).unwrap();
        let keypoints = detector.detect_keypoints(&dog);
        assert!(!keypoints.is_empty());

        for k in &keypoints {
            let descriptor = DescriptorGenerator::describe(&gaussian, k, 0.0, &cfg);
            assert_eq!(descriptor.features.len(), cfg.n_spat * cfg.n_spat * cfg.n_angl);
            assert_eq!(descriptor.x, (1 << k.p) * k.x);
            assert_eq!(descriptor.y, (1 << k.p) * k.y);
            assert!(descriptor.sigma > 0.0);
        }
    }

    #[test]
    fn blob_yields_at_least_one_descriptor() {
        let cfg = test_config();
        let detector = SiftDetector::new(cfg.clone()).unwrap();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let (gaussian, dog) = detector.build_scale_space(&img).unwrap();
        let keypoints = detector.detect_keypoints(&dog);
        let descriptors = DescriptorGenerator::describe_all(&gaussian, &keypoints, &cfg);
        assert!(!descriptors.is_empty());
        for d in &descriptors {
            assert!((0.0..=std::f32::consts::TAU).contains(&d.orientation));
        }
    }
}
