use crate::types::GaussianScaleSpace;
use sift_core::{GrayImage, Keypoint, SiftConfig};
use std::f64::consts::TAU;

/// Assigns dominant gradient orientations to refined keypoints from the
/// Gaussian scale space.
pub struct OrientationAssigner;

impl OrientationAssigner {
    /// Dominant orientations in radians, [0, 2pi). A keypoint may carry
    /// several; one descriptor is produced per orientation.
    pub fn dominant_orientations(
        space: &GaussianScaleSpace,
        k: &Keypoint,
        cfg: &SiftConfig,
    ) -> Vec<f32> {
        let mut histogram = Self::orientation_histogram(space, k, cfg);
        Self::smooth_circular(&mut histogram, cfg.n_smooth);
        Self::peak_orientations(&histogram, cfg.t_dom_or)
    }

    /// Gradient magnitude and angle at an interior pixel via central
    /// differences. The angle is wrapped into [0, 2pi).
    pub fn gradient_polar(img: &GrayImage, x: usize, y: usize) -> (f64, f64) {
        let dx = 0.5 * (img.get(x + 1, y) as f64 - img.get(x - 1, y) as f64);
        let dy = 0.5 * (img.get(x, y + 1) as f64 - img.get(x, y - 1) as f64);
        let magnitude = (dx * dx + dy * dy).sqrt();
        let mut angle = dy.atan2(dx);
        if angle < 0.0 {
            angle += TAU;
        }
        (magnitude, angle)
    }

    /// Circular histogram of Gaussian-weighted gradient magnitudes over a
    /// disk of radius `max(1, 2.5 * sigma_w)` around the keypoint, clipped to
    /// the image interior. Each sample is split linearly over the two nearest
    /// angular bins.
    fn orientation_histogram(
        space: &GaussianScaleSpace,
        k: &Keypoint,
        cfg: &SiftConfig,
    ) -> Vec<f64> {
        let img = space.level(k.p, k.q);
        let (m, n) = (img.width() as i32, img.height() as i32);
        let n_orient = cfg.n_orient;
        let mut histogram = vec![0.0f64; n_orient];

        let sigma_w =
            1.5 * cfg.sigma_0 * 2f64.powf(k.q as f64 / cfg.levels_per_octave as f64);
        let r_w = (2.5 * sigma_w).max(1.0);

        let u_min = ((k.x as f64 - r_w).floor() as i32).max(1);
        let u_max = ((k.x as f64 + r_w).ceil() as i32).min(m - 2);
        let v_min = ((k.y as f64 - r_w).floor() as i32).max(1);
        let v_max = ((k.y as f64 + r_w).ceil() as i32).min(n - 2);

        for u in u_min..=u_max {
            for v in v_min..=v_max {
                let du = (u - k.x) as f64;
                let dv = (v - k.y) as f64;
                let r2 = du * du + dv * dv;
                if r2 >= r_w * r_w {
                    continue;
                }
                let (magnitude, angle) = Self::gradient_polar(img, u as usize, v as usize);
                let z = magnitude * (-r2 / (2.0 * sigma_w * sigma_w)).exp();
                let bin = n_orient as f64 * angle / TAU;
                let alpha = bin - bin.floor();
                let k0 = (bin.floor() as usize) % n_orient;
                let k1 = (k0 + 1) % n_orient;
                histogram[k0] += (1.0 - alpha) * z;
                histogram[k1] += alpha * z;
            }
        }
        histogram
    }

    /// 3-tap [0.25, 0.5, 0.25] smoothing with wrap-around.
    fn smooth_circular(histogram: &mut [f64], passes: usize) {
        const KERNEL: [f64; 3] = [0.25, 0.5, 0.25];
        let n = histogram.len();
        if n < 2 {
            return;
        }
        for _ in 0..passes {
            let first = histogram[0];
            let mut prev = histogram[n - 1];
            for j in 0..n - 1 {
                let current = histogram[j];
                histogram[j] = KERNEL[0] * prev + KERNEL[1] * current + KERNEL[2] * histogram[j + 1];
                prev = current;
            }
            histogram[n - 1] = KERNEL[0] * prev + KERNEL[1] * histogram[n - 1] + KERNEL[2] * first;
        }
    }

    /// Bins above `t_dom_or * max` that strictly beat both circular
    /// neighbors, with sub-bin parabolic interpolation over the triple.
    fn peak_orientations(histogram: &[f64], t_dom_or: f64) -> Vec<f32> {
        let n = histogram.len();
        let h_max = histogram.iter().cloned().fold(f64::MIN, f64::max);
        let mut orientations = Vec::new();
        if h_max <= 0.0 {
            return orientations;
        }
        for k in 0..n {
            let hc = histogram[k];
            let hp = histogram[(k + n - 1) % n];
            let hn = histogram[(k + 1) % n];
            if hc > t_dom_or * h_max && hc > hp && hc > hn {
                let denom = hp - 2.0 * hc + hn;
                let k_peak = if denom.abs() > f64::EPSILON {
                    k as f64 + (hp - hn) / (2.0 * denom)
                } else {
                    k as f64
                };
                let theta = (k_peak * TAU / n as f64).rem_euclid(TAU);
                orientations.push(theta as f32);
            }
        }
        orientations
    }
}
