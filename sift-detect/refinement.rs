use crate::types::DogScaleSpace;
use nalgebra::{Matrix3, Vector3};
use sift_core::{offset, Keypoint, SiftConfig};

/// Iterative sub-pixel localization of extrema candidates via a Newton step
/// on the local quadratic Taylor model of the DoG.
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Relocate and validate a candidate. Returns the accepted keypoint, or
    /// None when the candidate is rejected (degenerate Hessian, weak peak,
    /// saddle/edge response, out of the interior, or non-convergence).
    pub fn refine(dog: &DogScaleSpace, candidate: Keypoint, cfg: &SiftConfig) -> Option<Keypoint> {
        let mut k = candidate;
        for _ in 0..cfg.n_refine {
            if !Self::is_inside(dog, &k) {
                return None;
            }
            let n = Self::neighborhood(dog, &k);

            let delta = Vector3::new(
                0.5 * (n[2][1][1] - n[0][1][1]),
                0.5 * (n[1][2][1] - n[1][0][1]),
                0.5 * (n[1][1][2] - n[1][1][0]),
            );

            let center = n[1][1][1];
            let dxx = n[0][1][1] - 2.0 * center + n[2][1][1];
            let dyy = n[1][0][1] - 2.0 * center + n[1][2][1];
            let dss = n[1][1][0] - 2.0 * center + n[1][1][2];
            let dxy = 0.25 * (n[2][2][1] - n[0][2][1] - n[2][0][1] + n[0][0][1]);
            let dxs = 0.25 * (n[2][1][2] - n[0][1][2] - n[2][1][0] + n[0][1][0]);
            let dys = 0.25 * (n[1][2][2] - n[1][0][2] - n[1][2][0] + n[1][0][0]);
            let hessian = Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss);

            let lu = hessian.lu();
            if lu.determinant().abs() < 1e-9 {
                return None;
            }
            let d = lu.solve(&(-delta))?;

            if d.x.abs() < 0.5 && d.y.abs() < 0.5 {
                let peak = center + 0.5 * delta.dot(&d);
                let spatial_det = dxx * dyy - dxy * dxy;
                if peak.abs() > cfg.t_peak && spatial_det > 0.0 {
                    return Some(offset(&k, 0, 0, d.x.round() as i32, d.y.round() as i32));
                }
                return None;
            }

            // Step to the nearest neighboring position at the same (p, q).
            let du = (d.x.round() as i32).clamp(-1, 1);
            let dv = (d.y.round() as i32).clamp(-1, 1);
            k = offset(&k, 0, 0, du, dv);
        }
        None
    }

    /// 3x3x3 neighborhood indexed [x][y][scale]. Scale planes outside the
    /// octave's DoG range read as zero.
    fn neighborhood(dog: &DogScaleSpace, k: &Keypoint) -> [[[f64; 3]; 3]; 3] {
        let num_levels = dog.octaves[k.p].levels.len() as i32;
        let mut n = [[[0.0f64; 3]; 3]; 3];
        for ds in -1i32..=1 {
            let ql = k.q as i32 + ds;
            if ql < 0 || ql >= num_levels {
                continue;
            }
            let level = dog.level(k.p, ql as usize);
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let v = level.get((k.x + dx) as usize, (k.y + dy) as usize);
                    n[(dx + 1) as usize][(dy + 1) as usize][(ds + 1) as usize] = v as f64;
                }
            }
        }
        n
    }

    /// Interior test: the full spatial 3x3 neighborhood must exist.
    fn is_inside(dog: &DogScaleSpace, k: &Keypoint) -> bool {
        if k.q >= dog.octaves[k.p].levels.len() {
            return false;
        }
        let level = dog.level(k.p, k.q);
        let (m, n) = (level.width() as i32, level.height() as i32);
        k.x > 0 && k.x < m - 1 && k.y > 0 && k.y < n - 1
    }
}
