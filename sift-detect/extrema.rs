use crate::types::DogScaleSpace;
use rayon::prelude::*;
use sift_core::{Keypoint, SiftConfig};

/// Scans DoG levels for candidate keypoints: interior samples whose value is
/// strictly more extreme than every available neighbor in the 3x3x3 cube.
pub struct ExtremaDetector;

impl ExtremaDetector {
    /// Candidates in level (p, q). Border pixels are excluded; the spatial
    /// 3x3 neighborhood must be fully populated.
    pub fn find_extrema(dog: &DogScaleSpace, p: usize, q: usize, cfg: &SiftConfig) -> Vec<Keypoint> {
        let level = dog.level(p, q);
        let (width, height) = (level.width(), level.height());
        if width < 3 || height < 3 {
            return Vec::new();
        }

        (1..height - 1)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut found = Vec::new();
                for x in 1..width - 1 {
                    let center = level.get(x, y);
                    if (center as f64).abs() <= cfg.t_mag {
                        continue;
                    }
                    if Self::is_extremum(dog, p, q, x, y) {
                        found.push(Keypoint::new(p, q, x as i32, y as i32));
                    }
                }
                found
            })
            .collect()
    }

    /// Strict comparison against the up-to-26 neighbors across levels q-1, q,
    /// q+1. Levels outside the octave's DoG range contribute no neighbors;
    /// ties never qualify.
    fn is_extremum(dog: &DogScaleSpace, p: usize, q: usize, x: usize, y: usize) -> bool {
        let num_levels = dog.octaves[p].levels.len();
        let center = dog.level(p, q).get(x, y);
        let mut min = i16::MAX;
        let mut max = i16::MIN;

        for dq in -1i32..=1 {
            let ql = q as i32 + dq;
            if ql < 0 || ql >= num_levels as i32 {
                continue;
            }
            let neighbor_level = dog.level(p, ql as usize);
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dq == 0 && dx == 0 && dy == 0 {
                        continue;
                    }
                    let v = neighbor_level
                        .get((x as i32 + dx) as usize, (y as i32 + dy) as usize);
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        }

        center < min || center > max
    }
}
