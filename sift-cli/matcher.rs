use rayon::prelude::*;
use sift_core::SiftDescriptor;

/// Axis-aligned bounding box in full-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    /// Smallest box spanning the descriptors' positions. None when empty.
    pub fn spanning(descriptors: &[SiftDescriptor]) -> Option<Self> {
        let first = descriptors.first()?;
        let mut bb = BoundingBox {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        for d in &descriptors[1..] {
            bb.x_min = bb.x_min.min(d.x);
            bb.y_min = bb.y_min.min(d.y);
            bb.x_max = bb.x_max.max(d.x);
            bb.y_max = bb.y_max.max(d.y);
        }
        Some(bb)
    }
}

/// Result of an object detection query.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub found: bool,
    pub bounding_box: Option<BoundingBox>,
}

impl Detection {
    pub fn not_found() -> Self {
        Self { found: false, bounding_box: None }
    }
}

/// Nearest-neighbor matching over quantized feature vectors.
pub struct FeatureMatcher;

impl FeatureMatcher {
    /// The subset of `candidate` descriptors that are the nearest neighbor,
    /// within `max_distance`, of some reference descriptor. Reference
    /// descriptors are scanned independently and in parallel.
    pub fn match_features(
        reference: &[SiftDescriptor],
        candidate: &[SiftDescriptor],
        max_distance: f32,
    ) -> Vec<SiftDescriptor> {
        if reference.is_empty() || candidate.is_empty() {
            return Vec::new();
        }

        let mut matched: Vec<usize> = reference
            .par_iter()
            .filter_map(|r| Self::nearest(r, candidate, max_distance))
            .collect();
        matched.sort_unstable();
        matched.dedup();
        matched.into_iter().map(|i| candidate[i].clone()).collect()
    }

    /// Index of the closest candidate, if within `max_distance`. The bound is
    /// closed so an identical descriptor matches at distance zero.
    fn nearest(
        reference: &SiftDescriptor,
        candidate: &[SiftDescriptor],
        max_distance: f32,
    ) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, c) in candidate.iter().enumerate() {
            let d = Self::distance(reference, c);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.and_then(|(i, d)| (d <= max_distance).then_some(i))
    }

    /// Euclidean distance over the quantized feature vectors.
    pub fn distance(a: &SiftDescriptor, b: &SiftDescriptor) -> f32 {
        debug_assert_eq!(a.features.len(), b.features.len());
        let sum: f32 = a
            .features
            .iter()
            .zip(&b.features)
            .map(|(&x, &y)| {
                let d = x as f32 - y as f32;
                d * d
            })
            .sum();
        sum.sqrt()
    }
}
