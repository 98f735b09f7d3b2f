use crate::error::{DetectError, DetectResult};
use crate::extrema::ExtremaDetector;
use crate::refinement::KeypointRefinement;
use crate::scale_space::ScaleSpaceBuilder;
use crate::types::{DogScaleSpace, GaussianScaleSpace};
use rayon::prelude::*;
use sift_core::{GrayImage, Keypoint, SiftConfig};

/// Orchestrates scale-space construction and keypoint detection.
pub struct SiftDetector {
    cfg: SiftConfig,
}

impl SiftDetector {
    /// Creates a detector after validating the configuration.
    pub fn new(cfg: SiftConfig) -> DetectResult<Self> {
        if cfg.octaves == 0 {
            return Err(DetectError::InvalidParameter { name: "octaves", value: 0.0 });
        }
        if cfg.levels_per_octave < 2 {
            return Err(DetectError::InvalidLevelCount { levels: cfg.levels_per_octave });
        }
        if cfg.sigma_0 <= 0.0 {
            return Err(DetectError::InvalidParameter { name: "sigma_0", value: cfg.sigma_0 });
        }
        if cfg.sigma_s < 0.0 {
            return Err(DetectError::InvalidParameter { name: "sigma_s", value: cfg.sigma_s });
        }
        if cfg.n_orient < 2 {
            return Err(DetectError::InvalidParameter {
                name: "n_orient",
                value: cfg.n_orient as f64,
            });
        }
        if cfg.n_spat == 0 || cfg.n_angl == 0 {
            return Err(DetectError::InvalidParameter {
                name: "descriptor bins",
                value: (cfg.n_spat * cfg.n_angl) as f64,
            });
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SiftConfig {
        &self.cfg
    }

    /// Build the Gaussian and DoG scale spaces for an image.
    pub fn build_scale_space(
        &self,
        image: &GrayImage,
    ) -> DetectResult<(GaussianScaleSpace, DogScaleSpace)> {
        ScaleSpaceBuilder::build(image, &self.cfg)
    }

    /// Scan every DoG level for extrema and refine each candidate to an
    /// accepted keypoint. Per-candidate failures drop that candidate only.
    pub fn detect_keypoints(&self, dog: &DogScaleSpace) -> Vec<Keypoint> {
        let levels: Vec<(usize, usize)> = (0..dog.num_octaves())
            .flat_map(|p| (0..dog.octaves[p].levels.len()).map(move |q| (p, q)))
            .collect();

        let candidates: Vec<Keypoint> = levels
            .into_par_iter()
            .flat_map_iter(|(p, q)| ExtremaDetector::find_extrema(dog, p, q, &self.cfg))
            .collect();

        candidates
            .into_par_iter()
            .filter_map(|k| KeypointRefinement::refine(dog, k, &self.cfg))
            .collect()
    }
}
