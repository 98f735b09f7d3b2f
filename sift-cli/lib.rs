use sift_core::{init_thread_pool, GrayImage, SiftConfig, SiftDescriptor};
use sift_descriptor::DescriptorGenerator;
use sift_detect::{DetectError, DetectorConfig, ImagePreprocessing, SiftDetector};

pub mod matcher;
pub mod persist;

pub use matcher::{BoundingBox, Detection, FeatureMatcher};
pub use persist::{FeatureStore, PersistError};

pub use sift_core::{self, GrayImage as SiftImage, SiftConfig as Config, SiftDescriptor as Descriptor};

#[derive(Debug)]
pub enum SiftError {
    Detect(DetectError),
    Persist(PersistError),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for SiftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiftError::Detect(e) => write!(f, "Detection error: {}", e),
            SiftError::Persist(e) => write!(f, "Persistence error: {}", e),
            SiftError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for SiftError {}

impl From<DetectError> for SiftError {
    fn from(err: DetectError) -> Self {
        SiftError::Detect(err)
    }
}

impl From<PersistError> for SiftError {
    fn from(err: PersistError) -> Self {
        SiftError::Persist(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for SiftError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SiftError::ThreadPool(err)
    }
}

pub type SiftResult<T> = Result<T, SiftError>;

/// High-level pipeline: scale space, keypoint detection, orientation
/// assignment, description and object detection in one place.
pub struct SiftPipeline {
    detector: SiftDetector,
    equalize_histogram: bool,
}

impl SiftPipeline {
    /// Create a pipeline with a validated configuration. Uses whatever Rayon
    /// thread pool is already in place.
    pub fn new(cfg: SiftConfig) -> SiftResult<Self> {
        Ok(Self {
            detector: SiftDetector::new(cfg)?,
            equalize_histogram: true,
        })
    }

    /// Create a pipeline from a full detector configuration, honoring its
    /// preprocessing settings.
    pub fn from_config(config: &DetectorConfig) -> SiftResult<Self> {
        Ok(Self {
            detector: config.build_detector()?,
            equalize_histogram: config.equalize_histogram,
        })
    }

    /// Create a pipeline and size the global Rayon pool to `cfg.n_threads`.
    /// Fails if a global pool was already installed.
    pub fn with_thread_pool(cfg: SiftConfig) -> SiftResult<Self> {
        init_thread_pool(cfg.n_threads)?;
        Self::new(cfg)
    }

    pub fn config(&self) -> &SiftConfig {
        self.detector.config()
    }

    /// Extract SIFT descriptors from a grayscale image: build the scale
    /// spaces, detect and refine keypoints, then emit one descriptor per
    /// (keypoint, dominant orientation) pair.
    pub fn get_features(&self, image: &GrayImage) -> SiftResult<Vec<SiftDescriptor>> {
        let (gaussian, dog) = self.detector.build_scale_space(image)?;
        let keypoints = self.detector.detect_keypoints(&dog);
        Ok(DescriptorGenerator::describe_all(
            &gaussian,
            &keypoints,
            self.detector.config(),
        ))
    }

    /// Look for a previously learned object in an image. Unless disabled in
    /// the configuration, the query image is histogram-equalized first,
    /// mirroring how reference features are expected to have been extracted.
    /// An empty reference set reports "not found" rather than dividing by
    /// zero.
    pub fn detect_object(
        &self,
        image: &GrayImage,
        reference: &[SiftDescriptor],
        max_distance: f32,
        percentage_needed: f64,
    ) -> SiftResult<Detection> {
        if reference.is_empty() {
            return Ok(Detection::not_found());
        }

        let features = if self.equalize_histogram {
            self.get_features(&ImagePreprocessing::histogram_equalization(image))?
        } else {
            self.get_features(image)?
        };
        let matches = FeatureMatcher::match_features(reference, &features, max_distance);

        let ratio = matches.len() as f64 / reference.len() as f64;
        if ratio < percentage_needed {
            return Ok(Detection::not_found());
        }

        Ok(Detection {
            found: true,
            bounding_box: BoundingBox::spanning(&matches),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single bright Gaussian blob on a flat background, slightly off the
    /// pixel grid so the gradient field is not exactly symmetric.
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

    fn small_pipeline() -> SiftPipeline {
        let cfg = SiftConfig { octaves: 3, ..SiftConfig::default() };
        SiftPipeline::new(cfg).unwrap()
    }

    #[test]
    fn blob_end_to_end_yields_descriptor_near_center() {
        let pipeline = small_pipeline();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let features = pipeline.get_features(&img).unwrap();
        assert!(!features.is_empty());

        let closest = features
            .iter()
            .map(|d| {
                let dx = d.x as f64 - 32.0;
                let dy = d.y as f64 - 32.0;
                (dx * dx + dy * dy).sqrt()
            })
            .fold(f64::MAX, f64::min);
        assert!(closest < 10.0, "closest descriptor {} pixels from center", closest);
    }

    #[test]
    fn features_match_themselves_at_distance_zero() {
        let pipeline = small_pipeline();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let features = pipeline.get_features(&img).unwrap();
        assert!(!features.is_empty());
        let matches = FeatureMatcher::match_features(&features, &features, 0.0);
        // Every feature is at distance zero of itself; the match set can only
        // lose entries to byte-identical duplicates.
        assert!(!matches.is_empty());
        for m in &matches {
            assert!(features.contains(m));
        }
    }

    #[test]
    fn detect_object_with_empty_reference_reports_not_found() {
        let pipeline = small_pipeline();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let detection = pipeline.detect_object(&img, &[], 100.0, 0.5).unwrap();
        assert_eq!(detection, Detection::not_found());
    }

    #[test]
    fn detect_object_finds_itself() {
        // Equalization off so the learned and queried features line up
        // exactly on the synthetic image.
        let config = DetectorConfig {
            core: SiftConfig { octaves: 3, ..SiftConfig::default() },
            equalize_histogram: false,
            ..DetectorConfig::default()
        };
        let pipeline = SiftPipeline::from_config(&config).unwrap();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let reference = pipeline.get_features(&img).unwrap();
        assert!(!reference.is_empty());

        let detection = pipeline.detect_object(&img, &reference, 0.0, 0.5).unwrap();
        assert!(detection.found);
        let bb = detection.bounding_box.unwrap();
        assert!(bb.x_min <= bb.x_max && bb.y_min <= bb.y_max);
    }

    #[test]
    fn feature_persistence_round_trips_through_pipeline_output() {
        let pipeline = small_pipeline();
        let img = blob_image(64, 64, 31.6, 32.4, 3.0);
        let features = pipeline.get_features(&img).unwrap();

        let path = std::env::temp_dir()
            .join(format!("sift-pipeline-{}.json", std::process::id()));
        FeatureStore::save(&path, &features).unwrap();
        let restored = FeatureStore::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(restored, features);
    }

    #[test]
    fn oversized_pyramid_is_rejected_not_degenerate() {
        let cfg = SiftConfig::default(); // 4 octaves are too deep for 64 px
        let pipeline = SiftPipeline::new(cfg).unwrap();
        let img = blob_image(64, 64, 32.0, 32.0, 3.0);
        assert!(matches!(
            pipeline.get_features(&img),
            Err(SiftError::Detect(DetectError::ScaleSpaceTooDeep { .. }))
        ));
    }
}
