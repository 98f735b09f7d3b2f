//! Scale-space construction and SIFT keypoint detection.
//!
//! The pipeline stages live in their own modules: [`scale_space`] builds the
//! Gaussian/DoG pyramids, [`extrema`] scans for candidates, [`refinement`]
//! localizes them to sub-pixel precision and [`orientation`] assigns dominant
//! gradient orientations.

pub mod config;
pub mod detector;
pub mod error;
pub mod extrema;
pub mod filters;
pub mod orientation;
pub mod preprocessing;
pub mod refinement;
pub mod scale_space;
pub mod types;

pub use config::{DetectorBuilder, DetectorConfig};
pub use detector::SiftDetector;
pub use error::{DetectError, DetectResult};
pub use extrema::ExtremaDetector;
pub use orientation::OrientationAssigner;
pub use preprocessing::ImagePreprocessing;
pub use refinement::KeypointRefinement;
pub use scale_space::ScaleSpaceBuilder;
pub use types::{DogOctave, DogScaleSpace, GaussianOctave, GaussianScaleSpace};
