use crate::detector::SiftDetector;
use crate::error::{DetectError, DetectResult};
use sift_core::SiftConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete pipeline configuration: core detection parameters plus the
/// matching and preprocessing settings used by object detection.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Core SIFT parameters.
    pub core: SiftConfig,
    /// Histogram-equalize the query image before feature extraction.
    pub equalize_histogram: bool,
    /// Maximum descriptor distance for a nearest-neighbor match.
    pub match_distance: f32,
    /// Fraction of reference descriptors that must match for a detection.
    pub percentage_needed: f64,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            core: SiftConfig::default(),
            equalize_histogram: true,
            match_distance: 150.0,
            percentage_needed: 0.5,
            name: None,
            description: None,
        }
    }
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for small inputs: fewer octaves so a shallow pyramid still
    /// fits images down to roughly 64 pixels per side.
    pub fn small_image_preset() -> Self {
        Self {
            core: SiftConfig { octaves: 3, ..SiftConfig::default() },
            name: Some("Small Image".to_string()),
            description: Some("Shallow pyramid for inputs around 64-256 px".to_string()),
            ..Self::default()
        }
    }

    /// Preset trading recall for speed: shallower pyramid, stronger
    /// magnitude gate, coarser orientation histogram.
    pub fn fast_preset() -> Self {
        Self {
            core: SiftConfig {
                octaves: 3,
                t_mag: 2.0,
                n_orient: 18,
                n_threads: num_cpus::get(),
                ..SiftConfig::default()
            },
            name: Some("Fast".to_string()),
            description: Some("Fewer candidates and coarser orientations".to_string()),
            ..Self::default()
        }
    }

    /// Preset favoring recall: more refinement iterations and a permissive
    /// magnitude gate.
    pub fn quality_preset() -> Self {
        Self {
            core: SiftConfig { n_refine: 8, ..SiftConfig::default() },
            name: Some("Quality".to_string()),
            description: Some("Maximum recall at full pyramid depth".to_string()),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> DetectResult<()> {
        SiftDetector::new(self.core.clone()).map(|_| ())?;
        if !(0.0..=1.0).contains(&self.percentage_needed) {
            return Err(DetectError::InvalidParameter {
                name: "percentage_needed",
                value: self.percentage_needed,
            });
        }
        if self.match_distance < 0.0 {
            return Err(DetectError::InvalidParameter {
                name: "match_distance",
                value: self.match_distance as f64,
            });
        }
        Ok(())
    }

    /// Build a validated detector from the core parameters.
    pub fn build_detector(&self) -> DetectResult<SiftDetector> {
        self.validate()?;
        SiftDetector::new(self.core.clone())
    }

    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: {} octaves x {} levels, sigma0={}, t_mag={}, match_distance={}, needed={:.0}%",
            self.core.octaves,
            self.core.levels_per_octave,
            self.core.sigma_0,
            self.core.t_mag,
            self.match_distance,
            self.percentage_needed * 100.0
        )
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Fluent builder over the knobs that usually vary between deployments.
pub struct DetectorBuilder {
    config: DetectorConfig,
}

impl DetectorBuilder {
    pub fn new() -> Self {
        Self { config: DetectorConfig::default() }
    }

    pub fn octaves(mut self, octaves: usize) -> Self {
        self.config.core.octaves = octaves;
        self
    }

    pub fn levels_per_octave(mut self, levels: usize) -> Self {
        self.config.core.levels_per_octave = levels;
        self
    }

    pub fn base_scale(mut self, sigma_0: f64) -> Self {
        self.config.core.sigma_0 = sigma_0;
        self
    }

    pub fn magnitude_gate(mut self, t_mag: f64) -> Self {
        self.config.core.t_mag = t_mag;
        self
    }

    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.core.n_threads = n_threads;
        self
    }

    pub fn equalize_histogram(mut self, enable: bool) -> Self {
        self.config.equalize_histogram = enable;
        self
    }

    pub fn match_distance(mut self, distance: f32) -> Self {
        self.config.match_distance = distance;
        self
    }

    pub fn percentage_needed(mut self, fraction: f64) -> Self {
        self.config.percentage_needed = fraction;
        self
    }

    pub fn to_config(self) -> DetectorConfig {
        self.config
    }

    pub fn build(self) -> DetectResult<SiftDetector> {
        self.config.build_detector()
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn presets_validate() {
        assert!(DetectorConfig::small_image_preset().validate().is_ok());
        assert!(DetectorConfig::fast_preset().validate().is_ok());
        assert!(DetectorConfig::quality_preset().validate().is_ok());
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let config = DetectorConfig { percentage_needed: 1.5, ..DetectorConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(DetectError::InvalidParameter { name: "percentage_needed", .. })
        ));
    }

    #[test]
    fn builder_sets_core_parameters() {
        let config = DetectorBuilder::new()
            .octaves(3)
            .levels_per_octave(4)
            .magnitude_gate(1.0)
            .match_distance(80.0)
            .to_config();
        assert_eq!(config.core.octaves, 3);
        assert_eq!(config.core.levels_per_octave, 4);
        assert_eq!(config.core.t_mag, 1.0);
        assert_eq!(config.match_distance, 80.0);
    }

    #[test]
    fn builder_builds_valid_detector() {
        assert!(DetectorBuilder::new().octaves(3).build().is_ok());
        assert!(DetectorBuilder::new().octaves(0).build().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip_preserves_parameters() {
        let config = DetectorConfig::fast_preset();
        let json = serde_json::to_string(&config).unwrap();
        let restored: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.core.octaves, config.core.octaves);
        assert_eq!(restored.core.t_mag, config.core.t_mag);
        assert_eq!(restored.match_distance, config.match_distance);
    }
}
