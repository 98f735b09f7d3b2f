use sift_core::SiftDescriptor;
use std::path::Path;

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Malformed(serde_json::Error),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "I/O error: {}", e),
            PersistError::Malformed(e) => write!(f, "Malformed feature file: {}", e),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(err: std::io::Error) -> Self {
        PersistError::Io(err)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Malformed(err)
    }
}

/// Flat on-disk list of descriptors. JSON with shortest-round-trip floats,
/// so save followed by load reproduces the input exactly.
pub struct FeatureStore;

impl FeatureStore {
    pub fn save<P: AsRef<Path>>(path: P, features: &[SiftDescriptor]) -> Result<(), PersistError> {
        let json = serde_json::to_string(features)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<SiftDescriptor>, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sift-features-{}-{}.json", std::process::id(), name))
    }

    fn sample_features() -> Vec<SiftDescriptor> {
        vec![
            SiftDescriptor {
                x: 12,
                y: 34,
                sigma: 1.6,
                orientation: 0.1,
                features: vec![0, 1, 127, 255],
            },
            SiftDescriptor {
                x: -3,
                y: 0,
                sigma: 6.349_604,
                orientation: std::f32::consts::PI,
                features: vec![17; 8],
            },
        ]
    }

    #[test]
    fn save_load_round_trips_exactly() {
        let path = temp_path("roundtrip");
        let features = sample_features();
        FeatureStore::save(&path, &features).unwrap();
        let restored = FeatureStore::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(restored, features);
    }

    #[test]
    fn empty_list_round_trips() {
        let path = temp_path("empty");
        FeatureStore::save(&path, &[]).unwrap();
        let restored = FeatureStore::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(restored.is_empty());
    }

    #[test]
    fn corrupt_file_surfaces_malformed_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not valid json").unwrap();
        let result = FeatureStore::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(PersistError::Malformed(_))));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let result = FeatureStore::load(temp_path("does-not-exist"));
        assert!(matches!(result, Err(PersistError::Io(_))));
    }
}
