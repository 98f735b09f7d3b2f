#[derive(Debug, Clone)]
pub enum DetectError {
    EmptyImage,
    InvalidImageData { expected_len: usize, actual_len: usize },
    InvalidKernelSize { size: usize },
    ScaleSpaceTooDeep { width: usize, height: usize, octaves: usize, min_size: usize },
    InvalidLevelCount { levels: usize },
    InvalidParameter { name: &'static str, value: f64 },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::EmptyImage => {
                write!(f, "Input image has zero width or height")
            }
            DetectError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            DetectError::InvalidKernelSize { size } => {
                write!(f, "Invalid kernel size: {} (must be odd)", size)
            }
            DetectError::ScaleSpaceTooDeep { width, height, octaves, min_size } => {
                write!(
                    f,
                    "Image {}x{} too small for {} octaves (deepest octave needs at least {}x{})",
                    width, height, octaves, min_size, min_size
                )
            }
            DetectError::InvalidLevelCount { levels } => {
                write!(f, "Invalid levels per octave: {} (must be >= 2)", levels)
            }
            DetectError::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for DetectError {}

pub type DetectResult<T> = Result<T, DetectError>;
