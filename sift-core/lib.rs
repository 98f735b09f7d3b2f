//! Core types shared by the SIFT detection, description and matching crates.

/// Row-major 8-bit grayscale image with immutable dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width * height, "pixel buffer length mismatch");
        Self { width, height, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Row-major signed difference image. Differences of 8-bit samples can be
/// negative, so DoG levels use a wider signed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DogImage {
    width: usize,
    height: usize,
    data: Vec<i16>,
}

impl DogImage {
    pub fn from_raw(width: usize, height: usize, data: Vec<i16>) -> Self {
        assert_eq!(data.len(), width * height, "pixel buffer length mismatch");
        Self { width, height, data }
    }

    /// Element-wise `next - current` of two Gaussian levels.
    pub fn difference(current: &GrayImage, next: &GrayImage) -> Self {
        assert_eq!(current.width(), next.width());
        assert_eq!(current.height(), next.height());
        let data = current
            .data()
            .iter()
            .zip(next.data())
            .map(|(&a, &b)| b as i16 - a as i16)
            .collect();
        Self {
            width: current.width(),
            height: current.height(),
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> i16 {
        self.data[y * self.width + x]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[i16] {
        &self.data
    }
}

/// Discrete keypoint: octave `p`, DoG scale level `q`, and spatial position
/// `(x, y)` in octave-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypoint {
    pub p: usize,
    pub q: usize,
    pub x: i32,
    pub y: i32,
}

impl Keypoint {
    pub fn new(p: usize, q: usize, x: i32, y: i32) -> Self {
        Self { p, q, x, y }
    }
}

/// Component-wise displacement of a keypoint.
pub fn offset(k: &Keypoint, dp: i32, dq: i32, dx: i32, dy: i32) -> Keypoint {
    Keypoint {
        p: (k.p as i32 + dp) as usize,
        q: (k.q as i32 + dq) as usize,
        x: k.x + dx,
        y: k.y + dy,
    }
}

/// Final SIFT feature: position in octave-0 (full image) coordinates, the
/// absolute blur scale it was found at, its assigned orientation in radians
/// and the quantized feature vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiftDescriptor {
    pub x: i32,
    pub y: i32,
    pub sigma: f32,
    pub orientation: f32,
    pub features: Vec<u8>,
}

/// Pipeline parameters. Defaults follow the conventional SIFT constants.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiftConfig {
    /// Number of octaves P in the scale space.
    pub octaves: usize,
    /// Gaussian levels Q per octave; each DoG octave has Q-1 levels.
    pub levels_per_octave: usize,
    /// Blur assumed present in the raw input image.
    pub sigma_s: f64,
    /// Nominal base scale of the pyramid.
    pub sigma_0: f64,
    /// Magnitude gate for extrema candidates.
    pub t_mag: f64,
    /// Minimum interpolated DoG peak magnitude for an accepted keypoint.
    pub t_peak: f64,
    /// Maximum refinement iterations per candidate.
    pub n_refine: usize,
    /// Orientation histogram bin count.
    pub n_orient: usize,
    /// Circular smoothing passes over the orientation histogram.
    pub n_smooth: usize,
    /// Dominant-orientation acceptance fraction of the histogram maximum.
    pub t_dom_or: f64,
    /// Spatial bins per axis in the descriptor histogram.
    pub n_spat: usize,
    /// Angular bins in the descriptor histogram.
    pub n_angl: usize,
    /// Descriptor support size in units of the level scale.
    pub s_desc: f64,
    /// Quantization scale applied to the normalized feature vector.
    pub s_fscale: f64,
    /// Per-component clip applied between the two normalization passes.
    pub t_fclip: f32,
    pub n_threads: usize,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            levels_per_octave: 3,
            sigma_s: 0.5,
            sigma_0: 1.6,
            t_mag: 0.01,
            t_peak: 0.01,
            n_refine: 5,
            n_orient: 36,
            n_smooth: 2,
            t_dom_or: 0.8,
            n_spat: 4,
            n_angl: 16,
            s_desc: 10.0,
            s_fscale: 512.0,
            t_fclip: 0.2,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Initialize the global Rayon thread pool with the specified number of threads.
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
