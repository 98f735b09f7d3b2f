use crate::error::{DetectError, DetectResult};
use crate::filters;
use crate::types::{DogOctave, DogScaleSpace, GaussianOctave, GaussianScaleSpace};
use rayon::prelude::*;
use sift_core::{DogImage, GrayImage, SiftConfig};

/// Builds the Gaussian pyramid and its Difference-of-Gaussian derivative.
pub struct ScaleSpaceBuilder;

impl ScaleSpaceBuilder {
    /// Construct both scale spaces from a grayscale image assumed to carry a
    /// blur of `sigma_s` already.
    pub fn build(
        image: &GrayImage,
        cfg: &SiftConfig,
    ) -> DetectResult<(GaussianScaleSpace, DogScaleSpace)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::EmptyImage);
        }
        Self::check_depth(image, cfg)?;

        let q = cfg.levels_per_octave;

        // Bring the raw image up to the pyramid's nominal base scale.
        let initial_sigma = cfg.sigma_0 * 2f64.powf(-1.0 / q as f64);
        let sigma_inc = (initial_sigma * initial_sigma - cfg.sigma_s * cfg.sigma_s)
            .max(0.0)
            .sqrt();
        let base = if sigma_inc > 0.0 {
            let size = filters::kernel_size_for(sigma_inc);
            let mut kernel = filters::gaussian_kernel(size, sigma_inc)?;
            filters::normalize_kernel(&mut kernel);
            filters::convolve(image, &kernel, size)
        } else {
            image.clone()
        };

        let mut octaves = Vec::with_capacity(cfg.octaves);
        octaves.push(Self::gaussian_octave(base, cfg)?);
        for p in 1..cfg.octaves {
            // Each octave seeds from the previous octave's most-blurred level
            // by plain 2:1 decimation.
            let seed = filters::decimate(&octaves[p - 1].levels[q - 1]);
            octaves.push(Self::gaussian_octave(seed, cfg)?);
        }

        let dog_octaves = octaves.iter().map(Self::dog_octave).collect();

        Ok((
            GaussianScaleSpace { octaves },
            DogScaleSpace { octaves: dog_octaves },
        ))
    }

    /// Reject configurations whose deepest octave would be smaller than the
    /// smallest per-level kernel, instead of producing degenerate arrays.
    fn check_depth(image: &GrayImage, cfg: &SiftConfig) -> DetectResult<()> {
        let q = cfg.levels_per_octave;
        let sigma_min = cfg.sigma_0 * (2f64.powf(2.0 / q as f64) - 1.0).sqrt();
        let min_size = filters::kernel_size_for(sigma_min);
        let shift = cfg.octaves.saturating_sub(1);
        let deep_w = image.width() >> shift;
        let deep_h = image.height() >> shift;
        if deep_w < min_size || deep_h < min_size {
            return Err(DetectError::ScaleSpaceTooDeep {
                width: image.width(),
                height: image.height(),
                octaves: cfg.octaves,
                min_size,
            });
        }
        Ok(())
    }

    /// Blur the octave base into Q levels. Level i uses
    /// `sigma(i) = sigma_0 * sqrt(2^(2i/Q) - 1)`; level 0 reuses the base
    /// unblurred since sigma(0) is zero.
    fn gaussian_octave(base: GrayImage, cfg: &SiftConfig) -> DetectResult<GaussianOctave> {
        let q = cfg.levels_per_octave;
        let blurred: Vec<GrayImage> = (1..q)
            .into_par_iter()
            .map(|i| {
                let sd = cfg.sigma_0 * (2f64.powf(2.0 * i as f64 / q as f64) - 1.0).sqrt();
                let size = filters::kernel_size_for(sd);
                let mut kernel = filters::gaussian_kernel(size, sd)?;
                filters::normalize_kernel(&mut kernel);
                Ok(filters::convolve(&base, &kernel, size))
            })
            .collect::<DetectResult<_>>()?;

        let mut levels = Vec::with_capacity(q);
        levels.push(base);
        levels.extend(blurred);
        Ok(GaussianOctave { levels })
    }

    /// DoG level i = level(i+1) - level(i), Q-1 levels per octave.
    fn dog_octave(octave: &GaussianOctave) -> DogOctave {
        let levels = octave
            .levels
            .windows(2)
            .map(|pair| DogImage::difference(&pair[0], &pair[1]))
            .collect();
        DogOctave { levels }
    }
}
