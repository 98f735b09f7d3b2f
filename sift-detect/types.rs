use sift_core::{DogImage, GrayImage};

/// One octave of the Gaussian pyramid: Q progressively blurred images at a
/// single spatial resolution, level 0 being the octave base.
#[derive(Debug, Clone)]
pub struct GaussianOctave {
    pub levels: Vec<GrayImage>,
}

impl GaussianOctave {
    pub fn width(&self) -> usize {
        self.levels[0].width()
    }

    pub fn height(&self) -> usize {
        self.levels[0].height()
    }
}

/// Ordered Gaussian octaves, halving in resolution from one to the next.
#[derive(Debug, Clone)]
pub struct GaussianScaleSpace {
    pub octaves: Vec<GaussianOctave>,
}

impl GaussianScaleSpace {
    pub fn level(&self, p: usize, q: usize) -> &GrayImage {
        &self.octaves[p].levels[q]
    }

    pub fn num_octaves(&self) -> usize {
        self.octaves.len()
    }
}

/// One DoG octave: Q-1 difference images, index-aligned with the Gaussian
/// octave it was derived from.
#[derive(Debug, Clone)]
pub struct DogOctave {
    pub levels: Vec<DogImage>,
}

impl DogOctave {
    pub fn width(&self) -> usize {
        self.levels[0].width()
    }

    pub fn height(&self) -> usize {
        self.levels[0].height()
    }
}

#[derive(Debug, Clone)]
pub struct DogScaleSpace {
    pub octaves: Vec<DogOctave>,
}

impl DogScaleSpace {
    pub fn level(&self, p: usize, q: usize) -> &DogImage {
        &self.octaves[p].levels[q]
    }

    pub fn num_octaves(&self) -> usize {
        self.octaves.len()
    }
}
