//! Base intensities and Gaussian noise.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use venkman_core::LedStimulus;

/// Gaussian noise with the given mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGenerator {
    pub mean: f64,
    pub standard_deviation: f64,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self {
            mean: 0.0,
            standard_deviation: 1.0,
        }
    }
}

impl NoiseGenerator {
    pub fn new(mean: f64, standard_deviation: f64) -> Self {
        Self {
            mean,
            standard_deviation,
        }
    }

    pub fn noise(&self, rng: &mut StdRng) -> f64 {
        let sample: f64 = rng.sample(StandardNormal);
        sample * self.standard_deviation + self.mean
    }
}

/// Add noise scaled to each stimulus's intensity over `signal_to_noise_ratio`.
///
/// A ratio of zero disables noise.
pub fn add_noise_using_ratio(signal_to_noise_ratio: f64, stimuli: &mut [LedStimulus], rng: &mut StdRng) {
    if signal_to_noise_ratio == 0.0 {
        return;
    }
    for stimulus in stimuli.iter_mut() {
        let sample: f64 = rng.sample(StandardNormal);
        let noise = (stimulus.intensity_percentage() / signal_to_noise_ratio) * sample;
        stimulus.add_intensity(noise);
    }
}

/// Intensity percentage with optional additive noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityValue {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<NoiseGenerator>,
}

impl IntensityValue {
    pub fn new(value: f64) -> Self {
        Self { value, noise: None }
    }

    pub fn with_noise(value: f64, noise: NoiseGenerator) -> Self {
        Self {
            value,
            noise: Some(noise),
        }
    }

    pub fn value(&self, rng: &mut StdRng) -> f64 {
        match &self.noise {
            Some(generator) => self.value + generator.noise(rng),
            None => self.value,
        }
    }
}

impl Default for IntensityValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}
