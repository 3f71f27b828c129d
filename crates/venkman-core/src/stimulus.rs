//! LED stimulus values.

use serde::{Deserialize, Serialize};

/// One LED flash: intensity percentage in [0, 100] held for `duration_ms` milliseconds.
///
/// Both fields are clamped on construction and on every mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "StimulusFields")]
pub struct LedStimulus {
    intensity_percentage: f64,
    duration_ms: i64,
}

#[derive(Deserialize)]
struct StimulusFields {
    intensity_percentage: f64,
    duration_ms: i64,
}

impl From<StimulusFields> for LedStimulus {
    fn from(fields: StimulusFields) -> Self {
        Self::new(fields.intensity_percentage, fields.duration_ms)
    }
}

impl LedStimulus {
    pub fn new(intensity_percentage: f64, duration_ms: i64) -> Self {
        Self {
            intensity_percentage: clamp_percentage(intensity_percentage),
            duration_ms: duration_ms.max(0),
        }
    }

    pub fn intensity_percentage(&self) -> f64 {
        self.intensity_percentage
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn scale(&mut self, factor: f64) {
        self.intensity_percentage = clamp_percentage(self.intensity_percentage * factor);
    }

    /// Scale by `factor`, using `floor` instead whenever the scaled value drops below it.
    pub fn scale_with_floor(&mut self, factor: f64, floor: f64) {
        let scaled = self.intensity_percentage * factor;
        self.intensity_percentage = clamp_percentage(if scaled < floor { floor } else { scaled });
    }

    pub fn add_intensity(&mut self, addend: f64) {
        self.intensity_percentage = clamp_percentage(self.intensity_percentage + addend);
    }
}

/// Durations match exactly; intensities match when equal to 4 decimal places.
impl PartialEq for LedStimulus {
    fn eq(&self, other: &Self) -> bool {
        self.duration_ms == other.duration_ms
            && round_to_4_places(self.intensity_percentage) == round_to_4_places(other.intensity_percentage)
    }
}

fn clamp_percentage(value: f64) -> f64 {
    if value > 100.0 {
        100.0
    } else if value < 0.0 {
        0.0
    } else {
        value
    }
}

fn round_to_4_places(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_clamps() {
        let high = LedStimulus::new(150.0, -5);
        assert_eq!(high.intensity_percentage(), 100.0);
        assert_eq!(high.duration_ms(), 0);

        let low = LedStimulus::new(-20.0, 60);
        assert_eq!(low.intensity_percentage(), 0.0);
        assert_eq!(low.duration_ms(), 60);
    }

    #[test]
    fn test_mutations_clamp() {
        let mut stimulus = LedStimulus::new(60.0, 60);
        stimulus.scale(2.0);
        assert_eq!(stimulus.intensity_percentage(), 100.0);

        stimulus.add_intensity(-250.0);
        assert_eq!(stimulus.intensity_percentage(), 0.0);

        stimulus.add_intensity(12.5);
        assert_eq!(stimulus.intensity_percentage(), 12.5);
    }

    #[test]
    fn test_scale_with_floor() {
        let mut stimulus = LedStimulus::new(40.0, 60);
        stimulus.scale_with_floor(0.1, 10.0);
        assert_eq!(stimulus.intensity_percentage(), 10.0);

        let mut stimulus = LedStimulus::new(40.0, 60);
        stimulus.scale_with_floor(0.5, 10.0);
        assert_eq!(stimulus.intensity_percentage(), 20.0);
    }

    #[test]
    fn test_equality_rounds_intensity() {
        assert_eq!(LedStimulus::new(33.33331, 60), LedStimulus::new(33.33334, 60));
        assert_ne!(LedStimulus::new(33.3331, 60), LedStimulus::new(33.3336, 60));
        assert_ne!(LedStimulus::new(50.0, 60), LedStimulus::new(50.0, 61));
    }

    #[test]
    fn test_deserialize_clamps() {
        let stimulus: LedStimulus =
            serde_json::from_str(r#"{"intensity_percentage": 120.0, "duration_ms": 60}"#).unwrap();
        assert_eq!(stimulus.intensity_percentage(), 100.0);
    }
}
