//! LED on/off flash patterns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use venkman_core::{Error, LedStimulus, Result};

pub const DEFAULT_LED_ACTIVATION_DURATION: i64 = 60;
const MAXIMUM_DURATION: i64 = 1000;

/// Alternating on/off millisecond durations, e.g. `"5,3,5,3"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedFlashPattern {
    pattern: String,
    durations: Vec<i64>,
}

impl LedFlashPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(Error::FlashPattern("a flash pattern must be specified".into()));
        }

        let durations = pattern
            .split(',')
            .map(|token| {
                let duration: i64 = token.trim().parse().map_err(|_| {
                    Error::FlashPattern(format!(
                        "'{pattern}' should be a comma separated list of on and off \
                         millisecond durations between 0 and {MAXIMUM_DURATION} (e.g. '5,3,5,3')"
                    ))
                })?;
                if !(0..=MAXIMUM_DURATION).contains(&duration) {
                    return Err(Error::FlashPattern(format!(
                        "'{pattern}' contains {duration}; all durations must be between 0 and {MAXIMUM_DURATION}"
                    )));
                }
                Ok(duration)
            })
            .collect::<Result<Vec<_>>>()?;

        let pattern = durations.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        Ok(Self { pattern, durations })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn durations(&self) -> &[i64] {
        &self.durations
    }

    /// Stimuli for one pattern cycle: even positions on at `intensity_percentage`, odd positions off.
    pub fn stimulus_list(&self, intensity_percentage: f64) -> Vec<LedStimulus> {
        self.durations
            .iter()
            .enumerate()
            .map(|(i, &duration)| {
                let intensity = if i % 2 == 0 { intensity_percentage } else { 0.0 };
                LedStimulus::new(intensity, duration)
            })
            .collect()
    }
}

impl Default for LedFlashPattern {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_LED_ACTIVATION_DURATION.to_string(),
            durations: vec![DEFAULT_LED_ACTIVATION_DURATION],
        }
    }
}

impl FromStr for LedFlashPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for LedFlashPattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<LedFlashPattern> for String {
    fn from(pattern: LedFlashPattern) -> Self {
        pattern.pattern
    }
}

impl fmt::Display for LedFlashPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
