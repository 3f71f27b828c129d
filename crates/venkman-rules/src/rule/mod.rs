//! Stimulus rules: strategies that turn the frame history into LED stimuli.

mod defined_environment;
mod imported;
mod max_length;
mod scaled_run;

pub use defined_environment::{DefinedEnvironment, DefinedEnvironmentBasedUponOrientation, Orientation};
pub use imported::ImportedStimulus;
pub use max_length::DefinedEnvironmentForMaximumLengthWithAdditiveFunction;
pub use scaled_run::{ScaledRunIntensity, ScaledRunIntensityWithRandomDelay};

use ndarray::Array2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use venkman_core::{Error, LedStimulus, Result};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters, LarvaFrameData};

/// Rule data names and values logged so a session can be reconstructed.
pub mod rule_data_names {
    pub const INTENSITY_FUNCTION: &str = "intensity function";
    pub const PRIMARY: &str = "primary";
    pub const ALTERNATE: &str = "alternate";
    pub const ROTATION_CENTER: &str = "rotationCenter";
    pub const ROTATION_ANGLE_IN_DEGREES: &str = "rotationAngleInDegrees";
    pub const X_OFFSET: &str = "xOffset";
    pub const Y_OFFSET: &str = "yOffset";
}

/// Named value recorded by a rule at a capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleData {
    pub capture_time: i64,
    pub name: String,
    pub value: String,
}

impl RuleData {
    pub fn new(capture_time: i64, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            capture_time,
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Session owned state handed to a rule for each frame.
pub struct RuleContext<'a> {
    pub rng: &'a mut StdRng,
    rule_data: &'a mut Vec<RuleData>,
}

impl<'a> RuleContext<'a> {
    pub fn new(rng: &'a mut StdRng, rule_data: &'a mut Vec<RuleData>) -> Self {
        Self { rng, rule_data }
    }

    pub fn log_rule_data(&mut self, capture_time: i64, name: &str, value: impl Into<String>) {
        let data = RuleData::new(capture_time, name, value);
        debug!(capture_time, name = %data.name, value = %data.value, "Rule data");
        self.rule_data.push(data);
    }
}

/// A closed-loop stimulus strategy.
pub trait StimulusRule: Send {
    fn code(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn supports_version(&self, version: &str) -> bool {
        version == "1"
    }

    /// Called once before the first frame.
    fn init(&mut self) {}

    fn override_behavior_parameters(&mut self, params: LarvaBehaviorParameters) -> LarvaBehaviorParameters {
        params
    }

    /// Stimuli for the most recent frame in `history`.
    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>>;

    /// Intensity landscape sampled on a `height × width` raster, for rules
    /// driven by position.
    fn arena(&self, _width: usize, _height: usize) -> Option<Result<Array2<f64>>> {
        None
    }
}

pub fn zero_intensity_for_one_second() -> Vec<LedStimulus> {
    vec![LedStimulus::new(0.0, 1000)]
}

pub fn ignore_intensity_for_frame() -> Vec<LedStimulus> {
    Vec::new()
}

fn current_frame(history: &FrameHistory) -> Result<&LarvaFrameData> {
    history
        .most_recent()
        .ok_or_else(|| Error::InvalidInput("stimulus requested without any frames".into()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use venkman_core::{LarvaBehaviorMode, LarvaSkeleton, TrackerPoint};
    use venkman_tracking::{FrameHistory, LarvaFrameData};

    pub fn skeleton_at(time: i64, head: TrackerPoint, midpoint: TrackerPoint, tail: TrackerPoint) -> LarvaSkeleton {
        LarvaSkeleton::new(time, head, midpoint, tail, 2.0, midpoint, 0.0, 0.0)
    }

    pub fn history_with(frames: Vec<LarvaFrameData>) -> FrameHistory {
        let mut history = FrameHistory::new();
        for frame in frames {
            history.push_front(frame);
        }
        history
    }

    pub fn frame_at(time: i64, mode: LarvaBehaviorMode) -> LarvaFrameData {
        let p = TrackerPoint::new(1.0, 1.0);
        LarvaFrameData::with_mode(skeleton_at(time, p, p, p), mode)
    }
}
