use ndarray::Array2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;
use venkman_core::{
    angle_between_vectors, is_coordinate_left_of_vector, point_on_vector, rotated_point, Error, LarvaSkeleton,
    LedStimulus, Result, TrackerPoint,
};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters, LarvaFrameData};

use super::{current_frame, rule_data_names, zero_intensity_for_one_second, RuleContext, RuleData, StimulusRule};
use crate::flash::LedFlashPattern;
use crate::intensity::{add_noise_using_ratio, NoiseGenerator};
use crate::kinematic::BehaviorLimitedKinematicVariableFunctionList;
use crate::positional::PositionalVariableFunction;

pub const DEFAULT_ORIENTATION_DERIVATION_DURATION: i64 = 15000;

/// Rigid transform that lines the larva up with the arena center.
///
/// Points are rotated about `rotation_center` and then shifted by the
/// offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub rotate_time: i64,
    pub rotation_angle_in_radians: f64,
    pub rotation_center: TrackerPoint,
    pub x_offset: f64,
    pub y_offset: f64,
}

impl Orientation {
    /// Rotate the tail→midpoint vector parallel to centroid→arena center and
    /// place the centroid `centroid_distance_from_arena_center` from the center.
    pub fn derive(
        capture_time: i64,
        skeleton: &LarvaSkeleton,
        arena_center: &TrackerPoint,
        centroid_distance_from_arena_center: f64,
        offset_in_degrees: f64,
    ) -> Self {
        let tail = skeleton.tail;
        let midpoint = skeleton.midpoint;
        let centroid = skeleton.centroid;

        let absolute_angle = angle_between_vectors(&tail, &midpoint, &centroid, arena_center);

        // the derived angle is unsigned; shift the tail onto the centroid and
        // check which side of centroid→center the shifted midpoint falls on
        let shifted_midpoint = midpoint.offset(centroid.x - tail.x, centroid.y - tail.y);
        let signed_angle = if is_coordinate_left_of_vector(&shifted_midpoint, &centroid, arena_center) {
            absolute_angle
        } else {
            -absolute_angle
        };

        let transformed_centroid = point_on_vector(arena_center, &centroid, centroid_distance_from_arena_center);

        Self {
            rotate_time: capture_time,
            rotation_angle_in_radians: signed_angle + offset_in_degrees.to_radians(),
            rotation_center: centroid,
            x_offset: transformed_centroid.x - centroid.x,
            y_offset: transformed_centroid.y - centroid.y,
        }
    }

    /// Rebuild a transform from logged rule data.
    ///
    /// When no center was logged, the centroid of the frame captured at the
    /// rotation time is used.
    pub fn restore<'a>(
        frames: impl IntoIterator<Item = &'a LarvaFrameData>,
        rule_data: &[RuleData],
    ) -> Result<Self> {
        let mut rotation_center = None;
        let mut rotation = None;
        let mut x_offset = 0.0;
        let mut y_offset = 0.0;

        for data in rule_data {
            match data.name.as_str() {
                rule_data_names::ROTATION_CENTER => rotation_center = Some(data.value.parse::<TrackerPoint>()?),
                rule_data_names::ROTATION_ANGLE_IN_DEGREES => {
                    let degrees = parse_logged_value(data)?;
                    rotation = Some((data.capture_time, degrees.to_radians()));
                }
                rule_data_names::X_OFFSET => x_offset = parse_logged_value(data)?,
                rule_data_names::Y_OFFSET => y_offset = parse_logged_value(data)?,
                _ => {}
            }
        }

        let (rotate_time, rotation_angle_in_radians) =
            rotation.ok_or_else(|| Error::InvalidInput("no rotation angle was logged".into()))?;

        let rotation_center = match rotation_center {
            Some(center) => center,
            None => frames
                .into_iter()
                .find(|frame| frame.time() == rotate_time)
                .map(|frame| frame.skeleton().centroid)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("no rotation center or frame logged at {rotate_time}"))
                })?,
        };

        Ok(Self {
            rotate_time,
            rotation_angle_in_radians,
            rotation_center,
            x_offset,
            y_offset,
        })
    }

    pub fn rotated_point(&self, point: &TrackerPoint) -> TrackerPoint {
        rotated_point(point, self.rotation_angle_in_radians, &self.rotation_center)
    }

    pub fn transformed_point(&self, rotated: &TrackerPoint) -> TrackerPoint {
        rotated.offset(self.x_offset, self.y_offset)
    }

    /// Rotated and shifted copy of `skeleton`. Time, length and angles are kept.
    pub fn rotated_and_transformed_skeleton(&self, skeleton: &LarvaSkeleton) -> LarvaSkeleton {
        let transform = |point: &TrackerPoint| self.transformed_point(&self.rotated_point(point));
        LarvaSkeleton {
            head: transform(&skeleton.head),
            midpoint: transform(&skeleton.midpoint),
            tail: transform(&skeleton.tail),
            centroid: transform(&skeleton.centroid),
            ..*skeleton
        }
    }

    fn log(&self, ctx: &mut RuleContext<'_>) {
        let time = self.rotate_time;
        ctx.log_rule_data(time, rule_data_names::ROTATION_CENTER, self.rotation_center.to_string());
        ctx.log_rule_data(
            time,
            rule_data_names::ROTATION_ANGLE_IN_DEGREES,
            self.rotation_angle_in_radians.to_degrees().to_string(),
        );
        ctx.log_rule_data(time, rule_data_names::X_OFFSET, self.x_offset.to_string());
        ctx.log_rule_data(time, rule_data_names::Y_OFFSET, self.y_offset.to_string());
    }
}

fn parse_logged_value(data: &RuleData) -> Result<f64> {
    data.value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid {} value '{}'", data.name, data.value)))
}

/// Chemotaxis in a virtual light landscape: intensity is looked up from the
/// larva's position, optionally after re-orienting the landscape around the
/// larva's initial heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinedEnvironment {
    pub flash_pattern: LedFlashPattern,
    pub intensity_function: PositionalVariableFunction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity_noise: Option<NoiseGenerator>,
    pub signal_to_noise_ratio: f64,
    pub enable_orientation_logic: bool,
    pub orientation_derivation_duration: i64,
    pub centroid_distance_from_arena_center: f64,
    pub centered_orientation_offset_in_degrees: f64,
    pub intensity_filters: BehaviorLimitedKinematicVariableFunctionList,
    #[serde(skip)]
    orientation: Option<Orientation>,
}

impl Default for DefinedEnvironment {
    fn default() -> Self {
        Self::new(LedFlashPattern::default(), PositionalVariableFunction::default(), 0.0)
    }
}

impl DefinedEnvironment {
    pub fn new(
        flash_pattern: LedFlashPattern,
        intensity_function: PositionalVariableFunction,
        signal_to_noise_ratio: f64,
    ) -> Self {
        Self {
            flash_pattern,
            intensity_function,
            intensity_noise: None,
            signal_to_noise_ratio,
            enable_orientation_logic: false,
            orientation_derivation_duration: DEFAULT_ORIENTATION_DERIVATION_DURATION,
            centroid_distance_from_arena_center: 0.0,
            centered_orientation_offset_in_degrees: 0.0,
            intensity_filters: BehaviorLimitedKinematicVariableFunctionList::default(),
            orientation: None,
        }
    }

    pub fn with_orientation(
        mut self,
        orientation_derivation_duration: i64,
        centroid_distance_from_arena_center: f64,
        centered_orientation_offset_in_degrees: f64,
    ) -> Self {
        self.enable_orientation_logic = true;
        self.orientation_derivation_duration = orientation_derivation_duration;
        self.centroid_distance_from_arena_center = centroid_distance_from_arena_center;
        self.centered_orientation_offset_in_degrees = centered_orientation_offset_in_degrees;
        self
    }

    pub fn with_intensity_filters(mut self, filters: BehaviorLimitedKinematicVariableFunctionList) -> Self {
        self.intensity_filters = filters;
        self
    }

    pub fn with_intensity_noise(mut self, noise: NoiseGenerator) -> Self {
        self.intensity_noise = Some(noise);
        self
    }

    pub fn arena_center(&self) -> TrackerPoint {
        TrackerPoint::new(
            self.intensity_function.maximum_x() / 2.0,
            self.intensity_function.maximum_y() / 2.0,
        )
    }

    pub fn orientation(&self) -> Option<&Orientation> {
        self.orientation.as_ref()
    }

    /// True once positions can be mapped into the landscape.
    pub fn is_oriented(&self) -> bool {
        !self.enable_orientation_logic || self.orientation.is_some()
    }

    pub fn rotated_point(&self, point: &TrackerPoint) -> TrackerPoint {
        match self.active_orientation() {
            Some(orientation) => orientation.rotated_point(point),
            None => *point,
        }
    }

    pub fn transformed_point(&self, rotated: &TrackerPoint) -> TrackerPoint {
        match self.active_orientation() {
            Some(orientation) => orientation.transformed_point(rotated),
            None => *rotated,
        }
    }

    pub fn rotated_and_transformed_skeleton(&self, skeleton: &LarvaSkeleton) -> LarvaSkeleton {
        match self.active_orientation() {
            Some(orientation) => orientation.rotated_and_transformed_skeleton(skeleton),
            None => *skeleton,
        }
    }

    /// Restore the orientation of a previously logged session.
    pub fn restore_transformation_parameters(&mut self, frames: &FrameHistory, rule_data: &[RuleData]) -> Result<()> {
        self.orientation = Some(Orientation::restore(frames, rule_data)?);
        Ok(())
    }

    fn active_orientation(&self) -> Option<&Orientation> {
        self.orientation.as_ref().filter(|_| self.enable_orientation_logic)
    }

    fn intensity(&self, base: f64, rng: &mut StdRng) -> f64 {
        match &self.intensity_noise {
            Some(noise) => base + noise.noise(rng),
            None => base,
        }
    }

    /// Flash pattern at the landscape intensity under the larva.
    ///
    /// While the orientation is still being derived `default_stimulus` is
    /// returned instead.
    pub(crate) fn position_based_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        frame: &LarvaFrameData,
        default_stimulus: impl FnOnce(&mut StdRng) -> Vec<LedStimulus>,
    ) -> Result<Vec<LedStimulus>> {
        let value = if self.enable_orientation_logic {
            let capture_time = frame.time();
            if capture_time < self.orientation_derivation_duration {
                return Ok(default_stimulus(ctx.rng));
            }

            let orientation = match self.orientation {
                Some(orientation) => orientation,
                None => {
                    let orientation = Orientation::derive(
                        capture_time,
                        frame.skeleton(),
                        &self.arena_center(),
                        self.centroid_distance_from_arena_center,
                        self.centered_orientation_offset_in_degrees,
                    );
                    info!(
                        capture_time,
                        rotation_degrees = orientation.rotation_angle_in_radians.to_degrees(),
                        center = %orientation.rotation_center,
                        x_offset = orientation.x_offset,
                        y_offset = orientation.y_offset,
                        "Derived landscape orientation"
                    );
                    orientation.log(ctx);
                    self.orientation = Some(orientation);
                    orientation
                }
            };

            let point = self.intensity_function.variable().value(frame);
            let transformed = orientation.transformed_point(&orientation.rotated_point(&point));
            self.intensity_function.value_at_point(&transformed)?
        } else {
            self.intensity_function.value(frame)?
        };

        let value = self.intensity(value, ctx.rng);
        Ok(self.flash_pattern.stimulus_list(value))
    }

    pub(crate) fn apply_intensity_filters_and_white_noise(
        &self,
        ctx: &mut RuleContext<'_>,
        frame: &LarvaFrameData,
        stimuli: &mut [LedStimulus],
        minimum_intensity: f64,
    ) -> Result<()> {
        self.intensity_filters.apply_values(frame, stimuli, minimum_intensity)?;
        add_noise_using_ratio(self.signal_to_noise_ratio, stimuli, ctx.rng);
        Ok(())
    }
}

impl StimulusRule for DefinedEnvironment {
    fn code(&self) -> &'static str {
        "1.1"
    }

    fn description(&self) -> &'static str {
        "Chemotaxis in response to virtual light gradients."
    }

    fn init(&mut self) {
        self.orientation = None;
    }

    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        _params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        let frame = current_frame(history)?;
        let mut stimuli = self.position_based_stimulus(ctx, frame, |_| zero_intensity_for_one_second())?;
        self.apply_intensity_filters_and_white_noise(ctx, frame, &mut stimuli, 0.0)?;
        Ok(stimuli)
    }

    fn arena(&self, width: usize, height: usize) -> Option<Result<Array2<f64>>> {
        Some(self.intensity_function.arena(width, height))
    }
}

/// [`DefinedEnvironment`] with orientation logic always enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinedEnvironmentBasedUponOrientation(DefinedEnvironment);

impl DefinedEnvironmentBasedUponOrientation {
    pub fn new(mut environment: DefinedEnvironment) -> Self {
        environment.enable_orientation_logic = true;
        Self(environment)
    }

    pub fn environment(&self) -> &DefinedEnvironment {
        &self.0
    }

    pub fn environment_mut(&mut self) -> &mut DefinedEnvironment {
        &mut self.0
    }
}

impl Default for DefinedEnvironmentBasedUponOrientation {
    fn default() -> Self {
        Self::new(DefinedEnvironment::default())
    }
}

impl StimulusRule for DefinedEnvironmentBasedUponOrientation {
    fn code(&self) -> &'static str {
        "1.6"
    }

    fn description(&self) -> &'static str {
        "Position landscape according to initial larval orientation."
    }

    fn init(&mut self) {
        self.0.enable_orientation_logic = true;
        self.0.init();
    }

    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        self.0.determine_stimulus(ctx, history, params)
    }

    fn arena(&self, width: usize, height: usize) -> Option<Result<Array2<f64>>> {
        self.0.arena(width, height)
    }
}
