//! Behavior-mode state machine.
//!
//! Each step takes the previous frame's [`ModeState`] plus the current
//! frame's smoothed signals and resolves the next state. Rules are applied
//! in priority order:
//!
//! 1. hysteresis hold while the current mode is younger than
//!    `min_behavior_mode_duration`
//! 2. continue a turn while the head stays bent past the turning threshold
//! 3. promote a cast to a turn, or keep casting
//! 4. start a cast when the head angle is large enough
//! 5. straight fallback on the smoothed tail-speed/body-angle dot product
//!
//! Stop and back-up streaks shorter than `min_stop_or_back_up_duration`
//! report the previous mode, and once confirmed they are backdated so the
//! mode starts when it was confirmed rather than when first detected.

use serde::{Deserialize, Serialize};
use venkman_core::LarvaBehaviorMode;

use crate::parameters::LarvaBehaviorParameters;

/// Mode plus the counters carried from frame to frame (all in milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeState {
    pub mode: LarvaBehaviorMode,
    pub time_since_last_change: i64,
    pub time_stopped: Option<i64>,
    pub time_backing_up: Option<i64>,
}

impl ModeState {
    pub fn new(mode: LarvaBehaviorMode) -> Self {
        Self {
            mode,
            time_since_last_change: 0,
            time_stopped: None,
            time_backing_up: None,
        }
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(LarvaBehaviorMode::Stop)
    }
}

/// Per-frame signals consumed by the state machine
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierInputs {
    pub head_angle: f64,
    /// Whether the head lies left of the tail→midpoint vector
    pub is_head_left_of_body: bool,
    pub smoothed_body_angle_speed: f64,
    pub smoothed_head_angle_speed: f64,
    pub smoothed_tail_speed_dot_body_angle: f64,
    pub elapsed_ms: i64,
}

/// Resolve the mode for the current frame.
///
/// `previous_head_angle` is the previous frame's head-to-body angle; it
/// decides which side a turn must stay on.
pub fn next_mode(
    params: &LarvaBehaviorParameters,
    previous: &ModeState,
    previous_head_angle: f64,
    inputs: &ClassifierInputs,
) -> ModeState {
    let previous_mode = previous.mode;
    let mut time_since_last_change = previous.time_since_last_change + inputs.elapsed_ms;
    let mut time_stopped = None;
    let mut time_backing_up = None;

    let resolved = if time_since_last_change < params.min_behavior_mode_duration {
        Some(previous_mode)
    } else if previous_mode.is_turning() {
        continue_turn(params, previous_mode, previous_head_angle, inputs)
    } else if previous_mode.is_casting() {
        continue_cast(params, previous_mode, inputs)
    } else if inputs.head_angle.abs() > params.min_head_angle_for_casting {
        Some(cast_direction(inputs))
    } else {
        None
    };

    let mut mode = match resolved {
        Some(mode) => mode,
        None => {
            let threshold = params.dot_product_threshold_for_straight_modes;
            let dot = inputs.smoothed_tail_speed_dot_body_angle;
            if dot > threshold {
                LarvaBehaviorMode::Run
            } else if dot < -threshold {
                time_backing_up = Some(extend_streak(previous.time_backing_up, inputs.elapsed_ms));
                LarvaBehaviorMode::BackUp
            } else {
                time_stopped = Some(extend_streak(previous.time_stopped, inputs.elapsed_ms));
                LarvaBehaviorMode::Stop
            }
        }
    };

    if let Some(streak) = time_backing_up.or(time_stopped) {
        let minimum = params.min_stop_or_back_up_duration;
        if streak < minimum {
            mode = previous_mode;
        } else {
            time_since_last_change = streak - minimum;
        }
    } else if mode != previous_mode {
        time_since_last_change = 0;
    }

    ModeState {
        mode,
        time_since_last_change,
        time_stopped,
        time_backing_up,
    }
}

/// A turn continues while the head stays bent past the threshold on the
/// side the previous head angle was on.
fn continue_turn(
    params: &LarvaBehaviorParameters,
    previous_mode: LarvaBehaviorMode,
    previous_head_angle: f64,
    inputs: &ClassifierInputs,
) -> Option<LarvaBehaviorMode> {
    let threshold = params.min_head_angle_to_continue_turning;
    let still_bent = if previous_head_angle < 0.0 {
        -inputs.head_angle > threshold
    } else {
        inputs.head_angle > threshold
    };
    still_bent.then_some(previous_mode)
}

fn continue_cast(
    params: &LarvaBehaviorParameters,
    previous_mode: LarvaBehaviorMode,
    inputs: &ClassifierInputs,
) -> Option<LarvaBehaviorMode> {
    let head_speed = inputs.smoothed_head_angle_speed.abs();

    if inputs.smoothed_body_angle_speed.abs() > params.min_body_angle_speed_for_turns
        && head_speed < params.min_head_angle_speed_to_continue_casting
    {
        return Some(if previous_mode == LarvaBehaviorMode::CastLeft {
            LarvaBehaviorMode::TurnLeft
        } else {
            LarvaBehaviorMode::TurnRight
        });
    }

    if inputs.head_angle.abs() > params.min_head_angle_to_continue_casting
        || head_speed > params.min_head_angle_speed_to_continue_casting
    {
        return Some(cast_direction(inputs));
    }

    None
}

fn cast_direction(inputs: &ClassifierInputs) -> LarvaBehaviorMode {
    if inputs.is_head_left_of_body {
        LarvaBehaviorMode::CastLeft
    } else {
        LarvaBehaviorMode::CastRight
    }
}

fn extend_streak(previous: Option<i64>, elapsed_ms: i64) -> i64 {
    previous.map_or(0, |streak| streak + elapsed_ms)
}
