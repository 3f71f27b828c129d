//! Behavior classification thresholds.

use serde::{Deserialize, Serialize};
use venkman_core::{Error, Result};

/// Thresholds driving jump filtering, max length derivation and the
/// behavior-mode state machine.
///
/// Angles are in degrees, angle speeds in degrees per second and all
/// durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LarvaBehaviorParameters {
    /// Head angle magnitude that starts a cast
    pub min_head_angle_for_casting: f64,
    /// Head angle magnitude that keeps a cast going
    pub min_head_angle_to_continue_casting: f64,
    /// Smoothed head angle speed magnitude that keeps a cast going
    pub min_head_angle_speed_to_continue_casting: f64,
    /// Smoothed body angle speed magnitude that promotes a cast to a turn
    pub min_body_angle_speed_for_turns: f64,
    /// Smoothing window
    pub min_body_angle_speed_duration: i64,
    pub min_head_angle_to_continue_turning: f64,
    pub dot_product_threshold_for_straight_modes: f64,
    /// Hysteresis hold for any mode change
    pub min_behavior_mode_duration: i64,
    pub min_stop_or_back_up_duration: i64,
    /// Centroid speed (mm/s) above which a frame is treated as a tracker glitch
    pub min_centroid_speed_to_flag_jump: f64,
    pub max_jump_frames_to_skip: u32,
    /// Capture time before which the maximum body length is still being derived
    pub max_length_derivation_duration: i64,
}

impl Default for LarvaBehaviorParameters {
    fn default() -> Self {
        Self {
            min_head_angle_for_casting: 0.0,
            min_head_angle_to_continue_casting: 0.0,
            min_head_angle_speed_to_continue_casting: 0.0,
            min_body_angle_speed_for_turns: 0.0,
            min_body_angle_speed_duration: 0,
            min_head_angle_to_continue_turning: 0.0,
            dot_product_threshold_for_straight_modes: 0.0,
            min_behavior_mode_duration: 0,
            min_stop_or_back_up_duration: 0,
            min_centroid_speed_to_flag_jump: 100.0,
            max_jump_frames_to_skip: 5,
            max_length_derivation_duration: 1000,
        }
    }
}

impl LarvaBehaviorParameters {
    /// Check every threshold against its configurable range.
    pub fn validate(&self) -> Result<()> {
        check("min_head_angle_for_casting", self.min_head_angle_for_casting, 0.0, 360.0)?;
        check(
            "min_head_angle_to_continue_casting",
            self.min_head_angle_to_continue_casting,
            0.0,
            360.0,
        )?;
        check(
            "min_head_angle_speed_to_continue_casting",
            self.min_head_angle_speed_to_continue_casting,
            0.0,
            360.0,
        )?;
        check("min_body_angle_speed_for_turns", self.min_body_angle_speed_for_turns, 0.0, 360.0)?;
        check(
            "min_body_angle_speed_duration",
            self.min_body_angle_speed_duration as f64,
            0.0,
            5000.0,
        )?;
        check(
            "min_head_angle_to_continue_turning",
            self.min_head_angle_to_continue_turning,
            0.0,
            360.0,
        )?;
        check(
            "dot_product_threshold_for_straight_modes",
            self.dot_product_threshold_for_straight_modes,
            0.0,
            10.0,
        )?;
        check("min_behavior_mode_duration", self.min_behavior_mode_duration as f64, 0.0, 5000.0)?;
        check(
            "min_stop_or_back_up_duration",
            self.min_stop_or_back_up_duration as f64,
            0.0,
            1000.0,
        )?;
        check(
            "min_centroid_speed_to_flag_jump",
            self.min_centroid_speed_to_flag_jump,
            0.0,
            1000.0,
        )?;
        check("max_jump_frames_to_skip", self.max_jump_frames_to_skip as f64, 0.0, 300.0)?;
        check(
            "max_length_derivation_duration",
            self.max_length_derivation_duration as f64,
            0.0,
            10000.0,
        )?;
        Ok(())
    }
}

fn check(name: &'static str, value: f64, minimum: f64, maximum: f64) -> Result<()> {
    if (minimum..=maximum).contains(&value) {
        Ok(())
    } else {
        Err(Error::BehaviorParameter {
            name,
            value,
            minimum,
            maximum,
        })
    }
}
