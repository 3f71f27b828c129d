//! Per-frame derived kinematics.

use serde::{Deserialize, Serialize};
use tracing::warn;
use venkman_core::{
    dot_product, is_coordinate_left_of_vector, unit_vector_for_tracker_angle, LarvaBehaviorMode,
    LarvaSkeleton, LedStimulus, TrackerPoint,
};

use crate::classifier::{self, ClassifierInputs, ModeState};
use crate::history::FrameHistory;
use crate::parameters::LarvaBehaviorParameters;
use crate::smoothing;

/// Largest body angle change accepted before assuming the bearing crossed the ±180° branch cut
const BRANCH_CUT_DELTA: f64 = 179.999999;

/// Derived data for one tracker frame.
///
/// Everything except the stimulus list is computed once by
/// [`LarvaFrameData::derive`] and never changes afterwards. Speeds are per
/// second; angle speeds are in degrees per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LarvaFrameData {
    skeleton: LarvaSkeleton,
    behavior_mode: LarvaBehaviorMode,
    body_angle_speed: f64,
    smoothed_body_angle_speed: f64,
    head_angle_speed: f64,
    smoothed_head_angle_speed: f64,
    tail_speed: f64,
    midpoint_speed: f64,
    head_speed: f64,
    centroid_speed: f64,
    tail_speed_dot_body_angle: f64,
    smoothed_tail_speed_dot_body_angle: f64,
    time_since_last_behavior_mode_change: i64,
    time_stopped: Option<i64>,
    time_backing_up: Option<i64>,
    /// Original reading when a jump was filtered out
    skipped_skeleton: Option<LarvaSkeleton>,
    jump_frames_skipped: Option<u32>,
    derived_max_length: f64,
    percentage_of_max_length: Option<f64>,
    stimulus_list: Vec<LedStimulus>,
}

impl LarvaFrameData {
    /// Frame with no derived data and an explicitly assigned mode.
    pub fn with_mode(skeleton: LarvaSkeleton, behavior_mode: LarvaBehaviorMode) -> Self {
        Self {
            skeleton,
            behavior_mode,
            body_angle_speed: 0.0,
            smoothed_body_angle_speed: 0.0,
            head_angle_speed: 0.0,
            smoothed_head_angle_speed: 0.0,
            tail_speed: 0.0,
            midpoint_speed: 0.0,
            head_speed: 0.0,
            centroid_speed: 0.0,
            tail_speed_dot_body_angle: 0.0,
            smoothed_tail_speed_dot_body_angle: 0.0,
            time_since_last_behavior_mode_change: 0,
            time_stopped: None,
            time_backing_up: None,
            skipped_skeleton: None,
            jump_frames_skipped: None,
            derived_max_length: 0.0,
            percentage_of_max_length: None,
            stimulus_list: Vec::new(),
        }
    }

    /// Derive speeds, smoothed signals and the behavior mode for `skeleton`.
    ///
    /// `history` holds the frames received before this one, most recent
    /// first. Until the history spans the smoothing duration the frame
    /// keeps the default stop mode.
    pub fn derive(skeleton: LarvaSkeleton, history: &FrameHistory, params: &LarvaBehaviorParameters) -> Self {
        let mut frame = Self::with_mode(skeleton, LarvaBehaviorMode::Stop);

        let Some(previous) = history.most_recent() else {
            frame.derived_max_length = skeleton.length;
            return frame;
        };

        let elapsed_ms = skeleton.capture_time - previous.time();
        if elapsed_ms <= 0 {
            warn!(
                capture_time = skeleton.capture_time,
                previous_time = previous.time(),
                "Frame does not advance capture time"
            );
        }
        let elapsed_secs = elapsed_ms as f64 / 1000.0;
        let previous_skeleton = previous.skeleton;

        frame.centroid_speed = skeleton.centroid.distance_to(&previous_skeleton.centroid) / elapsed_secs;
        if frame.centroid_speed.abs() > params.min_centroid_speed_to_flag_jump {
            let previous_skipped = previous.jump_frames_skipped.unwrap_or(0);
            if previous_skipped < params.max_jump_frames_to_skip {
                warn!(
                    capture_time = skeleton.capture_time,
                    centroid_speed = frame.centroid_speed,
                    skipped = previous_skipped + 1,
                    "Skipping tracker jump"
                );
                frame.skipped_skeleton = Some(skeleton);
                frame.skeleton = skeleton.with_measurements_from(&previous_skeleton);
                frame.jump_frames_skipped = Some(previous_skipped + 1);
                frame.centroid_speed = 0.0;
            } else {
                warn!(
                    capture_time = skeleton.capture_time,
                    centroid_speed = frame.centroid_speed,
                    "Accepting jump after {} skipped frames",
                    previous_skipped
                );
            }
        }

        let current = frame.skeleton;

        // max length is derived from the session origin (time 0)
        if current.capture_time < params.max_length_derivation_duration {
            frame.derived_max_length = if current.length > previous.derived_max_length {
                current.length
            } else {
                previous.derived_max_length
            };
        } else {
            frame.derived_max_length = previous.derived_max_length;
            frame.percentage_of_max_length = Some(current.length * 100.0 / previous.derived_max_length);
        }

        frame.head_speed = current.head.distance_to(&previous_skeleton.head) / elapsed_secs;
        frame.midpoint_speed = current.midpoint.distance_to(&previous_skeleton.midpoint) / elapsed_secs;
        frame.tail_speed = current.tail.distance_to(&previous_skeleton.tail) / elapsed_secs;

        // head never bends back across the body within one frame, so no branch correction
        frame.head_angle_speed = (current.head_to_body_angle - previous_skeleton.head_to_body_angle) / elapsed_secs;
        frame.body_angle_speed = body_angle_delta(previous_skeleton.tail_bearing, current.tail_bearing) / elapsed_secs;

        let heading = unit_vector_for_tracker_angle(current.tail_bearing);
        frame.tail_speed_dot_body_angle =
            dot_product(&previous_skeleton.tail, &current.tail, &TrackerPoint::ORIGIN, &heading);

        let Some(window) =
            smoothing::window_frame_count(current.capture_time, history, params.min_body_angle_speed_duration)
        else {
            return frame;
        };

        frame.smoothed_body_angle_speed = smoothing::weighted_average(
            frame.body_angle_speed,
            history.iter().map(|f| f.body_angle_speed),
            window,
        );
        frame.smoothed_head_angle_speed = smoothing::weighted_average(
            frame.head_angle_speed,
            history.iter().map(|f| f.head_angle_speed),
            window,
        );
        frame.smoothed_tail_speed_dot_body_angle = smoothing::weighted_average(
            frame.tail_speed_dot_body_angle,
            history.iter().map(|f| f.tail_speed_dot_body_angle),
            window,
        );

        let inputs = ClassifierInputs {
            head_angle: current.head_to_body_angle,
            is_head_left_of_body: is_coordinate_left_of_vector(&current.head, &current.tail, &current.midpoint),
            smoothed_body_angle_speed: frame.smoothed_body_angle_speed,
            smoothed_head_angle_speed: frame.smoothed_head_angle_speed,
            smoothed_tail_speed_dot_body_angle: frame.smoothed_tail_speed_dot_body_angle,
            elapsed_ms,
        };
        let state = classifier::next_mode(params, &previous.mode_state(), previous.head_angle(), &inputs);

        frame.behavior_mode = state.mode;
        frame.time_since_last_behavior_mode_change = state.time_since_last_change;
        frame.time_stopped = state.time_stopped;
        frame.time_backing_up = state.time_backing_up;

        frame
    }

    pub fn mode_state(&self) -> ModeState {
        ModeState {
            mode: self.behavior_mode,
            time_since_last_change: self.time_since_last_behavior_mode_change,
            time_stopped: self.time_stopped,
            time_backing_up: self.time_backing_up,
        }
    }

    /// Capture time in milliseconds
    pub fn time(&self) -> i64 {
        self.skeleton.capture_time
    }

    pub fn skeleton(&self) -> &LarvaSkeleton {
        &self.skeleton
    }

    pub fn behavior_mode(&self) -> LarvaBehaviorMode {
        self.behavior_mode
    }

    pub fn head_angle(&self) -> f64 {
        self.skeleton.head_to_body_angle
    }

    pub fn body_angle(&self) -> f64 {
        self.skeleton.tail_bearing
    }

    pub fn length(&self) -> f64 {
        self.skeleton.length
    }

    pub fn body_angle_speed(&self) -> f64 {
        self.body_angle_speed
    }

    pub fn smoothed_body_angle_speed(&self) -> f64 {
        self.smoothed_body_angle_speed
    }

    pub fn head_angle_speed(&self) -> f64 {
        self.head_angle_speed
    }

    pub fn smoothed_head_angle_speed(&self) -> f64 {
        self.smoothed_head_angle_speed
    }

    pub fn tail_speed(&self) -> f64 {
        self.tail_speed
    }

    pub fn midpoint_speed(&self) -> f64 {
        self.midpoint_speed
    }

    pub fn head_speed(&self) -> f64 {
        self.head_speed
    }

    pub fn centroid_speed(&self) -> f64 {
        self.centroid_speed
    }

    pub fn tail_speed_dot_body_angle(&self) -> f64 {
        self.tail_speed_dot_body_angle
    }

    pub fn smoothed_tail_speed_dot_body_angle(&self) -> f64 {
        self.smoothed_tail_speed_dot_body_angle
    }

    pub fn time_since_last_behavior_mode_change(&self) -> i64 {
        self.time_since_last_behavior_mode_change
    }

    pub fn time_stopped(&self) -> Option<i64> {
        self.time_stopped
    }

    pub fn time_backing_up(&self) -> Option<i64> {
        self.time_backing_up
    }

    pub fn skipped_skeleton(&self) -> Option<&LarvaSkeleton> {
        self.skipped_skeleton.as_ref()
    }

    pub fn jump_frames_skipped(&self) -> Option<u32> {
        self.jump_frames_skipped
    }

    pub fn derived_max_length(&self) -> f64 {
        self.derived_max_length
    }

    pub fn percentage_of_max_length(&self) -> Option<f64> {
        self.percentage_of_max_length
    }

    pub fn is_max_length_derivation_complete(&self) -> bool {
        self.percentage_of_max_length.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.behavior_mode == LarvaBehaviorMode::Run
    }

    pub fn is_turning(&self) -> bool {
        self.behavior_mode.is_turning()
    }

    pub fn is_casting(&self) -> bool {
        self.behavior_mode.is_casting()
    }

    pub fn stimulus_list(&self) -> &[LedStimulus] {
        &self.stimulus_list
    }

    pub fn set_stimulus_list(&mut self, stimulus_list: Vec<LedStimulus>) {
        self.stimulus_list = stimulus_list;
    }
}

/// Change in tail bearing, taking the short way around the ±180° branch cut.
///
/// A bearing going from -170° to 170° changed by -20°, not 340°.
pub fn body_angle_delta(previous_bearing: f64, bearing: f64) -> f64 {
    let delta = bearing - previous_bearing;
    if delta > BRANCH_CUT_DELTA {
        (bearing - 360.0) - previous_bearing
    } else if delta < -BRANCH_CUT_DELTA {
        (bearing + 360.0) - previous_bearing
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LarvaBehaviorMode::*;

    fn params() -> LarvaBehaviorParameters {
        LarvaBehaviorParameters {
            min_body_angle_speed_for_turns: 1.0,
            min_body_angle_speed_duration: 970,
            min_head_angle_to_continue_turning: 0.25,
            min_head_angle_for_casting: 2.0,
            min_head_angle_to_continue_casting: 1.25,
            min_head_angle_speed_to_continue_casting: 1.25,
            dot_product_threshold_for_straight_modes: 3.0,
            min_behavior_mode_duration: 0,
            min_stop_or_back_up_duration: 0,
            ..Default::default()
        }
    }

    fn skeleton(time: i64, x: f64, length: f64, tail_bearing: f64) -> LarvaSkeleton {
        LarvaSkeleton::new(
            time,
            TrackerPoint::new(x, 2.0),
            TrackerPoint::new(x, 1.0),
            TrackerPoint::new(x, 0.0),
            length,
            TrackerPoint::new(x, 1.0),
            0.0,
            tail_bearing,
        )
    }

    fn diagonal(time: i64, i: f64) -> LarvaSkeleton {
        LarvaSkeleton::new(
            time,
            TrackerPoint::new(i + 2.0, i + 2.0),
            TrackerPoint::new(i + 1.0, i + 1.0),
            TrackerPoint::new(i, i),
            2.0,
            TrackerPoint::new(i + 1.0, i + 1.0),
            0.0,
            -135.0,
        )
    }

    /// Derives frames in order and records them in the history
    struct Tracker {
        params: LarvaBehaviorParameters,
        history: FrameHistory,
    }

    impl Tracker {
        fn new(params: LarvaBehaviorParameters) -> Self {
            Self {
                params,
                history: FrameHistory::new(),
            }
        }

        fn add(&mut self, skeleton: LarvaSkeleton) -> LarvaFrameData {
            let frame = LarvaFrameData::derive(skeleton, &self.history, &self.params);
            self.history.push_front(frame.clone());
            frame
        }
    }

    #[test]
    fn test_no_history_keeps_default_stop() {
        let frame = LarvaFrameData::derive(skeleton(1030, 0.0, 2.0, 90.0), &FrameHistory::new(), &params());
        assert_eq!(frame.tail_speed(), 0.0);
        assert_eq!(frame.behavior_mode(), Stop);
        assert_eq!(frame.derived_max_length(), 2.0);
        assert_eq!(frame.percentage_of_max_length(), None);
    }

    #[test]
    fn test_velocities_use_most_recent_frame_only() {
        let mut history = FrameHistory::new();
        let p = TrackerPoint::ORIGIN;
        history.push_front(LarvaFrameData::with_mode(LarvaSkeleton::new(0, p, p, p, 0.0, p, 0.0, 0.0), Stop));
        history.push_front(LarvaFrameData::with_mode(skeleton(1000, 1.0, 2.0, 90.0), Stop));

        let frame = LarvaFrameData::derive(skeleton(1030, 0.0, 2.0, 90.0), &history, &params());
        for speed in [frame.tail_speed(), frame.midpoint_speed(), frame.head_speed(), frame.centroid_speed()] {
            assert!((speed - 33.333).abs() < 0.01, "speed was {speed}");
        }
    }

    #[test]
    fn test_body_angle_branch_correction() {
        assert!((body_angle_delta(-170.0, 170.0) - -20.0).abs() < 1e-9);
        assert!((body_angle_delta(170.0, -170.0) - 20.0).abs() < 1e-9);
        assert_eq!(body_angle_delta(10.0, 30.0), 20.0);

        let mut history = FrameHistory::new();
        history.push_front(LarvaFrameData::with_mode(skeleton(0, 0.0, 2.0, -170.0), Stop));
        let frame = LarvaFrameData::derive(skeleton(1000, 0.0, 2.0, 170.0), &history, &params());
        assert!((frame.body_angle_speed().abs() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_backwards_motion() {
        let mut tracker = Tracker::new(LarvaBehaviorParameters {
            min_body_angle_speed_duration: 10,
            dot_product_threshold_for_straight_modes: 0.1,
            ..params()
        });
        let mut time = 0;

        for i in 0..5 {
            let expected = if i == 0 { Stop } else { Run };
            assert_eq!(tracker.add(diagonal(time, i as f64)).behavior_mode(), expected, "run frame {i}");
            time += 33;
        }

        // stationary
        assert_eq!(tracker.add(diagonal(time, 4.0)).behavior_mode(), Stop);
        time += 33;

        for i in 0..4 {
            let frame = tracker.add(diagonal(time, 3.0 - i as f64));
            assert_eq!(frame.behavior_mode(), BackUp, "reverse frame {i}");
            assert!(frame.tail_speed_dot_body_angle() < 0.0);
            time += 33;
        }
    }

    #[test]
    fn test_min_stop_or_back_up_duration() {
        let mut tracker = Tracker::new(LarvaBehaviorParameters {
            min_body_angle_speed_duration: 10,
            dot_product_threshold_for_straight_modes: 0.1,
            min_stop_or_back_up_duration: 10,
            ..params()
        });
        let mut time = 0;

        for i in 0..5 {
            tracker.add(diagonal(time, i as f64));
            time += 33;
        }

        // first stationary frame starts the stop streak but still reports the run
        let frame = tracker.add(diagonal(time, 4.0));
        assert_eq!(frame.behavior_mode(), Run);
        assert_eq!(frame.time_stopped(), Some(0));
        time += 33;

        let frame = tracker.add(diagonal(time, 4.0));
        assert_eq!(frame.behavior_mode(), Stop);
        assert_eq!(frame.time_since_last_behavior_mode_change(), 23);
        time += 33;

        // first reverse frame has not backed up long enough
        assert_eq!(tracker.add(diagonal(time, 3.0)).behavior_mode(), Stop);
        time += 33;
        for i in 1..4 {
            assert_eq!(tracker.add(diagonal(time, 3.0 - i as f64)).behavior_mode(), BackUp);
            time += 33;
        }
    }

    #[test]
    fn test_skip_jump_frames() {
        let params = params();
        let max_skips = params.max_jump_frames_to_skip;
        let mut tracker = Tracker::new(params);

        let first = skeleton(0, 0.0, 2.0, 90.0);
        assert_eq!(tracker.add(first).behavior_mode(), Stop);

        let mut time = 33;
        for expected_skips in 1..=max_skips {
            let frame = tracker.add(skeleton(time, 999.0, 2.0, 90.0));
            assert_eq!(frame.jump_frames_skipped(), Some(expected_skips));
            assert_eq!(frame.skipped_skeleton().map(|s| s.head.x), Some(999.0));
            assert_eq!(frame.skeleton().head, first.head);
            assert_eq!(frame.time(), time);
            assert_eq!(frame.head_speed(), 0.0);
            assert_eq!(frame.midpoint_speed(), 0.0);
            assert_eq!(frame.tail_speed(), 0.0);
            assert_eq!(frame.centroid_speed(), 0.0);
            assert_eq!(frame.behavior_mode(), Stop);
            time += 33;
        }

        // too many consecutive jumps: accept the new position
        let frame = tracker.add(skeleton(time, 999.0, 2.0, 90.0));
        assert_eq!(frame.jump_frames_skipped(), None);
        assert!(frame.skipped_skeleton().is_none());
        assert_eq!(frame.skeleton().head.x, 999.0);
        assert!(frame.centroid_speed() > 100.0);
    }

    #[test]
    fn test_max_length_derivation() {
        let mut tracker = Tracker::new(LarvaBehaviorParameters {
            max_length_derivation_duration: 70,
            ..params()
        });

        let expectations = [
            (0, 2.0, 2.0, None),
            (33, 4.0, 4.0, None),
            (66, 3.0, 4.0, None),
            (99, 2.0, 4.0, Some(50.0)),
            (132, 6.0, 4.0, Some(150.0)),
        ];

        for (time, length, expected_max, expected_percentage) in expectations {
            let frame = tracker.add(skeleton(time, 0.0, length, 90.0));
            assert_eq!(frame.derived_max_length(), expected_max, "max length at {time} ms");
            assert_eq!(frame.percentage_of_max_length(), expected_percentage, "percentage at {time} ms");
            assert_eq!(frame.is_max_length_derivation_complete(), expected_percentage.is_some());
        }
    }

    #[test]
    fn test_smoothing_needs_enough_history() {
        let mut tracker = Tracker::new(params());
        tracker.add(skeleton(1000, 1.0, 2.0, 90.0));
        let frame = tracker.add(skeleton(1030, 0.0, 2.0, 90.0));

        // 30 ms of history does not span the 970 ms smoothing duration
        assert_eq!(frame.smoothed_tail_speed_dot_body_angle(), 0.0);
        assert_eq!(frame.behavior_mode(), Stop);
        assert_eq!(frame.time_since_last_behavior_mode_change(), 0);
    }

    #[test]
    fn test_smoothed_signal_averages_window() {
        let mut tracker = Tracker::new(LarvaBehaviorParameters {
            min_body_angle_speed_duration: 50,
            ..params()
        });

        // bearing turns by 1 degree per 33 ms frame
        for i in 0..6 {
            tracker.add(skeleton(33 * i, 0.0, 2.0, i as f64));
        }
        let frame = tracker.history.most_recent().cloned().unwrap();

        let per_second = 1.0 / 0.033;
        assert!((frame.body_angle_speed() - per_second).abs() < 1e-9);
        assert!((frame.smoothed_body_angle_speed() - per_second).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_for_logging() {
        let frame = LarvaFrameData::derive(skeleton(0, 0.0, 2.0, 90.0), &FrameHistory::new(), &params());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"behavior_mode\":\"stop\""));

        let restored: LarvaFrameData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.time(), 0);
    }
}
