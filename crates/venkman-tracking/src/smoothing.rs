//! Triangular weighted moving average over recent frames.
//!
//! A window of N frames weights the frame k steps back (k = 0 is the current
//! frame) by (N - k) / (N (N + 1) / 2), so the current frame counts most
//! and the weights always sum to one.

use crate::history::FrameHistory;

/// Number of frames (current frame included) that fit inside `duration_ms`.
///
/// Returns `None` until the accumulated gaps between the current frame and
/// the history exceed `duration_ms`.
pub fn window_frame_count(current_time: i64, history: &FrameHistory, duration_ms: i64) -> Option<usize> {
    let mut frame_count = 1;
    let mut total_elapsed = 0;
    let mut later_time = current_time;

    for frame in history {
        total_elapsed += later_time - frame.time();
        later_time = frame.time();
        if total_elapsed > duration_ms {
            return Some(frame_count);
        }
        frame_count += 1;
    }

    None
}

/// Weight of the frame `steps_back` frames before the current one in a window of `window` frames.
pub fn triangular_weight(window: usize, steps_back: usize) -> f64 {
    if steps_back >= window {
        return 0.0;
    }
    let series = (window * (window + 1) / 2) as f64;
    (window - steps_back) as f64 / series
}

/// Weighted average of `current` followed by `past` values (most recent first).
pub fn weighted_average<I>(current: f64, past: I, window: usize) -> f64
where
    I: IntoIterator<Item = f64>,
{
    std::iter::once(current)
        .chain(past)
        .take(window)
        .enumerate()
        .map(|(steps_back, value)| value * triangular_weight(window, steps_back))
        .sum()
}
