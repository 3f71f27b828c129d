//! Fundamental types for the Venkman stimulus engine.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Session identifier for one tracked larva
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 2D position in tracker arena coordinates (millimeters, y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerPoint {
    pub x: f64,
    pub y: f64,
}

impl TrackerPoint {
    pub const ORIGIN: TrackerPoint = TrackerPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self::new(v.x, v.y)
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point at fraction `t` of the way from `self` to `other`
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for TrackerPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

impl FromStr for TrackerPoint {
    type Err = Error;

    /// Parses the `[x,y]` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("'{s}' is not a point of the form [x,y]"));

        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(invalid)?;
        let (x, y) = inner.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
        let y = y.trim().parse::<f64>().map_err(|_| invalid())?;

        Ok(Self::new(x, y))
    }
}

/// Skeleton measurements reported by the tracker for a single frame.
///
/// Angles are in degrees. The head-to-body angle is roughly within
/// [-180, 180] and the tail bearing within [-180, 180]; neither is
/// continuous across the ±180 branch cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LarvaSkeleton {
    /// Milliseconds since the start of the session
    pub capture_time: i64,
    pub head: TrackerPoint,
    pub midpoint: TrackerPoint,
    pub tail: TrackerPoint,
    pub centroid: TrackerPoint,
    pub length: f64,
    pub head_to_body_angle: f64,
    pub tail_bearing: f64,
}

impl LarvaSkeleton {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capture_time: i64,
        head: TrackerPoint,
        midpoint: TrackerPoint,
        tail: TrackerPoint,
        length: f64,
        centroid: TrackerPoint,
        head_to_body_angle: f64,
        tail_bearing: f64,
    ) -> Self {
        Self {
            capture_time,
            head,
            midpoint,
            tail,
            centroid,
            length,
            head_to_body_angle,
            tail_bearing,
        }
    }

    /// A skeleton with this capture time and every other measurement taken from `previous`.
    pub fn with_measurements_from(&self, previous: &LarvaSkeleton) -> Self {
        Self {
            capture_time: self.capture_time,
            ..*previous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_point_display_round_trip() {
        let point = TrackerPoint::new(4.5, -2.25);
        assert_eq!(point.to_string(), "[4.5,-2.25]");
        assert_eq!("[4.5,-2.25]".parse::<TrackerPoint>().unwrap(), point);
        assert_eq!(" [ 3 , 2 ] ".parse::<TrackerPoint>().unwrap(), TrackerPoint::new(3.0, 2.0));
    }

    #[test]
    fn test_tracker_point_rejects_malformed_text() {
        assert!("4.5,-2.25".parse::<TrackerPoint>().is_err());
        assert!("[4.5]".parse::<TrackerPoint>().is_err());
        assert!("[a,b]".parse::<TrackerPoint>().is_err());
    }

    #[test]
    fn test_tracker_point_distance_and_lerp() {
        let a = TrackerPoint::new(0.0, 0.0);
        let b = TrackerPoint::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), TrackerPoint::new(1.5, 2.0));
    }

    #[test]
    fn test_skeleton_measurement_substitution() {
        let previous = LarvaSkeleton::new(
            30,
            TrackerPoint::new(5.0, 0.0),
            TrackerPoint::new(4.0, 0.0),
            TrackerPoint::new(3.0, 0.0),
            2.0,
            TrackerPoint::new(4.0, 0.0),
            10.0,
            -45.0,
        );
        let jumped = LarvaSkeleton::new(
            60,
            TrackerPoint::new(95.0, 90.0),
            TrackerPoint::new(94.0, 90.0),
            TrackerPoint::new(93.0, 90.0),
            7.0,
            TrackerPoint::new(94.0, 90.0),
            80.0,
            100.0,
        );

        let substituted = jumped.with_measurements_from(&previous);
        assert_eq!(substituted.capture_time, 60);
        assert_eq!(substituted.head, previous.head);
        assert_eq!(substituted.centroid, previous.centroid);
        assert_eq!(substituted.length, previous.length);
        assert_eq!(substituted.tail_bearing, previous.tail_bearing);
    }
}
