//! Planar geometry for tracker-space computations.
//!
//! Tracker space has its origin at the top left corner of the arena with
//! y increasing downwards. Bearings reported by the tracker are measured
//! from the negative x axis: 0° points along -x, 90° along -y, ±180° along
//! +x and -90° along +y.

use nalgebra::{Rotation2, Vector2};

use crate::types::TrackerPoint;

/// Convert a tracker bearing (degrees) into a unit vector terminal point.
pub fn unit_vector_for_tracker_angle(angle_degrees: f64) -> TrackerPoint {
    let standard = if angle_degrees < 0.0 {
        180.0 + angle_degrees
    } else {
        angle_degrees - 180.0
    };
    let radians = standard.to_radians();
    TrackerPoint::new(radians.cos(), radians.sin())
}

/// Dot product of the displacement vectors a_start→a_stop and b_start→b_stop
pub fn dot_product(
    a_start: &TrackerPoint,
    a_stop: &TrackerPoint,
    b_start: &TrackerPoint,
    b_stop: &TrackerPoint,
) -> f64 {
    displacement(a_start, a_stop).dot(&displacement(b_start, b_stop))
}

/// Unsigned angle (radians) between the displacement vectors a_start→a_stop and b_start→b_stop.
pub fn angle_between_vectors(
    a_start: &TrackerPoint,
    a_stop: &TrackerPoint,
    b_start: &TrackerPoint,
    b_stop: &TrackerPoint,
) -> f64 {
    angle_between(&displacement(a_start, a_stop), &displacement(b_start, b_stop))
}

/// Calculate angle between two vectors
pub fn angle_between(v1: &Vector2<f64>, v2: &Vector2<f64>) -> f64 {
    let dot = v1.dot(v2);
    let norms = v1.norm() * v2.norm();
    if norms < 1e-10 {
        0.0
    } else {
        (dot / norms).clamp(-1.0, 1.0).acos()
    }
}

/// Cross product sign test for a coordinate against the vector start→stop.
///
/// With y pointing down, a negative cross product places the coordinate on
/// the left hand side when looking from `start` towards `stop`.
pub fn is_coordinate_left_of_vector(
    coordinate: &TrackerPoint,
    start: &TrackerPoint,
    stop: &TrackerPoint,
) -> bool {
    let product = (stop.x - start.x) * (coordinate.y - start.y)
        - (stop.y - start.y) * (coordinate.x - start.x);
    product < 0.0
}

/// Linear interpolation between (previous_input, previous_output) and
/// (next_input, next_output).
///
/// Returns `previous_output` when both inputs coincide.
pub fn linear_interpolation(
    actual_input: f64,
    previous_input: f64,
    previous_output: f64,
    next_input: f64,
    next_output: f64,
) -> f64 {
    if previous_input == next_input {
        return previous_output;
    }
    let weight = (actual_input - previous_input) / (next_input - previous_input);
    previous_output + weight * (next_output - previous_output)
}

/// Rotate `point` about `center` by `angle_radians`.
pub fn rotated_point(point: &TrackerPoint, angle_radians: f64, center: &TrackerPoint) -> TrackerPoint {
    let rotation = Rotation2::new(angle_radians);
    let rotated = rotation * displacement(center, point);
    TrackerPoint::from_vector(center.to_vector() + rotated)
}

/// Point `distance_from_start` along start→stop, extrapolating past `stop` when needed.
pub fn point_on_vector(start: &TrackerPoint, stop: &TrackerPoint, distance_from_start: f64) -> TrackerPoint {
    let length = start.distance_to(stop);
    if length < 1e-10 {
        return *start;
    }
    let ratio = distance_from_start / length;
    TrackerPoint::from_vector(stop.to_vector() * ratio + start.to_vector() * (1.0 - ratio))
}

fn displacement(start: &TrackerPoint, stop: &TrackerPoint) -> Vector2<f64> {
    stop.to_vector() - start.to_vector()
}
