//! Frame measurements that functions can be evaluated against.

use std::fmt;

use serde::{Deserialize, Serialize};
use venkman_core::{LarvaSkeleton, TrackerPoint};
use venkman_tracking::LarvaFrameData;

/// Extractor and plausible input range for a kinematic variable.
#[derive(Clone, Copy)]
pub struct KinematicDescriptor {
    pub extract: fn(&LarvaFrameData) -> f64,
    pub minimum: f64,
    pub maximum: f64,
    pub units: &'static str,
}

const DEGREES: &str = "degrees";
const DEGREES_PER_SECOND: &str = "degrees/s";
const MM_PER_SECOND: &str = "mm/s";

/// Scalar measurement taken from a derived frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KinematicVariable {
    HeadAngle,
    BodyAngle,
    HeadAngleSpeed,
    SmoothedHeadAngleSpeed,
    BodyAngleSpeed,
    SmoothedBodyAngleSpeed,
    HeadSpeed,
    MidpointSpeed,
    TailSpeed,
    CentroidSpeed,
    Length,
    PercentageOfMaxLength,
}

impl KinematicVariable {
    pub const ALL: [KinematicVariable; 12] = [
        KinematicVariable::HeadAngle,
        KinematicVariable::BodyAngle,
        KinematicVariable::HeadAngleSpeed,
        KinematicVariable::SmoothedHeadAngleSpeed,
        KinematicVariable::BodyAngleSpeed,
        KinematicVariable::SmoothedBodyAngleSpeed,
        KinematicVariable::HeadSpeed,
        KinematicVariable::MidpointSpeed,
        KinematicVariable::TailSpeed,
        KinematicVariable::CentroidSpeed,
        KinematicVariable::Length,
        KinematicVariable::PercentageOfMaxLength,
    ];

    pub fn descriptor(&self) -> KinematicDescriptor {
        let (extract, minimum, maximum, units): (fn(&LarvaFrameData) -> f64, f64, f64, &'static str) = match self {
            KinematicVariable::HeadAngle => (LarvaFrameData::head_angle, -180.0, 180.0, DEGREES),
            KinematicVariable::BodyAngle => (LarvaFrameData::body_angle, -180.0, 180.0, DEGREES),
            KinematicVariable::HeadAngleSpeed => {
                (LarvaFrameData::head_angle_speed, -6000.0, 6000.0, DEGREES_PER_SECOND)
            }
            KinematicVariable::SmoothedHeadAngleSpeed => {
                (LarvaFrameData::smoothed_head_angle_speed, -6000.0, 6000.0, DEGREES_PER_SECOND)
            }
            KinematicVariable::BodyAngleSpeed => {
                (LarvaFrameData::body_angle_speed, -6000.0, 6000.0, DEGREES_PER_SECOND)
            }
            KinematicVariable::SmoothedBodyAngleSpeed => {
                (LarvaFrameData::smoothed_body_angle_speed, -6000.0, 6000.0, DEGREES_PER_SECOND)
            }
            KinematicVariable::HeadSpeed => (LarvaFrameData::head_speed, 0.0, 20.0, MM_PER_SECOND),
            KinematicVariable::MidpointSpeed => (LarvaFrameData::midpoint_speed, 0.0, 20.0, MM_PER_SECOND),
            KinematicVariable::TailSpeed => (LarvaFrameData::tail_speed, 0.0, 20.0, MM_PER_SECOND),
            KinematicVariable::CentroidSpeed => (LarvaFrameData::centroid_speed, 0.0, 20.0, MM_PER_SECOND),
            KinematicVariable::Length => (LarvaFrameData::length, 0.0, 10.0, "mm"),
            KinematicVariable::PercentageOfMaxLength => (percentage_of_max_length, 0.0, 100.0, "%"),
        };
        KinematicDescriptor {
            extract,
            minimum,
            maximum,
            units,
        }
    }

    /// Measurement of this variable in `frame`.
    pub fn value(&self, frame: &LarvaFrameData) -> f64 {
        (self.descriptor().extract)(frame)
    }

    pub fn name(&self) -> &'static str {
        match self {
            KinematicVariable::HeadAngle => "head angle",
            KinematicVariable::BodyAngle => "body angle",
            KinematicVariable::HeadAngleSpeed => "head angle speed",
            KinematicVariable::SmoothedHeadAngleSpeed => "smoothed head angle speed",
            KinematicVariable::BodyAngleSpeed => "body angle speed",
            KinematicVariable::SmoothedBodyAngleSpeed => "smoothed body angle speed",
            KinematicVariable::HeadSpeed => "head speed",
            KinematicVariable::MidpointSpeed => "midpoint speed",
            KinematicVariable::TailSpeed => "tail speed",
            KinematicVariable::CentroidSpeed => "centroid speed",
            KinematicVariable::Length => "length",
            KinematicVariable::PercentageOfMaxLength => "percentage of max length",
        }
    }
}

impl fmt::Display for KinematicVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.descriptor().units)
    }
}

fn percentage_of_max_length(frame: &LarvaFrameData) -> f64 {
    frame.percentage_of_max_length().unwrap_or(0.0)
}

/// Skeleton point used to look up positional functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionalVariable {
    Head,
    Midpoint,
    Tail,
    Centroid,
}

impl PositionalVariable {
    pub const ALL: [PositionalVariable; 4] = [
        PositionalVariable::Head,
        PositionalVariable::Midpoint,
        PositionalVariable::Tail,
        PositionalVariable::Centroid,
    ];

    pub fn point(&self, skeleton: &LarvaSkeleton) -> TrackerPoint {
        match self {
            PositionalVariable::Head => skeleton.head,
            PositionalVariable::Midpoint => skeleton.midpoint,
            PositionalVariable::Tail => skeleton.tail,
            PositionalVariable::Centroid => skeleton.centroid,
        }
    }

    pub fn value(&self, frame: &LarvaFrameData) -> TrackerPoint {
        self.point(frame.skeleton())
    }

    pub fn name(&self) -> &'static str {
        match self {
            PositionalVariable::Head => "head",
            PositionalVariable::Midpoint => "midpoint",
            PositionalVariable::Tail => "tail",
            PositionalVariable::Centroid => "centroid",
        }
    }
}

impl fmt::Display for PositionalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
