//! Larva behavior modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Locomotor state assigned to a frame.
///
/// `Sampling` and `Ignore` are aggregate values used when comparing logs;
/// the classifier only ever assigns the discrete modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LarvaBehaviorMode {
    Run,
    BackUp,
    Stop,
    Ignore,
    Sampling,
    TurnRight,
    CastRight,
    TurnLeft,
    CastLeft,
}

impl LarvaBehaviorMode {
    /// Modes a larva can physically be in
    pub const DISCRETE: [LarvaBehaviorMode; 7] = [
        LarvaBehaviorMode::Run,
        LarvaBehaviorMode::BackUp,
        LarvaBehaviorMode::Stop,
        LarvaBehaviorMode::TurnRight,
        LarvaBehaviorMode::CastRight,
        LarvaBehaviorMode::TurnLeft,
        LarvaBehaviorMode::CastLeft,
    ];

    pub const ALL: [LarvaBehaviorMode; 9] = [
        LarvaBehaviorMode::Run,
        LarvaBehaviorMode::BackUp,
        LarvaBehaviorMode::Stop,
        LarvaBehaviorMode::Ignore,
        LarvaBehaviorMode::Sampling,
        LarvaBehaviorMode::TurnRight,
        LarvaBehaviorMode::CastRight,
        LarvaBehaviorMode::TurnLeft,
        LarvaBehaviorMode::CastLeft,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LarvaBehaviorMode::Run => "run",
            LarvaBehaviorMode::BackUp => "back-up",
            LarvaBehaviorMode::Stop => "stop",
            LarvaBehaviorMode::Ignore => "ignore",
            LarvaBehaviorMode::Sampling => "sampling",
            LarvaBehaviorMode::TurnRight => "turn-right",
            LarvaBehaviorMode::CastRight => "cast-right",
            LarvaBehaviorMode::TurnLeft => "turn-left",
            LarvaBehaviorMode::CastLeft => "cast-left",
        }
    }

    pub fn is_turning(&self) -> bool {
        matches!(self, LarvaBehaviorMode::TurnLeft | LarvaBehaviorMode::TurnRight)
    }

    pub fn is_casting(&self) -> bool {
        matches!(self, LarvaBehaviorMode::CastLeft | LarvaBehaviorMode::CastRight)
    }

    /// Same mode, or a cast compared against sampling (in either direction).
    pub fn is_equivalent(&self, other: &LarvaBehaviorMode) -> bool {
        self == other
            || (self.is_casting() && *other == LarvaBehaviorMode::Sampling)
            || (*self == LarvaBehaviorMode::Sampling && other.is_casting())
    }
}

impl fmt::Display for LarvaBehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LarvaBehaviorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LarvaBehaviorMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown behavior mode '{s}'")))
    }
}
