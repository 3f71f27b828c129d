//! # Venkman-Rules
//!
//! Transfer functions and closed-loop stimulus rules for tracked larvae.
//!
//! Single variable functions map a kinematic measurement to a value by
//! linear interpolation over evenly spaced samples; positional functions
//! do the same over a 2D grid covering the arena. Rules combine them with
//! flash patterns, behavior-mode filters and noise to decide the LED
//! stimulus for every frame of a [`TrackingSession`].

pub mod config;
pub mod flash;
pub mod function;
pub mod intensity;
pub mod kinematic;
pub mod matrix;
pub mod positional;
pub mod range;
pub mod rule;
pub mod session;
pub mod variable;

pub use crate::config::{RuleConfig, SessionConfig};
pub use flash::LedFlashPattern;
pub use function::SingleVariableFunction;
pub use intensity::{IntensityValue, NoiseGenerator};
pub use kinematic::{
    BehaviorLimitedKinematicVariableFunction, BehaviorLimitedKinematicVariableFunctionList, KinematicVariableFunction,
};
pub use matrix::Matrix;
pub use positional::PositionalVariableFunction;
pub use range::OutOfRangeErrorHandlingMethod;
pub use rule::{RuleContext, RuleData, StimulusRule};
pub use session::{JsonLinesSink, StimulusRecord, StimulusSink, TrackingSession};
pub use variable::{KinematicVariable, PositionalVariable};
