//! # Venkman-Tracking
//!
//! Per-frame kinematics and behavior-mode classification for tracked
//! larvae: speeds and angle speeds against the previous frame, jump
//! filtering, max length derivation, triangular smoothing and the
//! hysteresis state machine that assigns run, stop, back-up, turn and
//! cast modes.

pub mod classifier;
pub mod frame;
pub mod history;
pub mod parameters;
pub mod smoothing;

pub use classifier::{ClassifierInputs, ModeState};
pub use frame::LarvaFrameData;
pub use history::FrameHistory;
pub use parameters::LarvaBehaviorParameters;
