//! # Venkman-Core
//!
//! Core types and geometry for the Venkman larva tracking and
//! closed-loop stimulus engine.

pub mod behavior;
pub mod error;
pub mod geometry;
pub mod stimulus;
pub mod types;

pub use behavior::LarvaBehaviorMode;
pub use error::{Error, Result};
pub use geometry::*;
pub use stimulus::LedStimulus;
pub use types::*;
