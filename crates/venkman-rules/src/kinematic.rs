//! Functions of a single kinematic measurement and behavior-gated stimulus filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use venkman_core::{LarvaBehaviorMode, LedStimulus, Result};
use venkman_tracking::LarvaFrameData;

use crate::function::SingleVariableFunction;
use crate::variable::KinematicVariable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicVariableFunction {
    pub variable: KinematicVariable,
    pub function: SingleVariableFunction,
}

impl KinematicVariableFunction {
    pub fn new(variable: KinematicVariable, function: SingleVariableFunction) -> Self {
        Self { variable, function }
    }

    pub fn value(&self, frame: &LarvaFrameData) -> Result<f64> {
        self.function.value(self.variable.value(frame))
    }
}

impl Default for KinematicVariableFunction {
    fn default() -> Self {
        Self::new(KinematicVariable::BodyAngle, SingleVariableFunction::default())
    }
}

/// Kinematic function that only adjusts stimuli while the larva is in one
/// of `behavior_modes`.
///
/// Additive functions add their value to each intensity; multiplicative
/// ones scale each intensity by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorLimitedKinematicVariableFunction {
    pub behavior_modes: BTreeSet<LarvaBehaviorMode>,
    #[serde(default)]
    pub is_additive: bool,
    pub variable: KinematicVariable,
    pub function: SingleVariableFunction,
}

impl BehaviorLimitedKinematicVariableFunction {
    pub fn new(
        behavior_modes: impl IntoIterator<Item = LarvaBehaviorMode>,
        is_additive: bool,
        variable: KinematicVariable,
        function: SingleVariableFunction,
    ) -> Self {
        Self {
            behavior_modes: behavior_modes.into_iter().collect(),
            is_additive,
            variable,
            function,
        }
    }

    pub fn is_applicable(&self, frame: &LarvaFrameData) -> bool {
        self.behavior_modes.contains(&frame.behavior_mode())
    }

    /// Adjust `stimuli` for `frame`. Multiplicative scaling never drops an
    /// intensity below `minimum_intensity`.
    pub fn apply_value(
        &self,
        frame: &LarvaFrameData,
        stimuli: &mut [LedStimulus],
        minimum_intensity: f64,
    ) -> Result<()> {
        if !self.is_applicable(frame) {
            return Ok(());
        }
        let value = self.function.value(self.variable.value(frame))?;
        for stimulus in stimuli.iter_mut() {
            if self.is_additive {
                stimulus.add_intensity(value);
            } else {
                stimulus.scale_with_floor(value, minimum_intensity);
            }
        }
        Ok(())
    }
}

impl Default for BehaviorLimitedKinematicVariableFunction {
    fn default() -> Self {
        Self::new(
            LarvaBehaviorMode::DISCRETE,
            false,
            KinematicVariable::PercentageOfMaxLength,
            SingleVariableFunction::constant(1.0),
        )
    }
}

/// Ordered filters applied one after another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorLimitedKinematicVariableFunctionList {
    functions: Vec<BehaviorLimitedKinematicVariableFunction>,
}

impl BehaviorLimitedKinematicVariableFunctionList {
    pub fn new(functions: Vec<BehaviorLimitedKinematicVariableFunction>) -> Self {
        Self { functions }
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    pub fn apply_values(
        &self,
        frame: &LarvaFrameData,
        stimuli: &mut [LedStimulus],
        minimum_intensity: f64,
    ) -> Result<()> {
        for function in &self.functions {
            function.apply_value(frame, stimuli, minimum_intensity)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BehaviorLimitedKinematicVariableFunction> {
        self.functions.iter()
    }
}
