use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;
use venkman_core::{LedStimulus, Result};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters};

use super::{current_frame, zero_intensity_for_one_second, DefinedEnvironment, RuleContext, StimulusRule};
use crate::function::SingleVariableFunction;
use crate::intensity::IntensityValue;

pub const DEFAULT_PERCENTAGE_OF_MAX_LENGTH_TO_ACTIVATE_GRADIENT: f64 = 90.0;

/// Landscape stimulus only while the larva is elongated, plus an intensity
/// that grows with elapsed time.
///
/// Frames below the activation percentage get the default intensity. When
/// intensity filters are configured they take over the gating and the
/// activation percentage is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinedEnvironmentForMaximumLengthWithAdditiveFunction {
    #[serde(flatten)]
    pub environment: DefinedEnvironment,
    pub percentage_of_max_length_to_activate_gradient: f64,
    pub default_intensity_percentage: IntensityValue,
    pub additive_intensity_function: SingleVariableFunction,
    /// Older configurations carried the max length derivation duration here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_max_length_derivation_duration: Option<i64>,
}

impl Default for DefinedEnvironmentForMaximumLengthWithAdditiveFunction {
    fn default() -> Self {
        Self {
            environment: DefinedEnvironment::default(),
            percentage_of_max_length_to_activate_gradient: DEFAULT_PERCENTAGE_OF_MAX_LENGTH_TO_ACTIVATE_GRADIENT,
            default_intensity_percentage: IntensityValue::default(),
            additive_intensity_function: SingleVariableFunction::default(),
            deprecated_max_length_derivation_duration: None,
        }
    }
}

impl DefinedEnvironmentForMaximumLengthWithAdditiveFunction {
    pub fn new(
        environment: DefinedEnvironment,
        percentage_of_max_length_to_activate_gradient: f64,
        default_intensity_percentage: IntensityValue,
        additive_intensity_function: SingleVariableFunction,
    ) -> Self {
        Self {
            environment,
            percentage_of_max_length_to_activate_gradient,
            default_intensity_percentage,
            additive_intensity_function,
            deprecated_max_length_derivation_duration: None,
        }
    }

    /// Percentage of max length at which the landscape takes over.
    pub fn activation_percentage(&self) -> f64 {
        if self.environment.intensity_filters.has_functions() {
            0.0
        } else {
            self.percentage_of_max_length_to_activate_gradient
        }
    }
}

impl StimulusRule for DefinedEnvironmentForMaximumLengthWithAdditiveFunction {
    fn code(&self) -> &'static str {
        "1.5"
    }

    fn description(&self) -> &'static str {
        "Discrete versus continuous sampling with time based additive intensity."
    }

    fn init(&mut self) {
        self.environment.init();
    }

    fn override_behavior_parameters(&mut self, mut params: LarvaBehaviorParameters) -> LarvaBehaviorParameters {
        if let Some(duration) = self.deprecated_max_length_derivation_duration.take() {
            info!(duration, "Using max length derivation duration from rule configuration");
            params.max_length_derivation_duration = duration;
        }
        params
    }

    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        _params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        let frame = current_frame(history)?;
        if !frame.is_max_length_derivation_complete() {
            return Ok(zero_intensity_for_one_second());
        }

        let flash_pattern = &self.environment.flash_pattern;
        let default_intensity = self.default_intensity_percentage;
        let percentage = frame.percentage_of_max_length().unwrap_or(0.0);
        if percentage < self.activation_percentage() {
            return Ok(flash_pattern.stimulus_list(default_intensity.value(ctx.rng)));
        }

        let flash_pattern = flash_pattern.clone();
        let mut stimuli = self
            .environment
            .position_based_stimulus(ctx, frame, |rng| flash_pattern.stimulus_list(default_intensity.value(rng)))?;

        if self.environment.is_oriented() {
            let time = (frame.time() as f64).min(self.additive_intensity_function.maximum_input());
            let additive = self.additive_intensity_function.value(time)?;
            for stimulus in stimuli.iter_mut() {
                stimulus.add_intensity(additive);
            }
        }

        let floor = default_intensity.value(ctx.rng);
        self.environment
            .apply_intensity_filters_and_white_noise(ctx, frame, &mut stimuli, floor)?;
        Ok(stimuli)
    }

    fn arena(&self, width: usize, height: usize) -> Option<Result<Array2<f64>>> {
        self.environment.arena(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::LedFlashPattern;
    use crate::kinematic::{BehaviorLimitedKinematicVariableFunction, BehaviorLimitedKinematicVariableFunctionList};
    use crate::positional::PositionalVariableFunction;
    use crate::range::OutOfRangeErrorHandlingMethod;
    use crate::rule::RuleData;
    use crate::variable::{KinematicVariable, PositionalVariable};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use venkman_core::{LarvaBehaviorMode, LarvaSkeleton, TrackerPoint};
    use venkman_tracking::LarvaFrameData;

    fn flat_landscape(value: f64) -> PositionalVariableFunction {
        PositionalVariableFunction::from_rows(
            PositionalVariable::Head,
            10.0,
            10.0,
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            vec![vec![value]],
        )
        .unwrap()
    }

    fn rule() -> DefinedEnvironmentForMaximumLengthWithAdditiveFunction {
        DefinedEnvironmentForMaximumLengthWithAdditiveFunction::new(
            DefinedEnvironment::new(LedFlashPattern::default(), flat_landscape(40.0), 0.0),
            90.0,
            IntensityValue::new(10.0),
            SingleVariableFunction::new(
                0.0,
                2000.0,
                OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
                vec![0.0, 20.0],
            )
            .unwrap(),
        )
    }

    /// Frames derived at 100 ms spacing with the given body lengths.
    fn derived_history(lengths: &[f64]) -> FrameHistory {
        let params = LarvaBehaviorParameters {
            max_length_derivation_duration: 300,
            ..Default::default()
        };
        let mut history = FrameHistory::new();
        for (i, length) in lengths.iter().enumerate() {
            let p = TrackerPoint::new(5.0, 5.0);
            let skeleton = LarvaSkeleton::new(i as i64 * 100, p, p, p, *length, p, 0.0, 0.0);
            let frame = LarvaFrameData::derive(skeleton, &history, &params);
            history.push_front(frame);
        }
        history
    }

    fn determine(
        rule: &mut DefinedEnvironmentForMaximumLengthWithAdditiveFunction,
        history: &FrameHistory,
    ) -> Vec<LedStimulus> {
        let mut rng = StdRng::seed_from_u64(9);
        let mut log: Vec<RuleData> = Vec::new();
        let mut ctx = RuleContext::new(&mut rng, &mut log);
        rule.determine_stimulus(&mut ctx, history, &LarvaBehaviorParameters::default())
            .unwrap()
    }

    #[test]
    fn test_zero_intensity_while_deriving_max_length() {
        let mut rule = rule();
        let stimuli = determine(&mut rule, &derived_history(&[2.0, 2.0]));
        assert_eq!(stimuli, zero_intensity_for_one_second());
    }

    #[test]
    fn test_default_intensity_below_threshold() {
        let mut rule = rule();
        let stimuli = determine(&mut rule, &derived_history(&[2.0, 2.0, 2.0, 2.0, 2.0, 1.0]));
        assert_eq!(stimuli, vec![LedStimulus::new(10.0, 60)]);
    }

    #[test]
    fn test_gradient_with_additive_intensity() {
        let mut rule = rule();
        // t = 500 ms at full length: 40 from the landscape plus 5 from the additive function
        let stimuli = determine(&mut rule, &derived_history(&[2.0, 2.0, 2.0, 2.0, 2.0, 2.0]));
        assert_eq!(stimuli.len(), 1);
        assert!((stimuli[0].intensity_percentage() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_filters_disable_activation_threshold() {
        let mut rule = rule();
        rule.environment.intensity_filters =
            BehaviorLimitedKinematicVariableFunctionList::new(vec![BehaviorLimitedKinematicVariableFunction::new(
                LarvaBehaviorMode::DISCRETE,
                false,
                KinematicVariable::PercentageOfMaxLength,
                SingleVariableFunction::new(
                    0.0,
                    100.0,
                    OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum,
                    vec![0.0, 1.0],
                )
                .unwrap(),
            )]);
        assert_eq!(rule.activation_percentage(), 0.0);

        // 50% of max length scales (40 + 5) by 0.5, floored at the default intensity
        let stimuli = determine(&mut rule, &derived_history(&[2.0, 2.0, 2.0, 2.0, 2.0, 1.0]));
        assert!((stimuli[0].intensity_percentage() - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_derivation_duration_overrides_once() {
        let mut rule: DefinedEnvironmentForMaximumLengthWithAdditiveFunction =
            serde_json::from_str(r#"{"deprecated_max_length_derivation_duration": 2500}"#).unwrap();
        let params = rule.override_behavior_parameters(LarvaBehaviorParameters::default());
        assert_eq!(params.max_length_derivation_duration, 2500);
        let params = rule.override_behavior_parameters(LarvaBehaviorParameters::default());
        assert_eq!(params.max_length_derivation_duration, 1000);
        assert_eq!(rule.percentage_of_max_length_to_activate_gradient, 90.0);
    }
}
