use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use venkman_core::{LedStimulus, Result};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters};

use super::{current_frame, rule_data_names, RuleContext, StimulusRule};
use crate::flash::LedFlashPattern;
use crate::function::SingleVariableFunction;
use crate::intensity::{add_noise_using_ratio, IntensityValue};
use crate::kinematic::BehaviorLimitedKinematicVariableFunctionList;

/// Run intensity scaled by time since run onset.
///
/// Outside runs the non-run intensity is used. Within a run the run
/// intensity is multiplied by the scaling function of the time elapsed since
/// `milliseconds_delay` after onset. With random function selection each
/// run onset may switch between the primary and alternate scaling
/// functions once the current one has persisted long enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaledRunIntensity {
    pub flash_pattern: LedFlashPattern,
    pub non_run_intensity_percentage: IntensityValue,
    pub non_run_signal_to_noise_ratio: f64,
    pub run_intensity_percentage: IntensityValue,
    pub milliseconds_delay: i64,
    pub run_intensity_scaling_function: SingleVariableFunction,
    pub run_signal_to_noise_ratio: f64,
    pub is_random_function_selection_active: bool,
    pub random_function_persistence_duration: i64,
    pub alternate_run_intensity_scaling_function: SingleVariableFunction,
    pub alternate_run_signal_to_noise_ratio: f64,
    pub intensity_filters: BehaviorLimitedKinematicVariableFunctionList,
    #[serde(skip)]
    state: RunState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RunState {
    run_onset_time: Option<i64>,
    random_function_selection_time: Option<i64>,
    use_alternate_function: bool,
    current_signal_to_noise_ratio: f64,
}

impl Default for ScaledRunIntensity {
    fn default() -> Self {
        Self {
            flash_pattern: LedFlashPattern::default(),
            non_run_intensity_percentage: IntensityValue::default(),
            non_run_signal_to_noise_ratio: 0.0,
            run_intensity_percentage: IntensityValue::default(),
            milliseconds_delay: 0,
            run_intensity_scaling_function: SingleVariableFunction::default(),
            run_signal_to_noise_ratio: 0.0,
            is_random_function_selection_active: false,
            random_function_persistence_duration: 0,
            alternate_run_intensity_scaling_function: SingleVariableFunction::default(),
            alternate_run_signal_to_noise_ratio: 0.0,
            intensity_filters: BehaviorLimitedKinematicVariableFunctionList::default(),
            state: RunState::default(),
        }
    }
}

impl ScaledRunIntensity {
    pub fn new(
        flash_pattern: LedFlashPattern,
        non_run_intensity_percentage: IntensityValue,
        run_intensity_percentage: IntensityValue,
        milliseconds_delay: i64,
        run_intensity_scaling_function: SingleVariableFunction,
    ) -> Self {
        Self {
            flash_pattern,
            non_run_intensity_percentage,
            run_intensity_percentage,
            milliseconds_delay,
            run_intensity_scaling_function,
            ..Default::default()
        }
    }

    pub fn with_random_function_selection(
        mut self,
        random_function_persistence_duration: i64,
        alternate_run_intensity_scaling_function: SingleVariableFunction,
        alternate_run_signal_to_noise_ratio: f64,
    ) -> Self {
        self.is_random_function_selection_active = true;
        self.random_function_persistence_duration = random_function_persistence_duration;
        self.alternate_run_intensity_scaling_function = alternate_run_intensity_scaling_function;
        self.alternate_run_signal_to_noise_ratio = alternate_run_signal_to_noise_ratio;
        self
    }

    pub fn current_signal_to_noise_ratio(&self) -> f64 {
        self.state.current_signal_to_noise_ratio
    }

    pub fn is_using_alternate_function(&self) -> bool {
        self.state.use_alternate_function
    }

    pub fn run_onset_time(&self) -> Option<i64> {
        self.state.run_onset_time
    }

    fn current_run_intensity_scaling_function(&self) -> &SingleVariableFunction {
        if self.state.use_alternate_function {
            &self.alternate_run_intensity_scaling_function
        } else {
            &self.run_intensity_scaling_function
        }
    }

    fn reset(&mut self) {
        self.state = RunState {
            current_signal_to_noise_ratio: self.non_run_signal_to_noise_ratio,
            ..RunState::default()
        };
    }

    /// Mark `time` as a run onset, optionally drawing a fresh delay from `[0, maximum_random_delay)`.
    fn start_run(&mut self, ctx: &mut RuleContext<'_>, time: i64, maximum_random_delay: i64) {
        self.state.run_onset_time = Some(time);
        if maximum_random_delay > 0 {
            self.milliseconds_delay = ctx.rng.gen_range(0..maximum_random_delay);
        }

        if !self.is_random_function_selection_active {
            self.state.current_signal_to_noise_ratio = self.run_signal_to_noise_ratio;
            return;
        }

        let persisted_long_enough = self
            .state
            .random_function_selection_time
            .map_or(true, |selected| time - selected > self.random_function_persistence_duration);

        if persisted_long_enough {
            let use_alternate: bool = ctx.rng.gen();
            self.state.use_alternate_function = use_alternate;
            self.state.random_function_selection_time = Some(time);
            let name = if use_alternate {
                rule_data_names::ALTERNATE
            } else {
                rule_data_names::PRIMARY
            };
            info!(time, function = name, "Selected run intensity function");
            ctx.log_rule_data(time, rule_data_names::INTENSITY_FUNCTION, name);
        }

        self.state.current_signal_to_noise_ratio = if self.state.use_alternate_function {
            self.alternate_run_signal_to_noise_ratio
        } else {
            self.run_signal_to_noise_ratio
        };
    }

    fn stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        maximum_random_delay: i64,
    ) -> Result<Vec<LedStimulus>> {
        let frame = current_frame(history)?;

        let derived_intensity = if frame.is_running() {
            let time = frame.time();
            let mut intensity = self.run_intensity_percentage.value(ctx.rng);
            let onset = match self.state.run_onset_time {
                Some(onset) => onset,
                None => {
                    self.start_run(ctx, time, maximum_random_delay);
                    time
                }
            };

            let time_since_onset = time - onset;
            if time_since_onset >= self.milliseconds_delay {
                let time_since_scaling_started = (time_since_onset - self.milliseconds_delay) as f64;
                intensity *= self.current_run_intensity_scaling_function().value(time_since_scaling_started)?;
            }
            intensity
        } else {
            self.state.run_onset_time = None;
            self.state.current_signal_to_noise_ratio = self.non_run_signal_to_noise_ratio;
            self.non_run_intensity_percentage.value(ctx.rng)
        };

        let mut stimuli = self.flash_pattern.stimulus_list(derived_intensity);
        self.intensity_filters.apply_values(frame, &mut stimuli, 0.0)?;
        add_noise_using_ratio(self.state.current_signal_to_noise_ratio, &mut stimuli, ctx.rng);
        Ok(stimuli)
    }
}

impl StimulusRule for ScaledRunIntensity {
    fn code(&self) -> &'static str {
        "2.1/3.1"
    }

    fn description(&self) -> &'static str {
        "Elongation of runs/induction of turns through synthesis of positive/negative olfactory experiences."
    }

    fn init(&mut self) {
        self.reset();
    }

    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        _params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        self.stimulus(ctx, history, 0)
    }
}

/// [`ScaledRunIntensity`] whose delay is drawn again at every run onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaledRunIntensityWithRandomDelay {
    #[serde(flatten)]
    pub scaled_run: ScaledRunIntensity,
    pub maximum_milliseconds_delay: i64,
}

impl Default for ScaledRunIntensityWithRandomDelay {
    fn default() -> Self {
        Self::new(ScaledRunIntensity::default(), 0)
    }
}

impl ScaledRunIntensityWithRandomDelay {
    pub fn new(mut scaled_run: ScaledRunIntensity, maximum_milliseconds_delay: i64) -> Self {
        scaled_run.milliseconds_delay = 0;
        Self {
            scaled_run,
            maximum_milliseconds_delay,
        }
    }

    pub fn milliseconds_delay(&self) -> i64 {
        self.scaled_run.milliseconds_delay
    }
}

impl StimulusRule for ScaledRunIntensityWithRandomDelay {
    fn code(&self) -> &'static str {
        "2.2/3.2"
    }

    fn description(&self) -> &'static str {
        "Elongation of runs/induction of turns through synthesis of positive/negative olfactory experiences with random delay."
    }

    fn init(&mut self) {
        self.scaled_run.init();
    }

    fn determine_stimulus(
        &mut self,
        ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        _params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        self.scaled_run.stimulus(ctx, history, self.maximum_milliseconds_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::OutOfRangeErrorHandlingMethod;
    use crate::rule::test_support::frame_at;
    use crate::rule::RuleData;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::kinematic::BehaviorLimitedKinematicVariableFunction;
    use crate::variable::KinematicVariable;
    use venkman_core::LarvaBehaviorMode;

    fn doubling_over_one_second() -> SingleVariableFunction {
        SingleVariableFunction::new(
            0.0,
            1000.0,
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumRepeatMaximum,
            vec![1.0, 2.0],
        )
        .unwrap()
    }

    /// Feed frames one at a time, returning the first stimulus intensity per frame.
    fn drive(rule: &mut dyn StimulusRule, frames: &[(i64, LarvaBehaviorMode)], seed: u64) -> (Vec<f64>, Vec<RuleData>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut log = Vec::new();
        let mut history = FrameHistory::new();
        let mut intensities = Vec::new();
        rule.init();
        for &(time, mode) in frames {
            history.push_front(frame_at(time, mode));
            let mut ctx = RuleContext::new(&mut rng, &mut log);
            let stimuli = rule
                .determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default())
                .unwrap();
            intensities.push(stimuli[0].intensity_percentage());
        }
        (intensities, log)
    }

    fn assert_all_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn test_run_scaling_with_delay() {
        use LarvaBehaviorMode::*;
        let mut rule = ScaledRunIntensity::new(
            LedFlashPattern::default(),
            IntensityValue::new(5.0),
            IntensityValue::new(20.0),
            200,
            doubling_over_one_second(),
        );
        let frames = [(0, Stop), (100, Run), (200, Run), (300, Run), (800, Run), (2000, Run), (2100, Stop), (2200, Run)];
        let (intensities, log) = drive(&mut rule, &frames, 1);
        assert_all_close(&intensities, &[5.0, 20.0, 20.0, 20.0, 30.0, 40.0, 5.0, 20.0]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_signal_to_noise_follows_run_state() {
        let mut rule = ScaledRunIntensity {
            non_run_signal_to_noise_ratio: 3.0,
            run_signal_to_noise_ratio: 7.0,
            ..ScaledRunIntensity::default()
        };
        rule.init();
        assert_eq!(rule.current_signal_to_noise_ratio(), 3.0);

        let mut rng = StdRng::seed_from_u64(2);
        let mut log = Vec::new();
        let mut history = FrameHistory::new();
        history.push_front(frame_at(0, LarvaBehaviorMode::Run));
        let mut ctx = RuleContext::new(&mut rng, &mut log);
        rule.determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default())
            .unwrap();
        assert_eq!(rule.current_signal_to_noise_ratio(), 7.0);
        assert_eq!(rule.run_onset_time(), Some(0));

        history.push_front(frame_at(33, LarvaBehaviorMode::CastLeft));
        let mut ctx = RuleContext::new(&mut rng, &mut log);
        rule.determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default())
            .unwrap();
        assert_eq!(rule.current_signal_to_noise_ratio(), 3.0);
        assert_eq!(rule.run_onset_time(), None);
    }

    #[test]
    fn test_random_function_selection_persists() {
        use LarvaBehaviorMode::*;
        let alternate = SingleVariableFunction::from_values(vec![0.0]).unwrap();
        let mut rule = ScaledRunIntensity::new(
            LedFlashPattern::default(),
            IntensityValue::new(0.0),
            IntensityValue::new(50.0),
            0,
            SingleVariableFunction::from_values(vec![1.0]).unwrap(),
        )
        .with_random_function_selection(1000, alternate, 0.0);

        // onsets at 0 and 200 fall inside the persistence window, 2000 does not
        let frames = [(0, Run), (100, Stop), (200, Run), (300, Stop), (2000, Run)];
        let (intensities, log) = drive(&mut rule, &frames, 42);

        assert_eq!(log.len(), 2);
        assert_eq!(log[0].capture_time, 0);
        assert_eq!(log[1].capture_time, 2000);
        assert!(log.iter().all(|d| d.name == "intensity function"));

        let first_choice = if log[0].value == "alternate" { 0.0 } else { 50.0 };
        let second_choice = if log[1].value == "alternate" { 0.0 } else { 50.0 };
        assert_all_close(&intensities, &[first_choice, 0.0, first_choice, 0.0, second_choice]);
    }

    #[test]
    fn test_out_of_range_scaling_ends_session() {
        let mut rule = ScaledRunIntensity::new(
            LedFlashPattern::default(),
            IntensityValue::new(0.0),
            IntensityValue::new(50.0),
            0,
            SingleVariableFunction::from_values(vec![1.0, 2.0]).unwrap(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let mut log = Vec::new();
        let mut history = FrameHistory::new();
        history.push_front(frame_at(0, LarvaBehaviorMode::Run));
        history.push_front(frame_at(5, LarvaBehaviorMode::Run));
        let mut ctx = RuleContext::new(&mut rng, &mut log);
        // onset taken from this frame; 0 ms since onset is in range
        assert!(rule.determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default()).is_ok());
        history.push_front(frame_at(10, LarvaBehaviorMode::Run));
        let mut ctx = RuleContext::new(&mut rng, &mut log);
        let error = rule
            .determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default())
            .unwrap_err();
        assert!(error.ends_session());
    }

    #[test]
    fn test_random_delay_is_drawn_per_onset() {
        let base = ScaledRunIntensity::new(
            LedFlashPattern::default(),
            IntensityValue::new(0.0),
            IntensityValue::new(10.0),
            500,
            doubling_over_one_second(),
        );
        let mut rule = ScaledRunIntensityWithRandomDelay::new(base, 100);
        assert_eq!(rule.milliseconds_delay(), 0);

        let mut rng = StdRng::seed_from_u64(8);
        let mut log = Vec::new();
        let mut history = FrameHistory::new();
        rule.init();
        for time in [0, 50, 100] {
            history.push_front(frame_at(time, LarvaBehaviorMode::Run));
            let mut ctx = RuleContext::new(&mut rng, &mut log);
            rule.determine_stimulus(&mut ctx, &history, &LarvaBehaviorParameters::default())
                .unwrap();
            assert!((0..100).contains(&rule.milliseconds_delay()));
        }

        let no_delay = ScaledRunIntensityWithRandomDelay::new(ScaledRunIntensity::default(), 0);
        assert_eq!(no_delay.code(), "2.2/3.2");
        assert_eq!(no_delay.milliseconds_delay(), 0);
    }

    #[test]
    fn test_filters_apply_to_run_intensity() {
        use LarvaBehaviorMode::*;
        let halve_runs = BehaviorLimitedKinematicVariableFunction::new(
            [Run],
            false,
            KinematicVariable::HeadAngle,
            SingleVariableFunction::constant(0.5),
        );
        let mut rule = ScaledRunIntensity {
            intensity_filters: BehaviorLimitedKinematicVariableFunctionList::new(vec![halve_runs]),
            ..ScaledRunIntensity::new(
                LedFlashPattern::default(),
                IntensityValue::new(30.0),
                IntensityValue::new(20.0),
                0,
                SingleVariableFunction::constant(1.0),
            )
        };
        let (intensities, _) = drive(&mut rule, &[(0, Stop), (100, Run)], 4);
        assert_all_close(&intensities, &[30.0, 10.0]);
    }
}
