//! Closed-loop tracking session: derive each frame, ask the rule for
//! stimulus, record the result.

use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use venkman_core::{Error, LarvaBehaviorMode, LarvaSkeleton, LedStimulus, Result, SessionId};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters, LarvaFrameData};

use crate::rule::{RuleContext, RuleData, StimulusRule};

/// One tracked larva driven by one stimulus rule.
///
/// A session ends at the first error that invalidates the experiment
/// (an out of range function input); every later frame is rejected.
pub struct TrackingSession {
    id: SessionId,
    params: LarvaBehaviorParameters,
    rule: Box<dyn StimulusRule>,
    history: FrameHistory,
    rng: StdRng,
    rule_data: Vec<RuleData>,
    ended: Option<String>,
}

impl TrackingSession {
    pub fn new(mut rule: Box<dyn StimulusRule>, params: LarvaBehaviorParameters, seed: Option<u64>) -> Result<Self> {
        let params = rule.override_behavior_parameters(params);
        params.validate()?;
        rule.init();

        let id = SessionId::new();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(session = %id, rule = rule.code(), seeded = seed.is_some(), "Tracking session started");

        Ok(Self {
            id,
            params,
            rule,
            history: FrameHistory::new(),
            rng,
            rule_data: Vec::new(),
            ended: None,
        })
    }

    /// Derive the frame for `skeleton` and determine its stimulus.
    pub fn process_skeleton(&mut self, skeleton: LarvaSkeleton) -> Result<Vec<LedStimulus>> {
        if let Some(reason) = &self.ended {
            return Err(Error::SessionEnded(format!("{}: {}", self.id, reason)));
        }

        let frame = LarvaFrameData::derive(skeleton, &self.history, &self.params);
        self.history.push_front(frame);

        let mut ctx = RuleContext::new(&mut self.rng, &mut self.rule_data);
        let stimuli = match self.rule.determine_stimulus(&mut ctx, &self.history, &self.params) {
            Ok(stimuli) => stimuli,
            Err(e) => {
                if e.ends_session() {
                    error!(session = %self.id, error = %e, "Ending session");
                    self.ended = Some(e.to_string());
                }
                return Err(e);
            }
        };

        if let Some(frame) = self.history.most_recent_mut() {
            debug!(
                time = frame.time(),
                mode = %frame.behavior_mode(),
                count = stimuli.len(),
                "Determined stimulus"
            );
            frame.set_stimulus_list(stimuli.clone());
        }
        Ok(stimuli)
    }

    /// Process `skeleton` and write the resulting record to `sink`.
    pub fn process_and_record(
        &mut self,
        skeleton: LarvaSkeleton,
        sink: &mut dyn StimulusSink,
    ) -> Result<Vec<LedStimulus>> {
        let stimuli = self.process_skeleton(skeleton)?;
        if let Some(frame) = self.history.most_recent() {
            sink.record(&StimulusRecord::from_frame(frame))?;
        }
        Ok(stimuli)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn params(&self) -> &LarvaBehaviorParameters {
        &self.params
    }

    pub fn rule(&self) -> &dyn StimulusRule {
        self.rule.as_ref()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    pub fn rule_data(&self) -> &[RuleData] {
        &self.rule_data
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_some()
    }

    pub fn end_reason(&self) -> Option<&str> {
        self.ended.as_deref()
    }
}

/// Per-frame stimulus log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusRecord {
    pub time: i64,
    pub mode: LarvaBehaviorMode,
    pub stimuli: Vec<LedStimulus>,
}

impl StimulusRecord {
    pub fn from_frame(frame: &LarvaFrameData) -> Self {
        Self {
            time: frame.time(),
            mode: frame.behavior_mode(),
            stimuli: frame.stimulus_list().to_vec(),
        }
    }
}

/// Destination for per-frame stimulus records.
pub trait StimulusSink {
    fn record(&mut self, record: &StimulusRecord) -> Result<()>;
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StimulusSink for JsonLinesSink<W> {
    fn record(&mut self, record: &StimulusRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl StimulusSink for Vec<StimulusRecord> {
    fn record(&mut self, record: &StimulusRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::LedFlashPattern;
    use crate::positional::PositionalVariableFunction;
    use crate::range::OutOfRangeErrorHandlingMethod;
    use crate::rule::{DefinedEnvironment, ImportedStimulus};
    use crate::variable::PositionalVariable;
    use venkman_core::TrackerPoint;

    fn skeleton(time: i64, x: f64) -> LarvaSkeleton {
        let head = TrackerPoint::new(x + 1.0, 5.0);
        let midpoint = TrackerPoint::new(x, 5.0);
        let tail = TrackerPoint::new(x - 1.0, 5.0);
        LarvaSkeleton::new(time, head, midpoint, tail, 2.0, midpoint, 0.0, 0.0)
    }

    fn landscape_rule() -> Box<dyn StimulusRule> {
        let landscape = PositionalVariableFunction::from_rows(
            PositionalVariable::Head,
            10.0,
            10.0,
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            vec![vec![0.0, 10.0], vec![20.0, 30.0]],
        )
        .unwrap();
        Box::new(DefinedEnvironment::new(LedFlashPattern::default(), landscape, 0.0))
    }

    #[test]
    fn test_session_records_stimulus_on_frames() {
        let mut session = TrackingSession::new(landscape_rule(), LarvaBehaviorParameters::default(), Some(1)).unwrap();
        let mut records: Vec<StimulusRecord> = Vec::new();

        // head at (3, 5) then (8, 5): halfway between the rows
        let first = session.process_and_record(skeleton(0, 2.0), &mut records).unwrap();
        let second = session.process_and_record(skeleton(100, 7.0), &mut records).unwrap();

        assert_eq!(first, vec![LedStimulus::new(13.0, 60)]);
        assert_eq!(second, vec![LedStimulus::new(18.0, 60)]);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().most_recent().unwrap().stimulus_list(), second.as_slice());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].time, 100);
        assert_eq!(session.rule().code(), "1.1");
    }

    #[test]
    fn test_out_of_range_ends_session() {
        let mut session = TrackingSession::new(landscape_rule(), LarvaBehaviorParameters::default(), Some(1)).unwrap();
        let e = session.process_skeleton(skeleton(0, 20.0)).unwrap_err();
        assert!(e.ends_session());
        assert!(session.is_ended());

        let e = session.process_skeleton(skeleton(33, 2.0)).unwrap_err();
        assert!(matches!(e, Error::SessionEnded(_)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let params = LarvaBehaviorParameters {
            min_head_angle_for_casting: 720.0,
            ..Default::default()
        };
        assert!(TrackingSession::new(landscape_rule(), params, None).is_err());
    }

    #[test]
    fn test_json_lines_log_replays_through_import() {
        let mut source = ImportedStimulus::new(vec![LedStimulus::new(5.0, 100), LedStimulus::new(15.0, 100)]);
        source.imported_frame_stimulus = vec![Vec::new(), Vec::new(), vec![LedStimulus::new(25.0, 50)]];

        let mut session = TrackingSession::new(Box::new(source), LarvaBehaviorParameters::default(), Some(3)).unwrap();
        let mut sink = JsonLinesSink::new(Vec::new());
        for i in 0..3 {
            session.process_and_record(skeleton(i * 33, 2.0), &mut sink).unwrap();
        }

        let log = sink.into_inner();
        let replay = ImportedStimulus::from_stimulus_log(log.as_slice()).unwrap();
        assert_eq!(
            replay.imported_frame_stimulus,
            vec![
                vec![LedStimulus::new(5.0, 100)],
                vec![LedStimulus::new(15.0, 100)],
                vec![LedStimulus::new(25.0, 50)],
            ]
        );
    }

    #[test]
    fn test_same_seed_same_noise() {
        let noisy = || -> Box<dyn StimulusRule> {
            let landscape = PositionalVariableFunction::from_rows(
                PositionalVariable::Head,
                10.0,
                10.0,
                OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum,
                vec![vec![50.0]],
            )
            .unwrap();
            Box::new(DefinedEnvironment::new(LedFlashPattern::default(), landscape, 2.0))
        };
        let run = |seed| {
            let mut session = TrackingSession::new(noisy(), LarvaBehaviorParameters::default(), Some(seed)).unwrap();
            (0..5)
                .map(|i| session.process_skeleton(skeleton(i * 33, 2.0)).unwrap()[0].intensity_percentage())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }
}
