use std::io::BufRead;

use serde::{Deserialize, Serialize};
use venkman_core::{LedStimulus, Result};
use venkman_tracking::{FrameHistory, LarvaBehaviorParameters, LarvaFrameData};

use super::{ignore_intensity_for_frame, RuleContext, StimulusRule};
use crate::session::StimulusRecord;

/// Replays the stimulus of a previously logged session frame by frame.
///
/// Per-frame LED stimuli take precedence over the stimulus lists of
/// imported frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportedStimulus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    pub imported_led_stimulus: Vec<LedStimulus>,
    pub imported_frame_stimulus: Vec<Vec<LedStimulus>>,
}

impl ImportedStimulus {
    pub fn new(imported_led_stimulus: Vec<LedStimulus>) -> Self {
        Self {
            imported_led_stimulus,
            ..Default::default()
        }
    }

    pub fn from_frames<'a>(frames: impl IntoIterator<Item = &'a LarvaFrameData>) -> Self {
        Self {
            imported_frame_stimulus: frames.into_iter().map(|frame| frame.stimulus_list().to_vec()).collect(),
            ..Default::default()
        }
    }

    /// Load the JSON lines log written by [`crate::JsonLinesSink`].
    pub fn from_stimulus_log(reader: impl BufRead) -> Result<Self> {
        let mut imported_frame_stimulus = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StimulusRecord = serde_json::from_str(&line)?;
            imported_frame_stimulus.push(record.stimuli);
        }
        Ok(Self {
            imported_frame_stimulus,
            ..Default::default()
        })
    }

    pub fn frame_count(&self) -> usize {
        self.imported_led_stimulus.len().max(self.imported_frame_stimulus.len())
    }
}

impl StimulusRule for ImportedStimulus {
    fn code(&self) -> &'static str {
        "import"
    }

    fn description(&self) -> &'static str {
        "Explicit stimulus imported from a prior run."
    }

    fn supports_version(&self, _version: &str) -> bool {
        true
    }

    fn determine_stimulus(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        history: &FrameHistory,
        _params: &LarvaBehaviorParameters,
    ) -> Result<Vec<LedStimulus>> {
        let Some(frame_index) = history.len().checked_sub(1) else {
            return Ok(ignore_intensity_for_frame());
        };

        if let Some(stimulus) = self.imported_led_stimulus.get(frame_index) {
            Ok(vec![*stimulus])
        } else if let Some(stimuli) = self.imported_frame_stimulus.get(frame_index) {
            Ok(stimuli.clone())
        } else {
            Ok(ignore_intensity_for_frame())
        }
    }
}
