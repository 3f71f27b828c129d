//! Out-of-range input handling policies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a function does with inputs outside its domain, chosen independently
/// for the minimum and maximum side: repeat the edge value, or end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutOfRangeErrorHandlingMethod {
    #[default]
    EndSessionForMinimumAndMaximum,
    EndSessionForMinimumRepeatMaximum,
    RepeatMinimumEndSessionForMaximum,
    RepeatMinimumAndMaximum,
}

impl OutOfRangeErrorHandlingMethod {
    pub const ALL: [OutOfRangeErrorHandlingMethod; 4] = [
        OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
        OutOfRangeErrorHandlingMethod::EndSessionForMinimumRepeatMaximum,
        OutOfRangeErrorHandlingMethod::RepeatMinimumEndSessionForMaximum,
        OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum,
    ];

    pub fn repeat_minimum(&self) -> bool {
        matches!(
            self,
            OutOfRangeErrorHandlingMethod::RepeatMinimumEndSessionForMaximum
                | OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum
        )
    }

    pub fn repeat_maximum(&self) -> bool {
        matches!(
            self,
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumRepeatMaximum
                | OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum => "end session for minimum and maximum",
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumRepeatMaximum => "end session for minimum, repeat maximum",
            OutOfRangeErrorHandlingMethod::RepeatMinimumEndSessionForMaximum => "repeat minimum, end session for maximum",
            OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum => "repeat minimum and maximum",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum => {
                "End the session whenever an input falls below the minimum or above the maximum."
            }
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumRepeatMaximum => {
                "End the session for inputs below the minimum; inputs above the maximum use the maximum value."
            }
            OutOfRangeErrorHandlingMethod::RepeatMinimumEndSessionForMaximum => {
                "Inputs below the minimum use the minimum value; end the session for inputs above the maximum."
            }
            OutOfRangeErrorHandlingMethod::RepeatMinimumAndMaximum => {
                "Inputs below the minimum use the minimum value and inputs above the maximum use the maximum value."
            }
        }
    }
}

impl fmt::Display for OutOfRangeErrorHandlingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
