//! Session configuration.

use std::fs::File;
use std::io::BufReader;

use serde::{Deserialize, Serialize};
use tracing::info;
use venkman_core::{Error, Result};
use venkman_tracking::LarvaBehaviorParameters;

use crate::rule::{
    DefinedEnvironment, DefinedEnvironmentBasedUponOrientation, DefinedEnvironmentForMaximumLengthWithAdditiveFunction,
    ImportedStimulus, ScaledRunIntensity, ScaledRunIntensityWithRandomDelay, StimulusRule,
};
use crate::session::TrackingSession;

pub const DEFAULT_RULE_VERSION: &str = "1";

/// Complete configuration for one tracking session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Behavior classification thresholds
    pub behavior: LarvaBehaviorParameters,

    /// Stimulus rule and its parameters
    pub rule: RuleConfig,

    /// Seed for rule randomness; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Rule version the configuration was written for
    pub version: String,
}

/// Stimulus rule selected by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfig {
    DefinedEnvironment(DefinedEnvironment),
    DefinedEnvironmentBasedUponOrientation(DefinedEnvironment),
    DefinedEnvironmentForMaximumLength(DefinedEnvironmentForMaximumLengthWithAdditiveFunction),
    ScaledRunIntensity(ScaledRunIntensity),
    ScaledRunIntensityWithRandomDelay(ScaledRunIntensityWithRandomDelay),
    Import(ImportedStimulus),
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig::DefinedEnvironment(DefinedEnvironment::default())
    }
}

impl RuleConfig {
    /// Instantiate the configured rule. Imports load their stimulus log here.
    pub fn into_rule(self) -> Result<Box<dyn StimulusRule>> {
        let rule: Box<dyn StimulusRule> = match self {
            RuleConfig::DefinedEnvironment(rule) => Box::new(rule),
            RuleConfig::DefinedEnvironmentBasedUponOrientation(environment) => {
                Box::new(DefinedEnvironmentBasedUponOrientation::new(environment))
            }
            RuleConfig::DefinedEnvironmentForMaximumLength(rule) => Box::new(rule),
            RuleConfig::ScaledRunIntensity(rule) => Box::new(rule),
            RuleConfig::ScaledRunIntensityWithRandomDelay(rule) => Box::new(rule),
            RuleConfig::Import(rule) => match rule.log_file_path.clone() {
                Some(path) => {
                    let file = File::open(&path).map_err(|e| Error::Io(format!("{e} ({path})")))?;
                    let loaded = ImportedStimulus::from_stimulus_log(BufReader::new(file))?;
                    info!(path = %path, frames = loaded.frame_count(), "Imported stimulus log");
                    Box::new(ImportedStimulus {
                        imported_frame_stimulus: loaded.imported_frame_stimulus,
                        ..rule
                    })
                }
                None => Box::new(rule),
            },
        };
        Ok(rule)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            behavior: LarvaBehaviorParameters::default(),
            rule: RuleConfig::default(),
            seed: None,
            version: DEFAULT_RULE_VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VENKMAN").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("VENKMAN").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate the configuration and start a session for it.
    pub fn build(self) -> Result<TrackingSession> {
        let rule = self.rule.into_rule()?;
        if !rule.supports_version(&self.version) {
            return Err(Error::UnsupportedVersion {
                code: rule.code().to_string(),
                version: self.version,
            });
        }
        TrackingSession::new(rule, self.behavior, self.seed)
    }
}
