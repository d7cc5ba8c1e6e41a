use posner_core::{ExperimentError, Layout, ResponseKeys, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session parameters. Every field falls back to the reference protocol, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub fixation_ms: u64,
    pub cue_ms: u64,
    /// Cue onset to target onset.
    pub soa_ms: u64,
    pub feedback_ms: u64,
    pub valid_trials: usize,
    pub invalid_trials: usize,
    pub keys: ResponseKeys,
    pub layout: Layout,
    pub messages: Messages,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            fixation_ms: 1500,
            cue_ms: 50,
            soa_ms: 700,
            feedback_ms: 2000,
            valid_trials: 64,
            invalid_trials: 12,
            keys: ResponseKeys::default(),
            layout: Layout::default(),
            messages: Messages::default(),
            seed: None,
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ExperimentError::io("configuration", e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ExperimentError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.soa_ms < self.cue_ms {
            return Err(ExperimentError::Config(format!(
                "soa_ms ({}) is shorter than cue_ms ({})",
                self.soa_ms, self.cue_ms
            )));
        }
        if self.keys.left == self.keys.right {
            return Err(ExperimentError::Config(format!(
                "left and right response keys are both '{}'",
                self.keys.left
            )));
        }
        if self.layout.box_size.is_nan() || self.layout.box_size <= 0.0 {
            return Err(ExperimentError::Config(format!(
                "box_size must be positive, got {}",
                self.layout.box_size
            )));
        }
        if self.total_trials() == 0 {
            return Err(ExperimentError::PlanConstruction {
                valid: self.valid_trials,
                invalid: self.invalid_trials,
            });
        }
        Ok(())
    }

    pub fn total_trials(&self) -> usize {
        self.valid_trials + self.invalid_trials
    }

    /// Instruction text with the configured keys filled in.
    pub fn instructions(&self) -> String {
        self.messages
            .instructions
            .replace("{left}", &self.keys.left.name().to_uppercase())
            .replace("{right}", &self.keys.right.name().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub instructions: String,
    pub correct: String,
    pub incorrect: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            instructions: "In this task you will see a '*' appear in a box\n\
                           on the left or right. You will be shown a cue prior.\n\
                           Your task is to respond as quickly as possible when\n\
                           you see the '*' appear. Press key '{left}' for left and\n\
                           press '{right}' for right. Press any key to continue."
                .to_string(),
            correct: "Correct!".to_string(),
            incorrect: "Your response was incorrect.".to_string(),
        }
    }
}
