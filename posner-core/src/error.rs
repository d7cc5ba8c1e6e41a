use crate::trial::Validity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

/// Failures that abort a session. Nothing is retried.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// A condition finished without a single correct trial, so it has no mean.
    #[error("no correct {condition} trials were recorded; mean reaction time is undefined")]
    EmptyCondition { condition: Validity },

    #[error("trial plan must contain at least one trial (valid: {valid}, invalid: {invalid})")]
    PlanConstruction { valid: usize, invalid: usize },

    #[error("{capability}: {source}")]
    Io {
        capability: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("presentation surface failed: {0}")]
    Surface(String),

    #[error("input capture failed: {0}")]
    Input(String),

    #[error("reporter failed: {0}")]
    Report(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExperimentError {
    pub fn io(capability: &'static str, source: std::io::Error) -> Self {
        ExperimentError::Io { capability, source }
    }
}
