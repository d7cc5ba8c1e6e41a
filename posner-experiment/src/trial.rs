use crate::config::ExperimentConfig;
use posner_core::{Key, Side, TrialOutcome, TrialSpec, TrialState, Validity};
use std::time::Duration;

/// In-flight trial. Fields fill in as the state machine advances.
#[derive(Debug, Clone)]
pub struct Trial {
    pub id: usize,
    pub validity: Validity,
    pub cue_side: Option<Side>,
    pub durations: TrialDurations,
    pub timestamps: TrialTimestamps,
    pub response: Option<Key>,
    pub outcome: Option<TrialOutcome>,
    pub state: TrialState,
}

impl Trial {
    pub fn new(id: usize, validity: Validity, durations: TrialDurations) -> Self {
        Self {
            id,
            validity,
            cue_side: None,
            durations,
            timestamps: TrialTimestamps::default(),
            response: None,
            outcome: None,
            state: TrialState::Fixation,
        }
    }

    /// Known once the cue side has been drawn.
    pub fn spec(&self) -> Option<TrialSpec> {
        self.cue_side.map(|cue| TrialSpec::new(self.validity, cue))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialDurations {
    pub fixation: Duration,
    pub cue: Duration,
    /// Cue offset to target onset, so cue plus delay equals the SOA.
    pub delay: Duration,
    pub feedback: Duration,
}

impl TrialDurations {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            fixation: Duration::from_millis(config.fixation_ms),
            cue: Duration::from_millis(config.cue_ms),
            delay: Duration::from_millis(config.soa_ms.saturating_sub(config.cue_ms)),
            feedback: Duration::from_millis(config.feedback_ms),
        }
    }

    pub fn soa(&self) -> Duration {
        self.cue + self.delay
    }
}

/// Frame commit and key press times, nanoseconds on the session clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialTimestamps {
    pub fixation_onset: Option<u64>,
    pub cue_onset: Option<u64>,
    pub delay_onset: Option<u64>,
    pub target_onset: Option<u64>,
    pub response: Option<u64>,
    pub feedback_onset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_fills_the_rest_of_the_soa() {
        let durations = TrialDurations::from_config(&ExperimentConfig::default());
        assert_eq!(durations.delay, Duration::from_millis(650));
        assert_eq!(durations.soa(), Duration::from_millis(700));
    }

    #[test]
    fn spec_unknown_before_cue() {
        let mut trial = Trial::new(
            0,
            Validity::Invalid,
            TrialDurations::from_config(&ExperimentConfig::default()),
        );
        assert!(trial.spec().is_none());
        trial.cue_side = Some(Side::Left);
        assert_eq!(trial.spec().map(|s| s.target_side()), Some(Side::Right));
    }
}
