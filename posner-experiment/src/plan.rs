use posner_core::{ExperimentError, Result, Validity};
use rand::Rng;
use rand::seq::SliceRandom;

/// Ordered validity sequence for one session. Cue sides are not part of the
/// plan; they are drawn per trial when the cue is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialPlan {
    trials: Vec<Validity>,
}

impl TrialPlan {
    /// Exactly `valid` valid and `invalid` invalid entries in uniformly random
    /// order. An empty plan is allowed and runs as a no-op session.
    pub fn shuffled<R: Rng + ?Sized>(valid: usize, invalid: usize, rng: &mut R) -> Self {
        let mut trials = Self::unshuffled(valid, invalid);
        trials.shuffle(rng);
        Self { trials }
    }

    /// Like [`TrialPlan::shuffled`] but refuses a plan with no trials.
    pub fn build<R: Rng + ?Sized>(valid: usize, invalid: usize, rng: &mut R) -> Result<Self> {
        if valid + invalid == 0 {
            return Err(ExperimentError::PlanConstruction { valid, invalid });
        }
        Ok(Self::shuffled(valid, invalid, rng))
    }

    fn unshuffled(valid: usize, invalid: usize) -> Vec<Validity> {
        std::iter::repeat_n(Validity::Valid, valid)
            .chain(std::iter::repeat_n(Validity::Invalid, invalid))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn count(&self, validity: Validity) -> usize {
        self.trials.iter().filter(|v| **v == validity).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Validity> + '_ {
        self.trials.iter().copied()
    }

    pub fn as_slice(&self) -> &[Validity] {
        &self.trials
    }
}

impl From<Vec<Validity>> for TrialPlan {
    /// A fixed order, for replaying a known sequence.
    fn from(trials: Vec<Validity>) -> Self {
        Self { trials }
    }
}
