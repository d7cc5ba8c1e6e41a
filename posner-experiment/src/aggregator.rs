use posner_core::{ExperimentError, Reporter, Result, TrialOutcome, Validity};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Correct-trial reaction times for one validity class, in arrival order.
/// Incorrect trials only bump the trial count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionAccumulator {
    reaction_times_ms: Vec<f64>,
    trials: usize,
}

impl ConditionAccumulator {
    pub fn observe(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        if outcome.correct {
            self.reaction_times_ms.push(outcome.reaction_time_ms);
        }
    }

    pub fn reaction_times(&self) -> &[f64] {
        &self.reaction_times_ms
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn correct(&self) -> usize {
        self.reaction_times_ms.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.reaction_times_ms.is_empty() {
            return None;
        }
        Some(self.reaction_times_ms.iter().sum::<f64>() / self.reaction_times_ms.len() as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    valid: ConditionAccumulator,
    invalid: ConditionAccumulator,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, outcome: &TrialOutcome) {
        match outcome.validity() {
            Validity::Valid => self.valid.observe(outcome),
            Validity::Invalid => self.invalid.observe(outcome),
        }
    }

    pub fn accumulator(&self, validity: Validity) -> &ConditionAccumulator {
        match validity {
            Validity::Valid => &self.valid,
            Validity::Invalid => &self.invalid,
        }
    }

    /// Mean correct RT per condition. A condition without correct trials has
    /// no mean and is reported as an error rather than zero.
    pub fn finalize(&self) -> Result<ConditionMeans> {
        let mean_of = |condition| {
            self.accumulator(condition)
                .mean()
                .ok_or(ExperimentError::EmptyCondition { condition })
        };
        Ok(ConditionMeans {
            valid_ms: mean_of(Validity::Valid)?,
            invalid_ms: mean_of(Validity::Invalid)?,
        })
    }

    /// Descriptive statistics that exist even when a condition is empty.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            conditions: Validity::ALL
                .into_iter()
                .map(|condition| ConditionSummary::of(condition, self.accumulator(condition)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionMeans {
    pub valid_ms: f64,
    pub invalid_ms: f64,
}

impl ConditionMeans {
    pub fn labels(&self) -> [&'static str; 2] {
        [Validity::Valid.title(), Validity::Invalid.title()]
    }

    pub fn values(&self) -> [f64; 2] {
        [self.valid_ms, self.invalid_ms]
    }

    /// Invalid minus valid: the cueing benefit in milliseconds.
    pub fn validity_effect_ms(&self) -> f64 {
        self.invalid_ms - self.valid_ms
    }

    pub fn report<R: Reporter + ?Sized>(&self, reporter: &mut R) -> Result<()> {
        reporter.report_means(&self.labels(), &self.values())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub condition: Validity,
    pub trials: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
    pub mean_rt_ms: Option<f64>,
    pub min_rt_ms: Option<f64>,
    pub max_rt_ms: Option<f64>,
}

impl ConditionSummary {
    fn of(condition: Validity, acc: &ConditionAccumulator) -> Self {
        let times = acc.reaction_times();
        let accuracy = (acc.trials() > 0).then(|| acc.correct() as f64 / acc.trials() as f64);
        Self {
            condition,
            trials: acc.trials(),
            correct: acc.correct(),
            accuracy,
            mean_rt_ms: acc.mean(),
            min_rt_ms: times.iter().copied().reduce(f64::min),
            max_rt_ms: times.iter().copied().reduce(f64::max),
        }
    }
}

/// Session results: to be saved/exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub conditions: Vec<ConditionSummary>,
}

impl SessionSummary {
    pub fn condition(&self, validity: Validity) -> Option<&ConditionSummary> {
        self.conditions.iter().find(|c| c.condition == validity)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ExperimentError::io("session summary", e))?;
        self.write_to(BufWriter::new(file))?;
        info!(path = %path.display(), "session summary saved");
        Ok(())
    }

    /// Writes pretty JSON and flushes, so a failed final write is reported.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut out, self)
            .map_err(|e| ExperimentError::io("session summary", e.into()))?;
        out.flush()
            .map_err(|e| ExperimentError::io("session summary", e))
    }
}
