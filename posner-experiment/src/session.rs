use crate::aggregator::{ConditionMeans, ResultAggregator, SessionSummary};
use crate::config::ExperimentConfig;
use crate::plan::TrialPlan;
use crate::recorder::SessionRecorder;
use crate::state::TrialExecutor;
use posner_core::{
    Drawable, InputCapture, PresentationSurface, Reporter, Result, SessionPhase, Tone,
};
use posner_timing::Timer;
use rand::Rng;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// One participant's run: instructions, every planned trial in order, then
/// aggregation. Trials never overlap; each is logged before the next starts.
pub struct Session<T, R>
where
    T: Timer,
    R: Rng,
{
    pub executor: TrialExecutor<T, R>,
    aggregator: ResultAggregator,
    instructions: String,
    summary_path: Option<PathBuf>,
    phase: SessionPhase,
}

impl<T, R> Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: &ExperimentConfig, timer: T, rng: R) -> Self {
        Self {
            executor: TrialExecutor::new(config, timer, rng),
            aggregator: ResultAggregator::new(),
            instructions: config.instructions(),
            summary_path: None,
            phase: SessionPhase::default(),
        }
    }

    /// Also write the JSON summary here, before means are finalized.
    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn summary(&self) -> SessionSummary {
        self.aggregator.summary()
    }

    pub fn run<W, S, I, P>(
        &mut self,
        plan: &TrialPlan,
        mut recorder: SessionRecorder<W>,
        surface: &mut S,
        input: &mut I,
        reporter: &mut P,
    ) -> Result<ConditionMeans>
    where
        W: Write,
        S: PresentationSurface + ?Sized,
        I: InputCapture + ?Sized,
        P: Reporter + ?Sized,
    {
        if plan.is_empty() {
            warn!("trial plan is empty; nothing to present");
        } else {
            let onset = surface.commit_frame(&[Drawable::text(&self.instructions, Tone::Neutral)])?;
            info!(onset, "instructions shown");
            let (key, pressed) = input.wait_for_any_key()?;
            info!(key = %key, pressed, "instructions dismissed");
        }
        self.advance_phase();

        let total = plan.len();
        for (index, validity) in plan.iter().enumerate() {
            let outcome = self.executor.run_trial(validity, surface, input)?;
            recorder.record(&outcome)?;
            self.aggregator.observe(&outcome);
            info!(
                trial = index + 1,
                total,
                validity = %outcome.validity(),
                cue = %outcome.spec.cue_side,
                target = %outcome.target_side,
                response = %outcome.response,
                rt_ms = outcome.reaction_time_ms,
                correct = outcome.correct,
                "trial complete"
            );
        }
        self.advance_phase();

        recorder.close()?;
        if let Some(path) = &self.summary_path {
            self.aggregator.summary().save(path)?;
        }

        let means = self.aggregator.finalize()?;
        info!(
            valid_ms = means.valid_ms,
            invalid_ms = means.invalid_ms,
            effect_ms = means.validity_effect_ms(),
            "session means"
        );
        means.report(reporter)?;
        Ok(means)
    }

    fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            info!(from = ?self.phase, to = ?next, "session phase");
            self.phase = next;
        }
    }
}
