use super::config::{ExperimentConfig, Messages};
use super::trial::{Trial, TrialDurations};
use posner_core::{
    Drawable, ExperimentError, InputCapture, PresentationSurface, ResponseKeys, Result, Side, Tone,
    TrialOutcome, TrialSpec, TrialState, Validity,
};
use posner_timing::Timer;
use rand::Rng;
use tracing::{debug, trace};

/// Drives one trial at a time through fixation, cue, delay, target, response
/// and feedback. Holds are measured from each frame's commit timestamp.
pub struct TrialExecutor<T, R>
where
    T: Timer,
    R: Rng,
{
    pub timer: T,
    pub rng: R,
    pub durations: TrialDurations,
    pub keys: ResponseKeys,
    pub messages: Messages,
    pub trial_number: usize,
}

impl<T, R> TrialExecutor<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: &ExperimentConfig, timer: T, rng: R) -> Self {
        Self {
            timer,
            rng,
            durations: TrialDurations::from_config(config),
            keys: config.keys.clone(),
            messages: config.messages.clone(),
            trial_number: 0,
        }
    }

    pub fn start_trial(&mut self, validity: Validity) -> Trial {
        let trial = Trial::new(self.trial_number, validity, self.durations.clone());
        self.trial_number += 1;
        trial
    }

    /// Runs a trial to completion. Blocks for the holds and, without any
    /// timeout, for the participant's key press.
    pub fn run_trial<S, I>(
        &mut self,
        validity: Validity,
        surface: &mut S,
        input: &mut I,
    ) -> Result<TrialOutcome>
    where
        S: PresentationSurface + ?Sized,
        I: InputCapture + ?Sized,
    {
        let mut trial = self.start_trial(validity);
        while !trial.state.is_complete() {
            self.step(&mut trial, surface, input)?;
        }
        trial.outcome.ok_or_else(|| {
            ExperimentError::Input(format!("trial {} finished without a response", trial.id))
        })
    }

    /// Performs the current phase and moves the trial to the next one.
    pub fn step<S, I>(&mut self, trial: &mut Trial, surface: &mut S, input: &mut I) -> Result<()>
    where
        S: PresentationSurface + ?Sized,
        I: InputCapture + ?Sized,
    {
        match trial.state {
            TrialState::Fixation => {
                let onset = surface.commit_frame(&Drawable::placeholders(None))?;
                trial.timestamps.fixation_onset = Some(onset);
                debug!(trial = trial.id, onset, "fixation");
                self.timer.sleep_since(onset, trial.durations.fixation);
            }
            TrialState::Cue => {
                let cue = self.cue_side(trial);
                let onset = surface.commit_frame(&Drawable::placeholders(Some(cue)))?;
                trial.timestamps.cue_onset = Some(onset);
                debug!(trial = trial.id, onset, cue = %cue, "cue");
                self.timer.sleep_since(onset, trial.durations.cue);
            }
            TrialState::Delay => {
                let onset = surface.commit_frame(&Drawable::placeholders(None))?;
                trial.timestamps.delay_onset = Some(onset);
                debug!(trial = trial.id, onset, "delay");
                // Anchored on the cue so that cue onset to target onset is one SOA.
                let cue_onset = trial.timestamps.cue_onset.unwrap_or(onset);
                self.timer.sleep_since(cue_onset, trial.durations.soa());
            }
            TrialState::Target => {
                let spec = TrialSpec::new(trial.validity, self.cue_side(trial));
                let mut frame = Drawable::placeholders(None);
                frame.push(Drawable::TargetMarker(spec.target_side()));
                let onset = surface.commit_frame(&frame)?;
                trial.timestamps.target_onset = Some(onset);
                debug!(trial = trial.id, onset, target = %spec.target_side(), "target");
            }
            TrialState::Response => {
                let (key, pressed) = input.wait_for_key(&self.keys.allowed())?;
                trace!(trial = trial.id, key = %key, pressed, "key");
                let spec = TrialSpec::new(trial.validity, self.cue_side(trial));
                let onset = trial.timestamps.target_onset.unwrap_or(pressed);
                trial.timestamps.response = Some(pressed);
                trial.response = Some(key.clone());
                trial.outcome = Some(TrialOutcome::score(spec, key, onset, pressed, &self.keys));
            }
            TrialState::Feedback => {
                let correct = trial.outcome.as_ref().is_some_and(|o| o.correct);
                let message = if correct {
                    Drawable::text(&self.messages.correct, Tone::Positive)
                } else {
                    Drawable::text(&self.messages.incorrect, Tone::Negative)
                };
                let onset = surface.commit_frame(&[message])?;
                trial.timestamps.feedback_onset = Some(onset);
                debug!(trial = trial.id, onset, correct, "feedback");
                self.timer.sleep_since(onset, trial.durations.feedback);
            }
            TrialState::Complete => return Ok(()),
        }

        if let Some(next) = trial.state.next() {
            trial.state = next;
        }
        Ok(())
    }

    /// Cue side for the trial, drawn uniformly the first time it is asked for.
    fn cue_side(&mut self, trial: &mut Trial) -> Side {
        *trial.cue_side.get_or_insert_with(|| draw_side(&mut self.rng))
    }
}

/// Independent fair coin flip, uncorrelated with validity.
pub fn draw_side<R: Rng + ?Sized>(rng: &mut R) -> Side {
    if rng.random_bool(0.5) {
        Side::Left
    } else {
        Side::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posner_core::Key;
    use posner_timing::SimulatedTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    struct Screen {
        timer: SimulatedTimer,
        frames: Vec<(u64, Vec<Drawable>)>,
    }

    impl PresentationSurface for Screen {
        fn commit_frame(&mut self, frame: &[Drawable]) -> Result<u64> {
            let now = self.timer.now();
            self.frames.push((now, frame.to_vec()));
            Ok(now)
        }
    }

    /// Answers every wait with a fixed key after a fixed latency.
    struct Responder {
        timer: SimulatedTimer,
        key: Key,
        latency: Duration,
    }

    impl InputCapture for Responder {
        fn wait_for_key(&mut self, allowed: &[Key]) -> Result<(Key, u64)> {
            assert!(allowed.contains(&self.key));
            self.timer.advance(self.latency);
            Ok((self.key.clone(), self.timer.now()))
        }

        fn wait_for_any_key(&mut self) -> Result<(Key, u64)> {
            let key = self.key.clone();
            self.wait_for_key(&[key])
        }
    }

    fn harness(key: &str) -> (TrialExecutor<SimulatedTimer, StdRng>, Screen, Responder) {
        let timer = SimulatedTimer::new();
        let executor =
            TrialExecutor::new(&ExperimentConfig::default(), timer.clone(), StdRng::seed_from_u64(5));
        let screen = Screen {
            timer: timer.clone(),
            frames: Vec::new(),
        };
        let responder = Responder {
            timer,
            key: Key::new(key),
            latency: Duration::from_millis(350),
        };
        (executor, screen, responder)
    }

    fn target_of(frame: &[Drawable]) -> Option<Side> {
        frame.iter().find_map(|d| match d {
            Drawable::TargetMarker(side) => Some(*side),
            _ => None,
        })
    }

    fn cue_of(frame: &[Drawable]) -> Option<Side> {
        frame.iter().find_map(|d| match d {
            Drawable::Box {
                side,
                highlighted: true,
            } => Some(*side),
            _ => None,
        })
    }

    #[test]
    fn phases_commit_five_frames_with_reference_timing() {
        let (mut executor, mut screen, mut input) = harness("n");
        let outcome = executor
            .run_trial(Validity::Valid, &mut screen, &mut input)
            .unwrap();

        let onsets: Vec<u64> = screen.frames.iter().map(|(t, _)| *t).collect();
        assert_eq!(onsets.len(), 5);
        assert_eq!(onsets[1] - onsets[0], 1_500_000_000);
        assert_eq!(onsets[2] - onsets[1], 50_000_000);
        assert_eq!(onsets[3] - onsets[1], 700_000_000);
        assert_eq!(onsets[4] - onsets[3], 350_000_000);
        assert_eq!(outcome.reaction_time_ms, 350.0);
        assert_eq!(
            executor.timer.sleeps().last(),
            Some(&Duration::from_millis(2000))
        );
    }

    #[test]
    fn frames_show_cue_then_target_on_mapped_side() {
        for validity in Validity::ALL {
            let (mut executor, mut screen, mut input) = harness("m");
            let outcome = executor
                .run_trial(validity, &mut screen, &mut input)
                .unwrap();

            let cue = cue_of(&screen.frames[1].1).unwrap();
            assert_eq!(cue, outcome.spec.cue_side);
            assert_eq!(cue_of(&screen.frames[0].1), None);
            assert_eq!(cue_of(&screen.frames[2].1), None);
            let target = target_of(&screen.frames[3].1).unwrap();
            assert_eq!(target, outcome.target_side);
            assert_eq!(target, TrialSpec::new(validity, cue).target_side());
            assert_eq!(outcome.correct, target == Side::Right);
        }
    }

    #[test]
    fn feedback_tone_follows_correctness() {
        let (mut executor, mut screen, mut input) = harness("n");
        let outcome = executor
            .run_trial(Validity::Valid, &mut screen, &mut input)
            .unwrap();
        let expected = if outcome.correct {
            Drawable::text("Correct!", Tone::Positive)
        } else {
            Drawable::text("Your response was incorrect.", Tone::Negative)
        };
        assert_eq!(screen.frames[4].1, vec![expected]);
    }

    #[test]
    fn stepping_walks_every_state_once() {
        let (mut executor, mut screen, mut input) = harness("n");
        let mut trial = executor.start_trial(Validity::Invalid);
        let mut states = vec![trial.state];
        while !trial.state.is_complete() {
            executor.step(&mut trial, &mut screen, &mut input).unwrap();
            states.push(trial.state);
        }
        assert_eq!(states.len(), 7);
        assert!(trial.timestamps.response > trial.timestamps.target_onset);
        assert_eq!(executor.trial_number, 1);
    }

    #[test]
    fn cue_sides_are_roughly_balanced() {
        let mut rng = StdRng::seed_from_u64(11);
        let lefts = (0..1000)
            .filter(|_| draw_side(&mut rng) == Side::Left)
            .count();
        assert!((400..600).contains(&lefts), "{lefts} lefts out of 1000");
    }

    #[test]
    fn surface_failure_aborts_the_trial() {
        struct Broken;
        impl PresentationSurface for Broken {
            fn commit_frame(&mut self, _frame: &[Drawable]) -> Result<u64> {
                Err(ExperimentError::Surface("window closed".into()))
            }
        }
        let (mut executor, _, mut input) = harness("n");
        let err = executor
            .run_trial(Validity::Valid, &mut Broken, &mut input)
            .unwrap_err();
        assert!(matches!(err, ExperimentError::Surface(_)));
    }
}
