/// Timed phases of a single cueing trial, strictly sequential.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Fixation,
    Cue,
    Delay,
    Target,
    Response,
    Feedback,
    Complete,
}

impl TrialState {
    /// Only the response phase waits on the keyboard.
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::Response)
    }

    pub fn next(&self) -> Option<Self> {
        use TrialState::*;
        Some(match self {
            Fixation => Cue,
            Cue => Delay,
            Delay => Target,
            Target => Response,
            Response => Feedback,
            Feedback => Complete,
            Complete => return None,
        })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Coarse phases of a whole session.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Instructions,
    Trials,
    Debrief,
}

impl SessionPhase {
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Instructions => Trials,
            Trials => Debrief,
            Debrief => return None,
        })
    }

    pub fn is_instructions(&self) -> bool {
        matches!(self, Self::Instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_states_run_in_order_without_branching_back() {
        let mut state = TrialState::default();
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(
            seen,
            vec![
                TrialState::Fixation,
                TrialState::Cue,
                TrialState::Delay,
                TrialState::Target,
                TrialState::Response,
                TrialState::Feedback,
                TrialState::Complete,
            ]
        );
        assert!(state.is_complete());
    }

    #[test]
    fn only_response_accepts_input() {
        let accepting: Vec<_> = [
            TrialState::Fixation,
            TrialState::Cue,
            TrialState::Delay,
            TrialState::Target,
            TrialState::Response,
            TrialState::Feedback,
            TrialState::Complete,
        ]
        .into_iter()
        .filter(TrialState::accepts_input)
        .collect();
        assert_eq!(accepting, vec![TrialState::Response]);
    }

    #[test]
    fn session_phases_end_at_debrief() {
        assert!(SessionPhase::default().is_instructions());
        assert_eq!(SessionPhase::Instructions.next(), Some(SessionPhase::Trials));
        assert_eq!(SessionPhase::Trials.next(), Some(SessionPhase::Debrief));
        assert_eq!(SessionPhase::Debrief.next(), None);
    }
}
