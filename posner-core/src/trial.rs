use crate::stimulus::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the target appears on the cued side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    pub const ALL: [Validity; 2] = [Validity::Valid, Validity::Invalid];

    /// Label written to the session log.
    pub fn label(self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::Invalid => "invalid",
        }
    }

    /// Label used on reports and charts.
    pub fn title(self) -> &'static str {
        match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A key name as reported by the input layer, lowercased (`"n"`, `"space"`).
/// Deserialized names are lowercased like `Key::new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Key(String);

impl Key {
    pub fn new(name: impl AsRef<str>) -> Self {
        Key(name.as_ref().to_lowercase())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::new(name)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

/// The two accepted response keys and the side each one reports.
///
/// Keys are named as the window layer reports them, always lowercase:
/// printable characters by their text (`"n"`, `"/"`), plus `"space"`,
/// `"return"`, `"tab"`, `"backspace"`, `"arrowleft"`, `"arrowright"`,
/// `"arrowup"` and `"arrowdown"`. `"escape"` is reserved for aborting and
/// any other named key reports `"other"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseKeys {
    pub left: Key,
    pub right: Key,
}

impl Default for ResponseKeys {
    fn default() -> Self {
        Self {
            left: Key::new("n"),
            right: Key::new("m"),
        }
    }
}

impl ResponseKeys {
    pub fn new(left: impl Into<Key>, right: impl Into<Key>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn allowed(&self) -> [Key; 2] {
        [self.left.clone(), self.right.clone()]
    }

    pub fn side_of(&self, key: &Key) -> Option<Side> {
        if *key == self.left {
            Some(Side::Left)
        } else if *key == self.right {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn key_for(&self, side: Side) -> &Key {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// What a trial presents: its validity and the side that was cued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub validity: Validity,
    pub cue_side: Side,
}

impl TrialSpec {
    pub fn new(validity: Validity, cue_side: Side) -> Self {
        Self { validity, cue_side }
    }

    /// Valid trials put the target under the cue, invalid ones opposite it.
    pub fn target_side(&self) -> Side {
        match self.validity {
            Validity::Valid => self.cue_side,
            Validity::Invalid => self.cue_side.opposite(),
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub spec: TrialSpec,
    pub target_side: Side,
    pub response: Key,
    pub reaction_time_ms: f64,
    pub correct: bool,
}

impl TrialOutcome {
    /// Scores a response captured at `response_ns` against a target committed
    /// at `target_onset_ns`. Both timestamps come from the same monotonic clock.
    pub fn score(
        spec: TrialSpec,
        response: Key,
        target_onset_ns: u64,
        response_ns: u64,
        keys: &ResponseKeys,
    ) -> Self {
        let target_side = spec.target_side();
        let correct = keys.side_of(&response) == Some(target_side);
        let reaction_time_ms = response_ns.saturating_sub(target_onset_ns) as f64 / 1_000_000.0;

        Self {
            spec,
            target_side,
            response,
            reaction_time_ms,
            correct,
        }
    }

    pub fn validity(&self) -> Validity {
        self.spec.validity
    }
}
