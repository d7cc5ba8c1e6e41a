#![allow(dead_code)]

use posner_core::{
    Drawable, InputCapture, Key, PresentationSurface, Reporter, ResponseKeys, Result, Side,
};
use posner_timing::{SimulatedTimer, Timer};
use rand::RngCore;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

/// Everything the engine did, in order, across all fakes.
pub type Journal = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Frame(u64, Vec<Drawable>),
    Key(Key, u64),
    LogLine(String),
}

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn frames(journal: &Journal) -> Vec<(u64, Vec<Drawable>)> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Frame(t, f) => Some((*t, f.clone())),
            _ => None,
        })
        .collect()
}

pub fn log_lines(journal: &Journal) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::LogLine(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

pub fn target_in(frame: &[Drawable]) -> Option<Side> {
    frame.iter().find_map(|d| match d {
        Drawable::TargetMarker(side) => Some(*side),
        _ => None,
    })
}

pub fn cue_in(frame: &[Drawable]) -> Option<Side> {
    frame.iter().find_map(|d| match d {
        Drawable::Box {
            side,
            highlighted: true,
        } => Some(*side),
        _ => None,
    })
}

pub struct FakeSurface {
    pub timer: SimulatedTimer,
    pub journal: Journal,
}

impl PresentationSurface for FakeSurface {
    fn commit_frame(&mut self, frame: &[Drawable]) -> Result<u64> {
        let now = self.timer.now();
        self.journal
            .borrow_mut()
            .push(Event::Frame(now, frame.to_vec()));
        Ok(now)
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Press(&'static str),
    /// The key for the side the last target appeared on.
    Correct,
    /// The key for the other side.
    Wrong,
}

/// Answers key waits from a script, each after `latency`. Once the script
/// runs out every wait is answered correctly.
pub struct FakeParticipant {
    pub timer: SimulatedTimer,
    pub journal: Journal,
    pub keys: ResponseKeys,
    pub script: VecDeque<Answer>,
    pub latency: Duration,
}

impl FakeParticipant {
    fn last_target(&self) -> Option<Side> {
        self.journal.borrow().iter().rev().find_map(|e| match e {
            Event::Frame(_, frame) => target_in(frame),
            _ => None,
        })
    }

    fn press(&mut self, key: Key) -> (Key, u64) {
        self.timer.advance(self.latency);
        let now = self.timer.now();
        self.journal.borrow_mut().push(Event::Key(key.clone(), now));
        (key, now)
    }
}

impl InputCapture for FakeParticipant {
    fn wait_for_key(&mut self, allowed: &[Key]) -> Result<(Key, u64)> {
        let target = self.last_target().unwrap_or(Side::Left);
        let key = match self.script.pop_front().unwrap_or(Answer::Correct) {
            Answer::Press(name) => Key::new(name),
            Answer::Correct => self.keys.key_for(target).clone(),
            Answer::Wrong => self.keys.key_for(target.opposite()).clone(),
        };
        assert!(allowed.contains(&key), "{key} is not an accepted key");
        Ok(self.press(key))
    }

    fn wait_for_any_key(&mut self) -> Result<(Key, u64)> {
        Ok(self.press(Key::new("space")))
    }
}

/// Session log sink that journals each completed line.
pub struct JournalWriter {
    pub journal: Journal,
    pending: Vec<u8>,
}

impl JournalWriter {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            pending: Vec::new(),
        }
    }
}

impl Write for JournalWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.journal.borrow_mut().push(Event::LogLine(line));
                self.pending.clear();
            } else {
                self.pending.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Rng whose fair coin flips come out as the scripted cue sides
/// (heads is left).
pub struct ScriptedCues(pub VecDeque<Side>);

impl ScriptedCues {
    pub fn new(sides: impl IntoIterator<Item = Side>) -> Self {
        Self(sides.into_iter().collect())
    }
}

impl RngCore for ScriptedCues {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        match self.0.pop_front() {
            Some(Side::Left) | None => 0,
            Some(Side::Right) => u64::MAX,
        }
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

#[derive(Default)]
pub struct CollectingReporter {
    pub calls: Vec<(Vec<String>, Vec<f64>)>,
}

impl Reporter for CollectingReporter {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> Result<()> {
        self.calls.push((
            labels.iter().map(|l| l.to_string()).collect(),
            values.to_vec(),
        ));
        Ok(())
    }
}

pub struct Rig {
    pub timer: SimulatedTimer,
    pub journal: Journal,
    pub surface: FakeSurface,
    pub participant: FakeParticipant,
    pub reporter: CollectingReporter,
}

impl Rig {
    pub fn new(timer: SimulatedTimer, script: impl IntoIterator<Item = Answer>) -> Self {
        let journal = journal();
        Self {
            surface: FakeSurface {
                timer: timer.clone(),
                journal: journal.clone(),
            },
            participant: FakeParticipant {
                timer: timer.clone(),
                journal: journal.clone(),
                keys: ResponseKeys::default(),
                script: script.into_iter().collect(),
                latency: Duration::from_millis(350),
            },
            reporter: CollectingReporter::default(),
            timer,
            journal,
        }
    }

    pub fn answering_correctly(timer: SimulatedTimer) -> Self {
        Self::new(timer, std::iter::empty())
    }

    pub fn writer(&self) -> JournalWriter {
        JournalWriter::new(self.journal.clone())
    }
}
