//! Capability implementations used by the engine thread. Frames travel to the
//! window thread as user events; key presses come back over a channel,
//! already stamped on the shared session clock.

use posner_core::{Drawable, ExperimentError, InputCapture, Key, PresentationSurface, Result};
use posner_timing::Timer;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::trace;
use winit::event_loop::EventLoopProxy;

pub type FrameReply = std::result::Result<u64, String>;

#[derive(Debug)]
pub enum UserEvent {
    /// Show `drawables`, then send the commit timestamp (or the failure) back.
    Frame {
        drawables: Vec<Drawable>,
        reply: Sender<FrameReply>,
    },
    /// The session ended; close the window.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyPress {
    pub key: Key,
    pub at: u64,
}

/// Delivers user events to the window thread.
pub trait Deliver: Send {
    /// `false` once the receiving side is gone.
    fn deliver(&self, event: UserEvent) -> bool;
}

impl Deliver for EventLoopProxy<UserEvent> {
    fn deliver(&self, event: UserEvent) -> bool {
        self.send_event(event).is_ok()
    }
}

impl Deliver for Sender<UserEvent> {
    fn deliver(&self, event: UserEvent) -> bool {
        self.send(event).is_ok()
    }
}

pub struct WindowSurface<D: Deliver> {
    window: D,
}

impl<D: Deliver> WindowSurface<D> {
    pub fn new(window: D) -> Self {
        Self { window }
    }

    pub fn finish(&self) {
        self.window.deliver(UserEvent::Finished);
    }
}

impl<D: Deliver> PresentationSurface for WindowSurface<D> {
    fn commit_frame(&mut self, frame: &[Drawable]) -> Result<u64> {
        let (reply, committed) = mpsc::channel();
        let event = UserEvent::Frame {
            drawables: frame.to_vec(),
            reply,
        };
        if !self.window.deliver(event) {
            return Err(ExperimentError::Surface("window is closed".into()));
        }
        match committed.recv() {
            Ok(Ok(at)) => Ok(at),
            Ok(Err(msg)) => Err(ExperimentError::Surface(msg)),
            Err(_) => Err(ExperimentError::Surface(
                "window closed before the frame was shown".into(),
            )),
        }
    }
}

pub struct ChannelInput<T: Timer<Timestamp = u64>> {
    presses: Receiver<KeyPress>,
    timer: T,
}

impl<T: Timer<Timestamp = u64>> ChannelInput<T> {
    pub fn new(presses: Receiver<KeyPress>, timer: T) -> Self {
        Self { presses, timer }
    }

    /// Next press made after the wait began that `accept` takes.
    fn wait(&mut self, accept: impl Fn(&Key) -> bool) -> Result<(Key, u64)> {
        let since = self.timer.now();
        let stale = self.presses.try_iter().count();
        if stale > 0 {
            trace!(stale, "discarded buffered key presses");
        }
        loop {
            let press = self
                .presses
                .recv()
                .map_err(|_| ExperimentError::Input("window is closed".into()))?;
            if press.at < since {
                continue;
            }
            if accept(&press.key) {
                return Ok((press.key, press.at));
            }
            trace!(key = %press.key, "ignored key");
        }
    }
}

impl<T: Timer<Timestamp = u64>> InputCapture for ChannelInput<T> {
    fn wait_for_key(&mut self, allowed: &[Key]) -> Result<(Key, u64)> {
        self.wait(|key| allowed.contains(key))
    }

    fn wait_for_any_key(&mut self) -> Result<(Key, u64)> {
        self.wait(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posner_core::{ResponseKeys, Tone};
    use posner_timing::SimulatedTimer;
    use std::thread;
    use std::time::Duration;

    fn press(name: &str, at: u64) -> KeyPress {
        KeyPress {
            key: Key::new(name),
            at,
        }
    }

    #[test]
    fn surface_returns_the_window_timestamp() {
        let (tx, rx) = mpsc::channel::<UserEvent>();
        let window = thread::spawn(move || {
            let mut shown = Vec::new();
            while let Ok(event) = rx.recv() {
                match event {
                    UserEvent::Frame { drawables, reply } => {
                        shown.push(drawables);
                        reply.send(Ok(42)).unwrap();
                    }
                    UserEvent::Finished => break,
                }
            }
            shown
        });

        let mut surface = WindowSurface::new(tx);
        let frame = vec![Drawable::text("Correct!", Tone::Positive)];
        assert_eq!(surface.commit_frame(&frame).unwrap(), 42);
        surface.finish();
        assert_eq!(window.join().unwrap(), vec![frame]);
    }

    #[test]
    fn surface_reports_render_failures() {
        let (tx, rx) = mpsc::channel::<UserEvent>();
        let window = thread::spawn(move || {
            if let Ok(UserEvent::Frame { reply, .. }) = rx.recv() {
                reply.send(Err("surface lost".into())).unwrap();
            }
        });
        let mut surface = WindowSurface::new(tx);
        let err = surface.commit_frame(&[Drawable::FixationMark]).unwrap_err();
        assert!(matches!(err, ExperimentError::Surface(ref m) if m == "surface lost"));
        window.join().unwrap();
    }

    #[test]
    fn surface_fails_once_window_is_gone() {
        let (tx, rx) = mpsc::channel::<UserEvent>();
        drop(rx);
        let mut surface = WindowSurface::new(tx);
        assert!(matches!(
            surface.commit_frame(&[Drawable::FixationMark]),
            Err(ExperimentError::Surface(_))
        ));
    }

    #[test]
    fn buffered_and_unlisted_presses_do_not_end_a_wait() {
        let (tx, rx) = mpsc::channel();
        let timer = SimulatedTimer::starting_at(100);
        // Pressed before the wait and still queued.
        tx.send(press("n", 50)).unwrap();

        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            // Stamped before the wait began but delivered late.
            tx.send(press("n", 90)).unwrap();
            tx.send(press("x", 150)).unwrap();
            tx.send(press("m", 200)).unwrap();
        });

        let mut input = ChannelInput::new(rx, timer);
        let keys = ResponseKeys::default();
        let (key, at) = input.wait_for_key(&keys.allowed()).unwrap();
        assert_eq!((key, at), (Key::new("m"), 200));
        sender.join().unwrap();
    }

    #[test]
    fn any_key_accepts_the_first_fresh_press() {
        let (tx, rx) = mpsc::channel();
        tx.send(press("space", 10)).unwrap();
        tx.send(press("q", 10)).unwrap();
        let mut input = ChannelInput::new(rx, SimulatedTimer::new());
        // Both presses are already queued when the wait begins.
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.send(press("q", 30)).unwrap();
        });
        assert_eq!(input.wait_for_any_key().unwrap(), (Key::new("q"), 30));
    }

    #[test]
    fn closed_window_ends_a_wait_with_an_error() {
        let (tx, rx) = mpsc::channel::<KeyPress>();
        drop(tx);
        let mut input = ChannelInput::new(rx, SimulatedTimer::new());
        assert!(matches!(
            input.wait_for_any_key(),
            Err(ExperimentError::Input(_))
        ));
    }
}
