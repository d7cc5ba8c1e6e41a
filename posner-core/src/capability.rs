//! Collaborators the trial engine drives but does not implement.
//!
//! Every call is synchronous and may block the calling thread: frame commits
//! until the frame is on screen, key waits until a permitted key arrives.
//! Timestamps are nanoseconds on the session's monotonic clock.

use crate::error::Result;
use crate::stimulus::Drawable;
use crate::trial::Key;

pub trait PresentationSurface {
    /// Replaces the visible frame with `frame` and returns the commit timestamp.
    fn commit_frame(&mut self, frame: &[Drawable]) -> Result<u64>;
}

pub trait InputCapture {
    /// Blocks until one of `allowed` is pressed. Presses that happened before
    /// the call, and keys outside `allowed`, never end the wait.
    fn wait_for_key(&mut self, allowed: &[Key]) -> Result<(Key, u64)>;

    /// Blocks until any key is pressed.
    fn wait_for_any_key(&mut self) -> Result<(Key, u64)>;
}

pub trait Reporter {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> Result<()> {
        (**self).report_means(labels, values)
    }
}

impl<R: Reporter> Reporter for Vec<R> {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> Result<()> {
        for reporter in self.iter_mut() {
            reporter.report_means(labels, values)?;
        }
        Ok(())
    }
}
