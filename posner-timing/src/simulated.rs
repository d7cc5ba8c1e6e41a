use crate::timer::{CalibrationStats, Timer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Virtual clock: `sleep` advances time instead of blocking. Clones share
/// the clock, so a fake surface or keyboard can stamp events on it.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTimer {
    now_ns: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    frame_times: Vec<Duration>,
}

impl SimulatedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ns: u64) -> Self {
        let timer = Self::default();
        timer.now_ns.store(ns, Ordering::SeqCst);
        timer
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Timer for SimulatedTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(d);
        }
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        self.frame_times.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.frame_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_advances_shared_clock() {
        let timer = SimulatedTimer::starting_at(1_000);
        let other = timer.clone();
        timer.sleep(Duration::from_micros(2));
        assert_eq!(other.now(), 3_000);
        assert_eq!(other.sleeps(), vec![Duration::from_micros(2)]);
    }

    #[test]
    fn sleep_since_only_waits_for_the_remainder() {
        let timer = SimulatedTimer::new();
        let start = timer.now();
        timer.advance(Duration::from_millis(30));
        timer.sleep_since(start, Duration::from_millis(50));
        assert_eq!(timer.now(), 50_000_000);
        assert_eq!(timer.sleeps(), vec![Duration::from_millis(20)]);
    }

    #[test]
    fn sleep_since_is_a_no_op_when_overdue() {
        let timer = SimulatedTimer::new();
        let start = timer.now();
        timer.advance(Duration::from_millis(80));
        timer.sleep_since(start, Duration::from_millis(50));
        assert!(timer.sleeps().is_empty());
    }
}
