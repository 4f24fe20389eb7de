//! Profiling timer

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Records how long named sections take.
///
/// Sections are opened with [`Timer::begin`] and closed with [`Timer::end`];
/// closed sections are kept in completion order.
pub struct Timer {
    origin: Instant,
    state: Mutex<TimerState>,
}

#[derive(Default)]
struct TimerState {
    open: HashMap<String, Instant>,
    finished: Vec<(String, Duration)>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(TimerState::default()),
        }
    }

    pub fn begin(&self, key: &str) {
        self.state.lock().open.insert(key.to_string(), Instant::now());
    }

    /// Close `key`, returning its duration. `None` if it was never begun.
    pub fn end(&self, key: &str) -> Option<Duration> {
        let mut state = self.state.lock();
        let started = state.open.remove(key)?;
        let elapsed = started.elapsed();
        state.finished.push((key.to_string(), elapsed));
        Some(elapsed)
    }

    pub fn times(&self) -> Vec<(String, Duration)> {
        self.state.lock().finished.clone()
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.state.lock().open.contains_key(key)
    }

    /// Time since the timer was created
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_end() {
        let timer = Timer::new();
        timer.begin("boot");
        assert!(timer.is_open("boot"));
        assert!(timer.end("boot").is_some());
        assert!(!timer.is_open("boot"));
        assert_eq!(timer.times().len(), 1);
        assert_eq!(timer.times()[0].0, "boot");
    }

    #[test]
    fn test_end_without_begin() {
        let timer = Timer::default();
        assert!(timer.end("never").is_none());
        assert!(timer.times().is_empty());
    }
}
