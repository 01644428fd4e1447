//! Cancellable debounce timer
//!
//! A `Debouncer` holds at most one deadline. Triggering again before it
//! passes pushes the deadline out, so a burst of triggers fires once.

use std::time::Duration;

use crate::time::Timestamp;

/// Quiescent interval for the render and autosave debouncers.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Timestamp>,
    fired: u64,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Restarts the quiescent window at `now`.
    pub fn trigger(&mut self, now: Timestamp) {
        self.deadline = Some(now + self.interval);
    }

    /// Schedules an explicit deadline, replacing any pending one.
    pub fn schedule_at(&mut self, deadline: Timestamp) {
        self.deadline = Some(deadline);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Returns `true` once when the deadline has been reached, then disarms.
    pub fn fire_if_due(&mut self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// How many times this timer has fired.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_fires_once() {
        let mut timer = Debouncer::default();
        for ms in [0, 100, 200, 300, 400] {
            timer.trigger(Timestamp::from_millis(ms));
            assert!(!timer.fire_if_due(Timestamp::from_millis(ms)));
        }
        assert!(!timer.fire_if_due(Timestamp::from_millis(899)));
        assert!(timer.fire_if_due(Timestamp::from_millis(900)));
        assert!(!timer.fire_if_due(Timestamp::from_millis(5_000)));
        assert_eq!(timer.fired_count(), 1);
    }

    #[test]
    fn test_spaced_triggers_fire_each_time() {
        let mut timer = Debouncer::default();
        let mut fired = 0;
        for i in 0..4u64 {
            let start = i * 600;
            timer.trigger(Timestamp::from_millis(start));
            if timer.fire_if_due(Timestamp::from_millis(start + 550)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_cancel_disarms() {
        let mut timer = Debouncer::new(Duration::from_millis(10));
        timer.trigger(Timestamp::ZERO);
        timer.cancel();
        assert!(!timer.is_pending());
        assert!(!timer.fire_if_due(Timestamp::from_millis(100)));
    }
}
