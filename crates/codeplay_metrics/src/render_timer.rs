//! Render timing: how long each preview load took

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RenderTimer {
    started: Option<Instant>,
    samples: RingBuffer<Duration>,
}

impl RenderTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            started: None,
            samples: RingBuffer::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Records the time since the last `begin`. Unpaired calls are ignored.
    pub fn end(&mut self) {
        if let Some(started) = self.started.take() {
            self.samples.push(started.elapsed());
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.len()
    }

    pub fn average_ms(&self) -> f64 {
        self.samples.average().as_secs_f64() * 1000.0
    }

    pub fn slowest_ms(&self) -> f64 {
        let (_, max) = self.samples.min_max();
        max.as_secs_f64() * 1000.0
    }
}

impl Default for RenderTimer {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut timer = RenderTimer::new(4);
        timer.end();
        assert_eq!(timer.samples(), 0);

        timer.begin();
        timer.end();
        assert_eq!(timer.samples(), 1);
        assert!(timer.average_ms() >= 0.0);
    }
}
