use std::time::Duration;

/// Time accumulator limiting emissions to a target rate
///
/// Each callback adds the time since the previous one. Once the total
/// reaches the interval a frame is emitted and the remainder is carried
/// over, so jitter does not pull the long-run rate down. Whole intervals
/// missed during a stall are discarded rather than emitted as a burst.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    accumulated: Duration,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            accumulated: Duration::ZERO,
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advance by `delta`; true when a frame should be emitted
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.accumulated += delta;
        if self.accumulated < self.interval {
            return false;
        }

        let remainder = self.accumulated.as_nanos() % self.interval.as_nanos();
        self.accumulated = Duration::from_nanos(remainder as u64);
        true
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}
