//! Clock adapters.
//!
//! - [`MonotonicClock`] wraps `std::time::Instant` for real nodes.
//! - [`ManualClock`] is a shared, hand-advanced clock: `sleep` moves time
//!   forward instantly. It drives the offline simulation and single-threaded
//!   bus tests without real waiting.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::app::ports::ClockPort;

/// Wall-clock monotonic time since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get().saturating_add(d));
    }

    pub fn set(&self, t: Duration) {
        self.now.set(t);
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::Deadline;

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.sleep(Duration::from_millis(15));
        assert_eq!(b.now(), Duration::from_millis(15));
    }

    #[test]
    fn deadline_expires_on_manual_clock() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(20));
        clock.advance(Duration::from_millis(19));
        assert!(!deadline.expired(&clock));
        assert_eq!(deadline.remaining(&clock), Duration::from_millis(1));
        clock.advance(Duration::from_millis(1));
        assert!(deadline.expired(&clock));
        assert_eq!(deadline.remaining(&clock), Duration::ZERO);
    }

    #[test]
    fn monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= t0 + Duration::from_millis(2));
    }
}
