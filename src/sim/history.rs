//! Time-stamped stress history with delayed, interpolated reads.

use std::collections::VecDeque;

/// Timestamps closer than this are treated as equal.
const EPS: f64 = 1e-6;

/// Smallest remaining time worth another sub-step.
const MIN_STEP: f64 = 1e-9;

/// Bounded `(t, S)` history. The oldest sample is dropped when full.
#[derive(Debug, Clone)]
pub struct StressHistory {
    samples: VecDeque<(f64, f64)>,
    capacity: usize,
    sample_dt: f64,
    now: f64,
}

impl StressHistory {
    pub fn new(capacity: usize, sample_dt: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sample_dt,
            now: 0.0,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Record `stress` at the current time.
    pub fn record(&mut self, stress: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((self.now, stress));
    }

    /// Move time forward by `dt`, recording `stress` every `sample_dt`.
    pub fn advance(&mut self, dt: f64, stress: f64) {
        let mut remain = dt;
        while remain > MIN_STEP {
            let step = remain.min(self.sample_dt);
            self.now += step;
            self.record(stress);
            remain -= step;
        }
    }

    /// Step time forward by `by` so the next sample gets its own timestamp.
    pub fn nudge(&mut self, by: f64, stress: f64) {
        self.now += by;
        self.record(stress);
    }

    /// Stress at `now - tau`, linearly interpolated between the bracketing
    /// samples and clamped to the oldest/newest sample outside the history.
    pub fn delayed(&self, now: f64, tau: f64) -> Option<f64> {
        let &(t_first, s_first) = self.samples.front()?;
        let &(t_last, s_last) = self.samples.back()?;
        let target = now - tau;

        if target <= t_first + EPS {
            return Some(s_first);
        }
        if target >= t_last - EPS {
            return Some(s_last);
        }

        // First sample at or after the target; the clamps above keep it in 1..len.
        let i1 = self.samples.partition_point(|&(t, _)| t < target);
        let (t0, s0) = self.samples[i1 - 1];
        let (t1, s1) = self.samples[i1];

        if (t1 - target).abs() <= EPS {
            return Some(s1);
        }
        if (t0 - target).abs() <= EPS {
            return Some(s0);
        }
        Some(lerp(t0, s0, t1, s1, target))
    }
}

fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < 1e-12 {
        return y0;
    }
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}
