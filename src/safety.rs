//! Safety supervisor.
//!
//! The supervisor runs **every controller cycle before the search logic**
//! and decides whether the infant's readings call for an immediate retreat
//! to the gentlest actuation.
//!
//! ## Panic conditions
//!
//! | Cause               | Condition                                   |
//! |---------------------|---------------------------------------------|
//! | `SuddenSpike`       | `last_hb > 0` and `bpm − last_hb ≥ 30`      |
//! | `VeryHighHeartRate` | `bpm ≥ 230`                                 |
//! | `HighRateSpike`     | `bpm ≥ 220` and a sudden spike              |
//! | `CryingOverload`    | `cry ≥ 100` and `bpm ≥ 200`                 |
//!
//! ## Latch
//!
//! Unlike a recoverable fault, panic is **sticky**: once any condition
//! fires the supervisor stays latched for its whole lifetime and later
//! readings are ignored. The only way out is a fresh supervisor, i.e. a
//! controller restart.

use core::fmt;

use log::error;

use crate::config::SafetyConfig;

/// Which condition latched the panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicCause {
    VeryHighHeartRate { bpm: u8 },
    HighRateSpike { from: u8, to: u8 },
    SuddenSpike { from: u8, to: u8 },
    CryingOverload { bpm: u8, cry: u8 },
}

impl fmt::Display for PanicCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryHighHeartRate { bpm } => write!(f, "very high heart rate ({bpm} bpm)"),
            Self::HighRateSpike { from, to } => {
                write!(f, "spike into high heart rate ({from} -> {to} bpm)")
            }
            Self::SuddenSpike { from, to } => write!(f, "sudden heart-rate spike ({from} -> {to} bpm)"),
            Self::CryingOverload { bpm, cry } => {
                write!(f, "crying overload (cry {cry}, {bpm} bpm)")
            }
        }
    }
}

/// Sticky panic supervisor.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    config: SafetyConfig,
    latched: Option<PanicCause>,
}

impl SafetySupervisor {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            config: config.clone(),
            latched: None,
        }
    }

    /// Evaluate the latest readings against the previous heart rate.
    ///
    /// Returns the latched cause, which never changes once set.
    pub fn evaluate(&mut self, bpm: u8, cry: u8, last_hb: u8) -> Option<PanicCause> {
        if self.latched.is_none() {
            if let Some(cause) = self.check(bpm, cry, last_hb) {
                error!("SAFETY PANIC LATCHED: {cause}");
                self.latched = Some(cause);
            }
        }
        self.latched
    }

    pub fn is_panicked(&self) -> bool {
        self.latched.is_some()
    }

    pub fn cause(&self) -> Option<PanicCause> {
        self.latched
    }

    fn check(&self, bpm: u8, cry: u8, last_hb: u8) -> Option<PanicCause> {
        let c = &self.config;
        let spike = last_hb > 0 && bpm.saturating_sub(last_hb) >= c.spike_bpm;

        if bpm >= c.very_high_bpm {
            Some(PanicCause::VeryHighHeartRate { bpm })
        } else if spike && bpm >= c.high_spike_bpm {
            Some(PanicCause::HighRateSpike { from: last_hb, to: bpm })
        } else if spike {
            Some(PanicCause::SuddenSpike { from: last_hb, to: bpm })
        } else if cry >= c.overload_cry && bpm >= c.overload_bpm {
            Some(PanicCause::CryingOverload { bpm, cry })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> SafetySupervisor {
        SafetySupervisor::new(&SafetyConfig::default())
    }

    #[test]
    fn calm_readings_do_not_panic() {
        let mut s = supervisor();
        assert_eq!(s.evaluate(120, 40, 110), None);
        assert_eq!(s.evaluate(199, 100, 190), None);
        assert!(!s.is_panicked());
    }

    #[test]
    fn first_reading_cannot_spike() {
        let mut s = supervisor();
        assert_eq!(s.evaluate(180, 0, 0), None);
    }

    #[test]
    fn very_high_rate_panics_without_history() {
        let mut s = supervisor();
        assert_eq!(
            s.evaluate(240, 0, 0),
            Some(PanicCause::VeryHighHeartRate { bpm: 240 })
        );
    }

    #[test]
    fn spike_of_thirty_panics() {
        let mut s = supervisor();
        assert_eq!(
            s.evaluate(130, 0, 100),
            Some(PanicCause::SuddenSpike { from: 100, to: 130 })
        );

        let mut s = supervisor();
        assert_eq!(s.evaluate(129, 0, 100), None);
    }

    #[test]
    fn spike_into_high_rate_is_reported_as_such() {
        let mut s = supervisor();
        assert_eq!(
            s.evaluate(222, 0, 190),
            Some(PanicCause::HighRateSpike { from: 190, to: 222 })
        );
    }

    #[test]
    fn crying_overload_needs_both_signals() {
        let mut s = supervisor();
        assert_eq!(s.evaluate(199, 100, 195), None);
        assert_eq!(
            s.evaluate(200, 100, 199),
            Some(PanicCause::CryingOverload { bpm: 200, cry: 100 })
        );
    }

    #[test]
    fn latch_is_sticky() {
        let mut s = supervisor();
        let cause = s.evaluate(235, 0, 0);
        assert!(cause.is_some());
        assert_eq!(s.evaluate(70, 0, 235), cause);
        assert_eq!(s.evaluate(60, 0, 70), cause);
        assert_eq!(s.cause(), cause);
    }
}
