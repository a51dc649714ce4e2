//! Delay-line plant simulator.
//!
//! An offline stand-in for the infant and the rocker, used to validate the
//! controller without hardware. Stress `S` moves between nine levels `K`
//! laid out over the actuation grid; heart rate reports stress from `tau`
//! seconds ago, crying reports it immediately.
//!
//! Time is simulated: advancing the clock records dense `(t, S)` samples so
//! delayed reads can interpolate, and nothing actually sleeps.

pub mod harness;
pub mod history;
pub mod physiology;
pub mod plant;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Simulator parameters (seconds unless noted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// History sub-step while time advances
    pub sample_dt: f64,
    /// Heart-rate feedback delay
    pub tau: f64,
    /// Settle time after a move before stress reaches the level optimum
    pub convergence_time: f64,
    /// Timestamp separation after an instantaneous stress change
    pub nudge: f64,
    /// Samples kept before the oldest is dropped
    pub history_capacity: usize,
    /// Controller cycles per run
    pub max_steps: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sample_dt: 0.05,
            tau: 10.0,
            convergence_time: 4.0,
            nudge: 0.01,
            history_capacity: 2048,
            max_steps: 40,
        }
    }
}

impl SimConfig {
    /// Range-check every field. Time steps must move time forward or the
    /// history never advances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_dt.is_finite() && self.sample_dt > 0.0) {
            return Err(ConfigError::ValidationFailed("sim.sample_dt must be > 0"));
        }
        if !(self.nudge.is_finite() && self.nudge > 0.0) {
            return Err(ConfigError::ValidationFailed("sim.nudge must be > 0"));
        }
        if !(self.tau.is_finite() && self.tau >= 0.0) {
            return Err(ConfigError::ValidationFailed("sim.tau must be >= 0"));
        }
        if !(self.convergence_time.is_finite() && self.convergence_time >= 0.0) {
            return Err(ConfigError::ValidationFailed("sim.convergence_time must be >= 0"));
        }
        if self.history_capacity < 2 {
            return Err(ConfigError::ValidationFailed("sim.history_capacity must be >= 2"));
        }
        Ok(())
    }
}
