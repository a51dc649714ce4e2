//! System configuration parameters
//!
//! All tunable parameters for the lullaby nodes. Defaults match the bench
//! build; any subset can be overridden from a JSON file.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub bus: BusConfig,
    pub search: SearchConfig,
    pub safety: SafetyConfig,
    pub cadence: CadenceConfig,
}

/// Serial ring timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// UART baud rate
    pub baud_rate: u32,
    /// Maximum gap between consecutive bytes of a frame (milliseconds)
    pub byte_timeout_ms: u32,
    /// How long the master waits for a query reply (milliseconds)
    pub query_timeout_ms: u32,
    /// Receive poll granularity (milliseconds)
    pub poll_interval_ms: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            byte_timeout_ms: 20,
            query_timeout_ms: 20,
            poll_interval_ms: 1,
        }
    }
}

impl BusConfig {
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms.into())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.into())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.into())
    }
}

/// Anchor-search thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Heart-rate drop (bpm) that counts as improvement
    pub threshold_bpm: u8,
    /// Crying drop that counts as improvement; also the "calm" level
    pub threshold_cry: u8,
    /// Heart-rate change (bpm) still considered stable
    pub stable_bpm_delta: u8,
    /// Below this bpm (and the crying limit) crying drives the search
    pub regime_bpm_limit: u8,
    /// Below this crying level (and the bpm limit) crying drives the search
    pub regime_cry_limit: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold_bpm: 10,
            threshold_cry: 1,
            stable_bpm_delta: 3,
            regime_bpm_limit: 150,
            regime_cry_limit: 52,
        }
    }
}

/// Panic thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Rise (bpm) over one cycle that counts as a spike
    pub spike_bpm: u8,
    /// Panic unconditionally at or above this rate
    pub very_high_bpm: u8,
    /// Panic on a spike at or above this rate
    pub high_spike_bpm: u8,
    /// Crying level that, with `overload_bpm`, triggers panic
    pub overload_cry: u8,
    pub overload_bpm: u8,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            spike_bpm: 30,
            very_high_bpm: 230,
            high_spike_bpm: 220,
            overload_cry: 100,
            overload_bpm: 200,
        }
    }
}

/// Controller cycle pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Dwell after a heartbeat-driven command (milliseconds)
    pub heartbeat_dwell_ms: u32,
    /// Dwell after crying-driven or idle cycles (milliseconds)
    pub crying_dwell_ms: u32,
    /// Longest uninterrupted sleep inside a dwell (milliseconds)
    pub dwell_slice_ms: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_dwell_ms: 30_000,
            crying_dwell_ms: 3_000,
            dwell_slice_ms: 100,
        }
    }
}

impl CadenceConfig {
    pub fn heartbeat_dwell(&self) -> Duration {
        Duration::from_millis(self.heartbeat_dwell_ms.into())
    }

    pub fn crying_dwell(&self) -> Duration {
        Duration::from_millis(self.crying_dwell_ms.into())
    }

    pub fn dwell_slice(&self) -> Duration {
        Duration::from_millis(self.dwell_slice_ms.into())
    }
}

impl SystemConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bus = &self.bus;
        if bus.baud_rate == 0 {
            return Err(ConfigError::ValidationFailed("bus.baud_rate must be > 0"));
        }
        if bus.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("bus.poll_interval_ms must be > 0"));
        }
        if bus.byte_timeout_ms < bus.poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "bus.byte_timeout_ms must be >= poll_interval_ms",
            ));
        }
        if bus.query_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("bus.query_timeout_ms must be > 0"));
        }

        let search = &self.search;
        if search.threshold_bpm == 0 || search.threshold_cry == 0 {
            return Err(ConfigError::ValidationFailed(
                "search improvement thresholds must be > 0",
            ));
        }
        if search.regime_cry_limit > 100 {
            return Err(ConfigError::ValidationFailed("search.regime_cry_limit must be <= 100"));
        }

        let safety = &self.safety;
        if safety.spike_bpm == 0 {
            return Err(ConfigError::ValidationFailed("safety.spike_bpm must be > 0"));
        }
        if safety.high_spike_bpm > safety.very_high_bpm {
            return Err(ConfigError::ValidationFailed(
                "safety.high_spike_bpm must be <= very_high_bpm",
            ));
        }
        if safety.overload_cry > 100 {
            return Err(ConfigError::ValidationFailed("safety.overload_cry must be <= 100"));
        }

        let cadence = &self.cadence;
        if cadence.crying_dwell_ms == 0 || cadence.heartbeat_dwell_ms == 0 {
            return Err(ConfigError::ValidationFailed("cadence dwells must be > 0"));
        }
        if cadence.dwell_slice_ms == 0 {
            return Err(ConfigError::ValidationFailed("cadence.dwell_slice_ms must be > 0"));
        }
        Ok(())
    }
}
