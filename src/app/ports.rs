//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControllerService / PeripheralNode (domain)
//! ```
//!
//! Driven adapters (sensors, the motor, clocks, event sinks, config files)
//! implement these traits. The services consume them via generics, so the
//! domain core never touches hardware or wall-clock time directly.

use core::time::Duration;

use crate::config::SystemConfig;
use crate::control::grid::GridCell;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port used by the heartbeat and crying nodes.
pub trait SensorPort {
    /// Current heart rate in beats per minute.
    fn read_heartbeat(&mut self) -> u8;

    /// Current crying intensity, 0–100.
    fn read_crying(&mut self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port used by the motor node.
pub trait ActuatorPort {
    /// Drive the rocker at the physical values behind `cell`.
    fn apply_actuation(&mut self, cell: GridCell);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
///
/// All bus timeouts and controller dwells are expressed against this clock,
/// which lets tests substitute a manual clock where `sleep` advances time.
pub trait ClockPort {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block for `d`.
    fn sleep(&self, d: Duration);
}

/// An absolute point in time on a [`ClockPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Duration);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(clock: &impl ClockPort, timeout: Duration) -> Self {
        Self(clock.now().saturating_add(timeout))
    }

    pub fn expired(self, clock: &impl ClockPort) -> bool {
        clock.now() >= self.0
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(self, clock: &impl ClockPort) -> Duration {
        self.0.saturating_sub(clock.now())
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (log, status display).
/// Emission is fire-and-forget.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads system configuration.
///
/// Implementations must run [`SystemConfig::validate`] before handing a
/// config to the domain. Out-of-range values are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file at the given location.
    NotFound,
    /// The stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error reading the config.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
