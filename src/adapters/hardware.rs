//! Bench hardware adapter.
//!
//! Stands in for the sensor front-ends and the rocker on a desk setup:
//! readings are fixed values set from the command line or by a test, and
//! actuation is recorded and logged instead of driving a motor. Boards
//! with a real rocker use [`PwmRocker`](super::pwm::PwmRocker) for the
//! actuator side.

use log::info;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::grid::GridCell;

/// Fixed-reading sensors plus a recording actuator.
#[derive(Debug, Clone)]
pub struct BenchHardware {
    heartbeat: u8,
    crying: u8,
    applied: Vec<GridCell>,
}

impl BenchHardware {
    pub fn new(heartbeat: u8, crying: u8) -> Self {
        Self {
            heartbeat,
            crying,
            applied: Vec::new(),
        }
    }

    pub fn set_readings(&mut self, heartbeat: u8, crying: u8) {
        self.heartbeat = heartbeat;
        self.crying = crying;
    }

    /// Last cell driven, if any.
    pub fn last_actuation(&self) -> Option<GridCell> {
        self.applied.last().copied()
    }

    /// Every cell driven so far, oldest first.
    pub fn actuations(&self) -> &[GridCell] {
        &self.applied
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for BenchHardware {
    fn read_heartbeat(&mut self) -> u8 {
        self.heartbeat
    }

    fn read_crying(&mut self) -> u8 {
        self.crying
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for BenchHardware {
    fn apply_actuation(&mut self, cell: GridCell) {
        info!(
            "bench: rocker {cell} at {}% / {:.2}Hz",
            cell.amplitude_percent(),
            cell.frequency_hz()
        );
        self.applied.push(cell);
    }
}

/// Pairs a sensor source with a separate actuator so one value satisfies
/// both ports, e.g. bench sensors with a PWM rocker.
pub struct Rig<S, A> {
    pub sensors: S,
    pub actuator: A,
}

impl<S, A> Rig<S, A> {
    pub fn new(sensors: S, actuator: A) -> Self {
        Self { sensors, actuator }
    }
}

impl<S: SensorPort, A> SensorPort for Rig<S, A> {
    fn read_heartbeat(&mut self) -> u8 {
        self.sensors.read_heartbeat()
    }

    fn read_crying(&mut self) -> u8 {
        self.sensors.read_crying()
    }
}

impl<S, A: ActuatorPort> ActuatorPort for Rig<S, A> {
    fn apply_actuation(&mut self, cell: GridCell) {
        self.actuator.apply_actuation(cell);
    }
}
