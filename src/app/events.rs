//! Outbound application events.
//!
//! The controller and peripheral services emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log them, paint a status display, etc.

use crate::bus::codec::NodeId;
use crate::bus::command::Reply;
use crate::control::anchor_search::{Action, Regime};
use crate::control::grid::GridCell;
use crate::safety::PanicCause;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A node service has started.
    Started { node: NodeId },

    /// Boot ping result for one peripheral.
    NodeStatus { node: NodeId, alive: bool },

    /// Communication check finished.
    CommCheck(CommCheckReport),

    /// A sensor query failed; the controller skipped this cycle.
    ReadingStale { node: NodeId },

    /// Per-cycle controller status, the status-display feed.
    Status(StatusReport),

    /// The controller commanded a new actuation cell.
    Commanded { cell: GridCell, action: Action },

    /// The panic latch fired. Emitted once.
    PanicEntered(PanicCause),

    /// A peripheral answered a query.
    Served { node: NodeId, reply: Reply },

    /// The motor node applied a cell.
    Actuated { cell: GridCell },
}

/// A point-in-time controller snapshot suitable for logging or display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub bpm: u8,
    pub cry: u8,
    pub cell: GridCell,
    pub anchor: GridCell,
    pub regime: Regime,
    pub panic: bool,
}

/// Outcome of the communication check: random probes to the sensor
/// nodes and a random motor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommCheckReport {
    pub heartbeat: Option<u8>,
    pub crying: Option<u8>,
    /// Cell sent to the motor, if the send succeeded. The motor never
    /// replies, so a successful send counts as a pass.
    pub motor: Option<GridCell>,
}

impl CommCheckReport {
    pub fn passed(&self) -> bool {
        self.heartbeat.is_some() && self.crying.is_some() && self.motor.is_some()
    }
}
