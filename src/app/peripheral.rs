//! Peripheral node service: the heartbeat, crying and motor roles.
//!
//! A peripheral spends its life polling its upstream link. While the line
//! is quiet it naps for one poll interval; once a byte is waiting it enters
//! [`RingNode::receive`]. Frames for other nodes are relayed by the ring
//! layer; frames for this node are decoded and served:
//!
//! | Command | Heartbeat      | Crying         | Motor            |
//! |---------|----------------|----------------|------------------|
//! | `A`     | `['A']`        | `['A']`        | `['A']`          |
//! | `R`     | `['R', rand]`  | `['R', rand]`  | `['R', rand]`    |
//! | `H`     | `['H', bpm]`   | ignored        | ignored          |
//! | `C`     | ignored        | `['C', level]` | ignored          |
//! | `M`     | ignored        | ignored        | actuate, silent  |

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::codec::{Frame, NodeId};
use crate::bus::command::{Command, Reply};
use crate::bus::ring::{Received, RingNode};
use crate::bus::transport::Transport;
use crate::control::grid::GridCell;
use crate::error::{Result, TransportError};

use super::events::AppEvent;
use super::ports::{ActuatorPort, ClockPort, EventSink, SensorPort};

/// Which peripheral this node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heartbeat,
    Crying,
    Motor,
}

impl Role {
    pub fn node_id(self) -> NodeId {
        match self {
            Self::Heartbeat => NodeId::Heartbeat,
            Self::Crying => NodeId::Crying,
            Self::Motor => NodeId::Motor,
        }
    }
}

/// What one poll of the ring produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The line was quiet.
    Idle,
    /// A frame for another node was relayed.
    Forwarded,
    /// An unclaimed frame was taken off the ring.
    Dropped,
    /// A query was answered.
    Replied(Reply),
    /// The motor applied a cell.
    Actuated(GridCell),
    /// A frame for this node carried a command this role does not serve.
    Ignored(Command),
}

pub struct PeripheralNode<T: Transport, C: ClockPort> {
    role: Role,
    node: RingNode<T, C>,
    rng: StdRng,
}

impl<T: Transport, C: ClockPort> PeripheralNode<T, C> {
    /// `node` must be addressed as `role.node_id()`.
    pub fn new(role: Role, node: RingNode<T, C>) -> Self {
        Self::with_rng(role, node, StdRng::from_entropy())
    }

    pub fn with_rng(role: Role, node: RingNode<T, C>, rng: StdRng) -> Self {
        debug_assert_eq!(node.local(), role.node_id());
        Self { role, node, rng }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn node(&self) -> &RingNode<T, C> {
        &self.node
    }

    /// Receive and serve at most one frame. A quiet line costs one poll
    /// interval rather than a full byte timeout.
    pub fn poll_once(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> Result<Activity> {
        if !self.node.has_input()? {
            self.node.clock().sleep(self.node.poll_interval());
            return Ok(Activity::Idle);
        }
        match self.node.receive() {
            Ok(Received::Delivered(frame)) => self.handle_frame(&frame, hw, sink),
            Ok(Received::Forwarded { .. }) => Ok(Activity::Forwarded),
            Ok(Received::Dropped { .. }) => Ok(Activity::Dropped),
            Err(TransportError::TimedOut) => Ok(Activity::Idle),
            Err(e) => Err(e.into()),
        }
    }

    /// Serve frames until `stop` is set.
    pub fn run(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
        stop: &AtomicBool,
    ) {
        sink.emit(&AppEvent::Started {
            node: self.role.node_id(),
        });
        info!("{:?} node serving", self.role);
        while !stop.load(Ordering::Relaxed) {
            if let Err(e) = self.poll_once(hw, sink) {
                warn!("{:?} node: {e}", self.role);
                self.node.clock().sleep(self.node.poll_interval());
            }
        }
        info!("{:?} node stopped, link {:?}", self.role, self.node.stats());
    }

    /// Decode and serve one delivered frame, replying to its source.
    pub fn handle_frame(
        &mut self,
        frame: &Frame,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> Result<Activity> {
        let cmd = Command::decode(&frame.payload)?;
        let reply = match (self.role, cmd) {
            (_, Command::Ping) => Reply::Pong,
            (_, Command::RandomProbe) => Reply::Random(self.rng.gen_range(0..=u8::MAX)),
            (Role::Heartbeat, Command::HeartbeatQuery) => Reply::Heartbeat(hw.read_heartbeat()),
            (Role::Crying, Command::CryingQuery) => Reply::Crying(hw.read_crying()),
            (Role::Motor, Command::MotorCommand { amp, freq }) => {
                let cell = GridCell::clamped(amp, freq);
                hw.apply_actuation(cell);
                sink.emit(&AppEvent::Actuated { cell });
                return Ok(Activity::Actuated(cell));
            }
            (role, other) => {
                debug!("{role:?} node ignoring {other:?} from {}", frame.src);
                return Ok(Activity::Ignored(other));
            }
        };

        let local = self.node.local();
        self.node.send(frame.src, local, &reply.encode())?;
        sink.emit(&AppEvent::Served { node: local, reply });
        Ok(Activity::Replied(reply))
    }
}
