//! Mock adapters for integration tests.
//!
//! [`SimulatedRing`] stands in for everything downstream of the master:
//! it decodes the frames the master writes, answers them the way the three
//! peripherals would, and feeds the replies back as if they had travelled
//! the rest of the ring. Sensor values come from a shared [`Plant`] and
//! motor commands move it, so a whole control loop runs over real frames
//! without threads or wall-clock time.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use lullaby::app::events::AppEvent;
use lullaby::app::ports::EventSink;
use lullaby::bus::codec::{Frame, FrameDecoder, NodeId};
use lullaby::bus::command::{Command, Reply};
use lullaby::bus::transport::Transport;
use lullaby::control::grid::GridCell;
use lullaby::sim::SimConfig;
use lullaby::sim::plant::{LEVELS, LevelMatrix, LevelTable, Plant};

/// Value every peripheral returns for a random query.
pub const RANDOM_VALUE: u8 = 7;

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Simulated ring ────────────────────────────────────────────

pub struct SimulatedRing {
    infant: Rc<RefCell<Plant>>,
    decoder: FrameDecoder,
    rx: VecDeque<u8>,
    /// Peripherals that stay silent.
    pub muted: Vec<NodeId>,
    /// Every cell the motor applied, oldest first.
    pub motor_log: Vec<GridCell>,
}

#[allow(dead_code)]
impl SimulatedRing {
    pub fn new(infant: Rc<RefCell<Plant>>) -> Self {
        Self {
            infant,
            decoder: FrameDecoder::new(),
            rx: VecDeque::new(),
            muted: Vec::new(),
            motor_log: Vec::new(),
        }
    }

    pub fn muting(mut self, node: NodeId) -> Self {
        self.muted.push(node);
        self
    }

    fn serve(&mut self, frame: &Frame) {
        if frame.src != NodeId::Master || self.muted.contains(&frame.dst) {
            return;
        }
        let Ok(cmd) = Command::decode(&frame.payload) else {
            return;
        };
        let reply = match (frame.dst, cmd) {
            (_, Command::Ping) => Reply::Pong,
            (_, Command::RandomProbe) => Reply::Random(RANDOM_VALUE),
            (NodeId::Heartbeat, Command::HeartbeatQuery) => {
                Reply::Heartbeat(self.infant.borrow().heartbeat())
            }
            (NodeId::Crying, Command::CryingQuery) => Reply::Crying(self.infant.borrow().crying()),
            (NodeId::Motor, Command::MotorCommand { amp, freq }) => {
                let cell = GridCell::clamped(amp, freq);
                self.infant.borrow_mut().move_to_cell(cell);
                self.motor_log.push(cell);
                return;
            }
            _ => return,
        };
        if let Some(out) = Frame::new(NodeId::Master, frame.dst, &reply.encode()) {
            self.rx.extend(out.encode());
        }
    }
}

impl Transport for SimulatedRing {
    type Error = Infallible;

    fn poll_byte(&mut self) -> Result<Option<u8>, Infallible> {
        Ok(self.rx.pop_front())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Infallible> {
        for frame in self.decoder.feed(data) {
            self.serve(&frame);
        }
        Ok(())
    }

    fn has_input(&mut self) -> Result<bool, Infallible> {
        Ok(!self.rx.is_empty())
    }
}

// ── Plants ────────────────────────────────────────────────────

/// `K = amp + freq + 1`.
pub fn diagonal_levels() -> LevelMatrix {
    let mut k = [[0u8; 5]; 5];
    for (a, row) in k.iter_mut().enumerate() {
        for (f, v) in row.iter_mut().enumerate() {
            *v = (a + f + 1) as u8;
        }
    }
    LevelMatrix::from_levels(k)
}

/// `Sopt[k] = step * k`, band half-width 5.
pub fn linear_table(step: f64) -> LevelTable {
    let sopt = std::array::from_fn(|i| step * (i + 1) as f64);
    LevelTable::from_parts(sopt, [5.0; LEVELS])
}

/// Plant at the strongest cell that boots below every panic threshold.
pub fn gentle_plant() -> Rc<RefCell<Plant>> {
    let plant = Plant::from_levels(linear_table(8.0), diagonal_levels(), &SimConfig::default());
    Rc::new(RefCell::new(plant))
}

/// Plant whose boot reading is a crying overload.
#[allow(dead_code)]
pub fn overloaded_plant() -> Rc<RefCell<Plant>> {
    let plant = Plant::from_levels(linear_table(10.0), diagonal_levels(), &SimConfig::default());
    Rc::new(RefCell::new(plant))
}
