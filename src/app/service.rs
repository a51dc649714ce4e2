//! Controller service: the hexagonal core of the master node.
//!
//! [`ControllerService`] owns the query client and the anchor-search
//! controller. It runs the boot ping, the optional communication check and
//! the adaptive-cadence control loop. All I/O flows through the ring
//! transport, the clock and the event sink, making the service testable with
//! mock adapters.
//!
//! ```text
//!   Ring ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!            │      ControllerService        │
//!   Ring ◀── │ QueryClient · AnchorSearch    │
//!            └──────────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use log::{info, warn};
use rand::Rng;

use crate::bus::client::SensorQueryClient;
use crate::bus::codec::NodeId;
use crate::bus::transport::Transport;
use crate::config::{CadenceConfig, SystemConfig};
use crate::control::anchor_search::{Action, AnchorSearch, Decision};
use crate::control::grid::{GRID_SIZE, GridCell};

use super::events::{AppEvent, CommCheckReport, StatusReport};
use super::ports::{ClockPort, Deadline, EventSink};

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

/// Boot ping results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    pub heartbeat: bool,
    pub crying: bool,
    pub motor: bool,
}

impl BootReport {
    pub fn all_alive(&self) -> bool {
        self.heartbeat && self.crying && self.motor
    }
}

/// Outcome of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// `(bpm, cry)` fed to the controller. A side whose query timed out
    /// carries its last known value. `None` when neither node answered.
    pub readings: Option<(u8, u8)>,
    /// The heartbeat query timed out this cycle.
    pub stale_heartbeat: bool,
    /// The crying query timed out this cycle.
    pub stale_crying: bool,
    /// Controller output; `None` when neither node answered.
    pub decision: Option<Decision>,
    /// Dwell before the next cycle.
    pub dwell: Duration,
}

// ───────────────────────────────────────────────────────────────
// ControllerService
// ───────────────────────────────────────────────────────────────

pub struct ControllerService<T: Transport, C: ClockPort> {
    client: SensorQueryClient<T, C>,
    search: AnchorSearch,
    cadence: CadenceConfig,
    motor_present: bool,
    /// Last values each sensor node actually reported; 0 until then.
    last_bpm: u8,
    last_cry: u8,
    cycles: u64,
    stale_cycles: u64,
}

impl<T: Transport, C: ClockPort> ControllerService<T, C> {
    pub fn new(client: SensorQueryClient<T, C>, config: &SystemConfig) -> Self {
        Self {
            client,
            search: AnchorSearch::new(config),
            cadence: config.cadence.clone(),
            // Assume present until a boot ping says otherwise.
            motor_present: true,
            last_bpm: 0,
            last_cry: 0,
            cycles: 0,
            stale_cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Ping every peripheral once and report which ones answered.
    pub fn boot(&mut self, sink: &mut impl EventSink) -> BootReport {
        sink.emit(&AppEvent::Started {
            node: NodeId::Master,
        });

        let mut alive = [false; 3];
        for (slot, node) in alive.iter_mut().zip(NodeId::PERIPHERALS) {
            *slot = match self.client.ping(node) {
                Ok(()) => true,
                Err(e) => {
                    warn!("boot: {node} missing ({e})");
                    false
                }
            };
            sink.emit(&AppEvent::NodeStatus { node, alive: *slot });
        }

        let report = BootReport {
            heartbeat: alive[0],
            crying: alive[1],
            motor: alive[2],
        };
        self.motor_present = report.motor;
        info!("boot: {report:?}");
        report
    }

    /// Random-probe both sensor nodes and send the motor a random cell.
    pub fn comm_check(&mut self, rng: &mut impl Rng, sink: &mut impl EventSink) -> CommCheckReport {
        let heartbeat = self.client.random(NodeId::Heartbeat).ok();
        let crying = self.client.random(NodeId::Crying).ok();

        let cell = GridCell::clamped(rng.gen_range(0..GRID_SIZE), rng.gen_range(0..GRID_SIZE));
        let motor = match self.client.command_motor(cell) {
            Ok(()) => Some(cell),
            Err(e) => {
                warn!("comm check: motor send failed ({e})");
                None
            }
        };

        let report = CommCheckReport {
            heartbeat,
            crying,
            motor,
        };
        if report.passed() {
            info!("comm check PASSED: {report:?}");
        } else {
            warn!("comm check FAILED: {report:?}");
        }
        sink.emit(&AppEvent::CommCheck(report));
        report
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one control cycle: query sensors → controller → motor.
    ///
    /// One fresh reading is enough to step the controller, so the panic
    /// check still sees a live heart rate while the crying node is silent.
    /// The silent side repeats its last known value. Only when both nodes
    /// are silent is the step skipped.
    pub fn cycle(&mut self, sink: &mut impl EventSink) -> CycleReport {
        self.cycles += 1;

        let fresh_bpm = self.read(NodeId::Heartbeat, sink);
        let fresh_cry = self.read(NodeId::Crying, sink);
        let stale_heartbeat = fresh_bpm.is_none();
        let stale_crying = fresh_cry.is_none();
        if stale_heartbeat || stale_crying {
            self.stale_cycles += 1;
        }
        if stale_heartbeat && stale_crying {
            return CycleReport {
                readings: None,
                stale_heartbeat,
                stale_crying,
                decision: None,
                dwell: self.cadence.crying_dwell(),
            };
        }
        if let Some(v) = fresh_bpm {
            self.last_bpm = v;
        }
        if let Some(v) = fresh_cry {
            self.last_cry = v;
        }
        let (bpm, cry) = (self.last_bpm, self.last_cry);

        let decision = self.search.step(bpm, cry);
        if decision.newly_panicked {
            if let Action::Panic(cause) = decision.action {
                sink.emit(&AppEvent::PanicEntered(cause));
            }
        }

        if let Some(cell) = decision.command {
            if !self.motor_present {
                warn!("motor missed boot ping; sending {cell} anyway");
            }
            match self.client.command_motor(cell) {
                Ok(()) => sink.emit(&AppEvent::Commanded {
                    cell,
                    action: decision.action,
                }),
                Err(e) => warn!("motor command {cell} failed: {e}"),
            }
        }

        let state = self.search.state();
        sink.emit(&AppEvent::Status(StatusReport {
            bpm,
            cry,
            cell: state.current,
            anchor: state.anchor,
            regime: state.regime,
            panic: state.panic,
        }));

        // A silent node is re-queried on the short cadence.
        let dwell = if stale_heartbeat || stale_crying {
            self.cadence.crying_dwell()
        } else {
            decision.dwell(&self.cadence)
        };
        CycleReport {
            readings: Some((bpm, cry)),
            stale_heartbeat,
            stale_crying,
            decision: Some(decision),
            dwell,
        }
    }

    /// Cycle until `stop` is set, dwelling between cycles.
    pub fn run(&mut self, sink: &mut impl EventSink, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            let report = self.cycle(sink);
            self.dwell(report.dwell, stop);
        }
        info!(
            "controller stopped after {} cycles ({} stale)",
            self.cycles, self.stale_cycles
        );
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn search(&self) -> &AnchorSearch {
        &self.search
    }

    pub fn client(&self) -> &SensorQueryClient<T, C> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut SensorQueryClient<T, C> {
        &mut self.client
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn stale_cycles(&self) -> u64 {
        self.stale_cycles
    }

    // ── Internal ──────────────────────────────────────────────

    fn read(&mut self, node: NodeId, sink: &mut impl EventSink) -> Option<u8> {
        let result = match node {
            NodeId::Crying => self.client.crying(),
            _ => self.client.heartbeat(),
        };
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("cycle {}: {e}, reading stale", self.cycles);
                sink.emit(&AppEvent::ReadingStale { node });
                None
            }
        }
    }

    /// Sleep `total` in slices so a stop request cuts the dwell short.
    fn dwell(&self, total: Duration, stop: &AtomicBool) {
        let clock = self.client.node().clock();
        let deadline = Deadline::after(clock, total);
        let slice = self.cadence.dwell_slice();
        while !stop.load(Ordering::Relaxed) && !deadline.expired(clock) {
            clock.sleep(deadline.remaining(clock).min(slice));
        }
    }
}
