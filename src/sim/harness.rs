//! Offline closed loop: anchor-search controller driving the plant.
//!
//! Each step lets plant time pass for the controller's dwell, senses delayed
//! heart rate and current crying, steps the controller and applies any
//! command as a plant move. The run ends after `max_steps` or once the
//! rocker sits at the gentlest cell with the plant at level 1.

use log::info;

use super::SimConfig;
use super::plant::{K_MIN, MoveOutcome, Plant};
use crate::config::{CadenceConfig, SystemConfig};
use crate::control::anchor_search::{AnchorSearch, Decision};
use crate::control::grid::GridCell;

/// One controller cycle as seen by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTrace {
    pub step: u32,
    /// Plant time at sensing.
    pub time: f64,
    pub stress_delayed: f64,
    pub bpm: u8,
    pub cry: u8,
    pub decision: Decision,
    pub outcome: Option<MoveOutcome>,
    /// Plant position after the move.
    pub cell: GridCell,
    pub level: u8,
    pub stress: f64,
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    pub trace: Vec<StepTrace>,
    pub reached_rest: bool,
    pub controller_panicked: bool,
    pub plant_panicked: bool,
    pub final_cell: GridCell,
    pub final_level: u8,
    pub final_stress: f64,
    pub elapsed: f64,
}

pub struct SimHarness {
    plant: Plant,
    controller: AnchorSearch,
    cadence: CadenceConfig,
    sim: SimConfig,
}

impl SimHarness {
    /// The controller boots at the plant's current cell.
    pub fn new(plant: Plant, system: &SystemConfig, sim: &SimConfig) -> Self {
        let controller = AnchorSearch::starting_at(plant.cell(), system);
        Self {
            plant,
            controller,
            cadence: system.cadence.clone(),
            sim: sim.clone(),
        }
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn controller(&self) -> &AnchorSearch {
        &self.controller
    }

    pub fn at_rest(&self) -> bool {
        self.plant.cell() == GridCell::SAFEST && self.plant.level() == K_MIN
    }

    /// Run until rest or `max_steps`.
    pub fn run(mut self) -> SimReport {
        // The first reading needs a full feedback delay of history.
        let mut wait = self.sim.tau;
        let mut trace = Vec::new();

        for step in 1..=self.sim.max_steps {
            let t = self.step(step, wait);
            wait = t.decision.dwell(&self.cadence).as_secs_f64();
            trace.push(t);
            if self.at_rest() {
                info!("sim: rest reached after {step} steps at t={:.2}", self.plant.now());
                break;
            }
        }

        SimReport {
            trace,
            reached_rest: self.at_rest(),
            controller_panicked: self.controller.is_panicked(),
            plant_panicked: self.plant.panicked(),
            final_cell: self.plant.cell(),
            final_level: self.plant.level(),
            final_stress: self.plant.stress(),
            elapsed: self.plant.now(),
        }
    }

    /// Wait `dwell` seconds of plant time, then run one controller cycle.
    pub fn step(&mut self, step: u32, dwell: f64) -> StepTrace {
        self.plant.advance(dwell);
        let time = self.plant.now();
        let stress_delayed = self.plant.stress_delayed();
        let bpm = self.plant.heartbeat();
        let cry = self.plant.crying();

        let decision = self.controller.step(bpm, cry);
        let outcome = decision.command.map(|cell| self.plant.move_to_cell(cell));

        info!(
            "sim: step {step} t={time:.2} S_tau={stress_delayed:.1} bpm={bpm} cry={cry} -> {:?} {:?}",
            decision.action, outcome
        );

        StepTrace {
            step,
            time,
            stress_delayed,
            bpm,
            cry,
            decision,
            outcome,
            cell: self.plant.cell(),
            level: self.plant.level(),
            stress: self.plant.stress(),
        }
    }
}
