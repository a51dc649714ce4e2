//! Anchor-search controller.
//!
//! A discrete hill climb over the 5×5 grid that tolerates delayed feedback.
//! The controller keeps an *anchor* (the best cell known so far), tries one
//! softer neighbour at a time and judges the move on the next cycle:
//!
//! ```text
//!            ┌──────────── improved: promote, explore again ───────────┐
//!            ▼                                                         │
//!   ┌──────────────┐  Left / Up   ┌────────────────┐  next cycle  ┌───────────┐
//!   │ idle @anchor │ ───────────▶ │ move in flight │ ───────────▶ │ evaluate  │
//!   └──────────────┘              └────────────────┘              └───────────┘
//!            ▲                             ▲                           │  │
//!            │                             └── stable after Left: ─────┘  │
//!            │                                 Up from anchor             │
//!            └───────────────── no improvement: backtrack ────────────────┘
//! ```
//!
//! Which signal decides "improved" depends on the regime: heart rate when
//! the infant is agitated, crying once heart rate and crying are both low.
//! The [`SafetySupervisor`] runs first on every cycle and, once latched,
//! pins the actuation to [`GridCell::SAFEST`].

use core::time::Duration;

use log::{info, warn};

use super::grid::{Direction, GridCell};
use crate::config::{CadenceConfig, SearchConfig, SystemConfig};
use crate::safety::{PanicCause, SafetySupervisor};

/// Which feedback signal is authoritative this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    HeartbeatDriven,
    CryingDriven,
}

impl Regime {
    pub fn classify(bpm: u8, cry: u8, search: &SearchConfig) -> Self {
        if bpm < search.regime_bpm_limit && cry < search.regime_cry_limit {
            Self::CryingDriven
        } else {
            Self::HeartbeatDriven
        }
    }
}

/// What the controller did in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Panic latched (this cycle or earlier); safest cell commanded.
    Panic(PanicCause),
    /// First move away from an idle anchor.
    Explore(Direction),
    /// Last move improved; its cell is the new anchor. Carries the next
    /// exploratory move, if any is legal.
    Promote(Option<Direction>),
    /// Left did not help but readings held steady: try Up from the
    /// pre-Left anchor directly.
    ReverseDiagonal,
    /// Last move did not help: return to the anchor.
    Backtrack,
    /// Nothing left to try from the anchor; hold position.
    Exhausted,
}

/// Result of [`AnchorSearch::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Motor command to issue, at most one per cycle.
    pub command: Option<GridCell>,
    pub action: Action,
    pub regime: Regime,
    /// True only on the cycle the panic latched.
    pub newly_panicked: bool,
}

impl Decision {
    /// How long to wait before the next cycle.
    ///
    /// Heart rate lags actuation by tens of seconds, so a heartbeat-driven
    /// move gets the long dwell. Everything else re-checks quickly.
    pub fn dwell(&self, cadence: &CadenceConfig) -> Duration {
        let heartbeat_move = self.command.is_some()
            && self.regime == Regime::HeartbeatDriven
            && !matches!(self.action, Action::Panic(_));
        if heartbeat_move {
            cadence.heartbeat_dwell()
        } else {
            cadence.crying_dwell()
        }
    }
}

/// Controller memory between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// Last commanded cell.
    pub current: GridCell,
    pub anchor: GridCell,
    pub tried_left: bool,
    pub tried_up: bool,
    /// Move made last cycle and awaiting evaluation.
    pub last_move: Option<Direction>,
    pub last_heartbeat: u8,
    pub last_crying: u8,
    pub regime: Regime,
    pub panic: bool,
}

impl ControllerState {
    fn at(cell: GridCell) -> Self {
        Self {
            current: cell,
            anchor: cell,
            tried_left: false,
            tried_up: false,
            last_move: None,
            last_heartbeat: 0,
            last_crying: 0,
            regime: Regime::HeartbeatDriven,
            panic: false,
        }
    }
}

pub struct AnchorSearch {
    state: ControllerState,
    search: SearchConfig,
    safety: SafetySupervisor,
}

impl AnchorSearch {
    /// Controller at the boot cell, [`GridCell::STRONGEST`].
    pub fn new(config: &SystemConfig) -> Self {
        Self::starting_at(GridCell::STRONGEST, config)
    }

    pub fn starting_at(cell: GridCell, config: &SystemConfig) -> Self {
        Self {
            state: ControllerState::at(cell),
            search: config.search.clone(),
            safety: SafetySupervisor::new(&config.safety),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_panicked(&self) -> bool {
        self.safety.is_panicked()
    }

    pub fn panic_cause(&self) -> Option<PanicCause> {
        self.safety.cause()
    }

    /// Run one control cycle on fresh readings.
    pub fn step(&mut self, bpm: u8, cry: u8) -> Decision {
        let last_hb = self.state.last_heartbeat;
        let last_cry = self.state.last_crying;
        self.state.last_heartbeat = bpm;
        self.state.last_crying = cry;

        let was_panicked = self.safety.is_panicked();
        if let Some(cause) = self.safety.evaluate(bpm, cry, last_hb) {
            self.state.panic = true;
            self.state.current = GridCell::SAFEST;
            return Decision {
                command: Some(GridCell::SAFEST),
                action: Action::Panic(cause),
                regime: self.state.regime,
                newly_panicked: !was_panicked,
            };
        }

        let regime = Regime::classify(bpm, cry, &self.search);
        if regime != self.state.regime {
            info!("search: regime {:?} -> {:?}", self.state.regime, regime);
        }
        self.state.regime = regime;

        let (command, action) = match self.state.last_move {
            None => self.from_idle(),
            Some(dir) => {
                if self.improved(regime, bpm, cry, last_hb, last_cry) {
                    self.promote()
                } else if dir == Direction::Left && self.stable(regime, bpm, cry, last_hb, last_cry) {
                    self.reverse_diagonal().unwrap_or_else(|| self.backtrack())
                } else {
                    self.backtrack()
                }
            }
        };

        Decision {
            command,
            action,
            regime,
            newly_panicked: false,
        }
    }

    // ── Evaluation ────────────────────────────────────────────

    fn improved(&self, regime: Regime, bpm: u8, cry: u8, last_hb: u8, last_cry: u8) -> bool {
        match regime {
            Regime::HeartbeatDriven => {
                last_hb > 0 && last_hb.saturating_sub(bpm) >= self.search.threshold_bpm
            }
            Regime::CryingDriven => {
                cry <= self.search.threshold_cry
                    || (last_cry > 0 && last_cry.saturating_sub(cry) >= self.search.threshold_cry)
            }
        }
    }

    fn stable(&self, regime: Regime, bpm: u8, cry: u8, last_hb: u8, last_cry: u8) -> bool {
        match regime {
            Regime::HeartbeatDriven => bpm.abs_diff(last_hb) <= self.search.stable_bpm_delta,
            Regime::CryingDriven => cry == last_cry,
        }
    }

    // ── Transitions ───────────────────────────────────────────

    fn from_idle(&mut self) -> (Option<GridCell>, Action) {
        if self.state.anchor != self.state.current {
            self.state.anchor = self.state.current;
            self.state.tried_left = false;
            self.state.tried_up = false;
        }
        match self.explore() {
            Some((cell, dir)) => {
                info!("search: explore {dir:?} from {} to {cell}", self.state.anchor);
                (Some(cell), Action::Explore(dir))
            }
            None => {
                warn!("search: anchor {} exhausted, holding", self.state.anchor);
                (None, Action::Exhausted)
            }
        }
    }

    fn promote(&mut self) -> (Option<GridCell>, Action) {
        info!("search: {} improved, new anchor", self.state.current);
        self.state.anchor = self.state.current;
        self.state.tried_left = false;
        self.state.tried_up = false;
        self.state.last_move = None;
        match self.explore() {
            Some((cell, dir)) => (Some(cell), Action::Promote(Some(dir))),
            None => (None, Action::Promote(None)),
        }
    }

    fn reverse_diagonal(&mut self) -> Option<(Option<GridCell>, Action)> {
        if self.state.tried_up {
            return None;
        }
        let cell = self.state.anchor.up()?;
        info!("search: left held steady, probing up from {} to {cell}", self.state.anchor);
        self.state.tried_up = true;
        self.state.current = cell;
        self.state.last_move = Some(Direction::Up);
        Some((Some(cell), Action::ReverseDiagonal))
    }

    fn backtrack(&mut self) -> (Option<GridCell>, Action) {
        let anchor = self.state.anchor;
        info!("search: no improvement at {}, back to {anchor}", self.state.current);
        self.state.current = anchor;
        self.state.last_move = None;
        (Some(anchor), Action::Backtrack)
    }

    /// Pick the next untried neighbour of the anchor, Left before Up, and
    /// record the move.
    fn explore(&mut self) -> Option<(GridCell, Direction)> {
        let anchor = self.state.anchor;
        let (cell, dir) = if let (false, Some(cell)) = (self.state.tried_left, anchor.left()) {
            self.state.tried_left = true;
            (cell, Direction::Left)
        } else if let (false, Some(cell)) = (self.state.tried_up, anchor.up()) {
            self.state.tried_up = true;
            (cell, Direction::Up)
        } else {
            return None;
        };
        self.state.current = cell;
        self.state.last_move = Some(dir);
        Some((cell, dir))
    }
}
