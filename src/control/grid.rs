//! The 5×5 actuation grid.
//!
//! A [`GridCell`] is an `(amplitude index, frequency index)` pair. Both axes
//! run from `0` (gentlest) to `4` (strongest). The physical values behind each
//! index come from one canonical lookup table shared by the motor node and
//! the plant simulator.
//!
//! ```text
//!            freq 0   1    2    3    4
//!   amp 0   (0,0) ←  ←    ←    ←   (0,4)      Left  = freq - 1
//!       1     ↑                               Up    = amp - 1
//!       2     ↑
//!       3     ↑
//!       4   (4,0)                  (4,4)  ← boot cell
//! ```

use core::fmt;

use log::warn;

use crate::error::GridError;

/// Cells per axis.
pub const GRID_SIZE: u8 = 5;

/// Highest legal index on either axis.
pub const MAX_INDEX: u8 = GRID_SIZE - 1;

/// Vibration amplitude (percent of full stroke) for each amplitude index.
pub const AMPLITUDE_PERCENT: [u8; GRID_SIZE as usize] = [20, 40, 60, 80, 100];

/// Vibration frequency (Hz) for each frequency index.
pub const FREQUENCY_HZ: [f32; GRID_SIZE as usize] = [0.20, 0.35, 0.50, 0.65, 0.70];

/// Exploration direction on the grid. Both directions soften the actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Lower the frequency index.
    Left,
    /// Lower the amplitude index.
    Up,
}

/// How a move between two cells changes the actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// No index increases and at least one decreases.
    Soft,
    /// No index decreases and at least one increases.
    Hard,
    /// One index goes up while the other goes down, or nothing moves.
    Mixed,
}

/// A validated grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    amp: u8,
    freq: u8,
}

impl GridCell {
    /// Gentlest actuation; commanded in panic.
    pub const SAFEST: Self = Self { amp: 0, freq: 0 };

    /// Strongest actuation; the controller boots here.
    pub const STRONGEST: Self = Self {
        amp: MAX_INDEX,
        freq: MAX_INDEX,
    };

    /// Build a cell, rejecting indices outside `0..=4`.
    pub const fn new(amp: u8, freq: u8) -> Result<Self, GridError> {
        if amp > MAX_INDEX || freq > MAX_INDEX {
            return Err(GridError::OutOfRangeIndex { amp, freq });
        }
        Ok(Self { amp, freq })
    }

    /// Build a cell, clamping each index to the grid boundary.
    ///
    /// Out-of-range input is logged and never propagated into actuation.
    pub fn clamped(amp: u8, freq: u8) -> Self {
        match Self::new(amp, freq) {
            Ok(cell) => cell,
            Err(e) => {
                let cell = Self {
                    amp: amp.min(MAX_INDEX),
                    freq: freq.min(MAX_INDEX),
                };
                warn!("grid: {e}, clamped to {cell}");
                cell
            }
        }
    }

    pub const fn amp(self) -> u8 {
        self.amp
    }

    pub const fn freq(self) -> u8 {
        self.freq
    }

    /// Neighbour one step toward lower frequency, if on the grid.
    pub fn left(self) -> Option<Self> {
        self.freq.checked_sub(1).map(|freq| Self { freq, ..self })
    }

    /// Neighbour one step toward lower amplitude, if on the grid.
    pub fn up(self) -> Option<Self> {
        self.amp.checked_sub(1).map(|amp| Self { amp, ..self })
    }

    /// Neighbour in `dir`, if on the grid.
    pub fn step(self, dir: Direction) -> Option<Self> {
        match dir {
            Direction::Left => self.left(),
            Direction::Up => self.up(),
        }
    }

    /// Physical amplitude for this cell.
    pub fn amplitude_percent(self) -> u8 {
        AMPLITUDE_PERCENT[self.amp as usize]
    }

    /// Physical frequency for this cell.
    pub fn frequency_hz(self) -> f32 {
        FREQUENCY_HZ[self.freq as usize]
    }

    /// Classify the move from `self` to `to`.
    pub fn move_kind(self, to: Self) -> MoveKind {
        let softer = to.amp < self.amp || to.freq < self.freq;
        let harder = to.amp > self.amp || to.freq > self.freq;
        match (softer, harder) {
            (true, false) => MoveKind::Soft,
            (false, true) => MoveKind::Hard,
            _ => MoveKind::Mixed,
        }
    }

    /// Every cell, row by row.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GRID_SIZE).flat_map(|amp| (0..GRID_SIZE).map(move |freq| Self { amp, freq }))
    }
}

impl fmt::Display for GridCell {
    /// One-based labels, `A1 F1` .. `A5 F5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{} F{}", self.amp + 1, self.freq + 1)
    }
}
