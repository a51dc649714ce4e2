//! Stress plant: nine banded levels laid out over the actuation grid.
//!
//! Each level `K` (1 = calm, 9 = panic) has an optimum stress `Sopt[K]` and
//! a band `[low, high]` around it. Moving the rocker to a cell switches the
//! plant to that cell's level; whether stress settles smoothly or jumps to
//! the panic optimum depends on the band geometry and the move direction.

use core::fmt;

use log::{debug, info, warn};
use rand::Rng;

use super::SimConfig;
use super::history::StressHistory;
use super::physiology;
use crate::control::grid::{GRID_SIZE, GridCell, MAX_INDEX, MoveKind};

/// Number of stress levels.
pub const LEVELS: usize = 9;

/// Calmest level.
pub const K_MIN: u8 = 1;

/// Panic level.
pub const K_MAX: u8 = LEVELS as u8;

/// Highest generated optimum before the strictly-increasing guard.
const SOPT_CAP: f64 = 98.0;

// ---------------------------------------------------------------------------
// Level table
// ---------------------------------------------------------------------------

/// Per-level optimum and band.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTable {
    sopt: [f64; LEVELS],
    low: [f64; LEVELS],
    high: [f64; LEVELS],
}

impl LevelTable {
    /// Random table: `Sopt[1] = 10 + U{0..5}`, steps of `7 + U{0..4}`,
    /// band half-widths of `6 + U{0..6}`.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let mut sopt = [0.0; LEVELS];
        sopt[0] = 10.0 + f64::from(rng.gen_range(0..=5u8));
        for k in 1..LEVELS {
            let step = f64::from(rng.gen_range(7..=11u8));
            sopt[k] = (sopt[k - 1] + step).min(SOPT_CAP);
        }
        let mut half = [0.0; LEVELS];
        for h in &mut half {
            *h = f64::from(rng.gen_range(6..=12u8));
        }
        Self::from_parts(sopt, half)
    }

    /// Build from optima and band half-widths, indexed from level 1.
    ///
    /// Optima are forced strictly increasing. Bands are clamped to
    /// `[0, 100]` and each band is widened upward to reach the next
    /// level's optimum, so stepping down one level is always safe.
    pub fn from_parts(mut sopt: [f64; LEVELS], half: [f64; LEVELS]) -> Self {
        for k in 1..LEVELS {
            if sopt[k] <= sopt[k - 1] {
                sopt[k] = sopt[k - 1] + 1.0;
            }
        }

        let mut low = [0.0; LEVELS];
        let mut high = [0.0; LEVELS];
        for k in 0..LEVELS {
            low[k] = (sopt[k] - half[k]).max(0.0);
            high[k] = (sopt[k] + half[k]).min(100.0);
        }
        for k in 1..LEVELS {
            if high[k - 1] < sopt[k] {
                high[k - 1] = sopt[k].min(100.0);
                low[k - 1] = low[k - 1].min(high[k - 1]);
            }
        }
        Self { sopt, low, high }
    }

    /// Optimum stress for level `k` (1..=9).
    pub fn sopt(&self, k: u8) -> f64 {
        self.sopt[Self::index(k)]
    }

    /// `(low, high)` band for level `k`.
    pub fn band(&self, k: u8) -> (f64, f64) {
        let i = Self::index(k);
        (self.low[i], self.high[i])
    }

    pub fn contains(&self, k: u8, stress: f64) -> bool {
        let (low, high) = self.band(k);
        stress >= low && stress <= high
    }

    pub fn overlaps(&self, a: u8, b: u8) -> bool {
        let (a_low, a_high) = self.band(a);
        let (b_low, b_high) = self.band(b);
        !(a_high < b_low || a_low > b_high)
    }

    pub fn clamp_into(&self, k: u8, stress: f64) -> f64 {
        let (low, high) = self.band(k);
        stress.clamp(low, high)
    }

    fn index(k: u8) -> usize {
        usize::from(k.clamp(K_MIN, K_MAX) - 1)
    }
}

// ---------------------------------------------------------------------------
// Level matrix
// ---------------------------------------------------------------------------

/// Level of every grid cell, indexed `[amp][freq]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelMatrix {
    k: [[u8; GRID_SIZE as usize]; GRID_SIZE as usize],
}

impl LevelMatrix {
    /// Random matrix: a monotone Left/Up path labels levels 9 down to 1 from
    /// `(4,4)` to `(0,0)`; every other cell copies its right neighbour, then
    /// its lower neighbour.
    pub fn generate(rng: &mut impl Rng) -> Self {
        const N: usize = GRID_SIZE as usize;
        let mut k = [[0u8; N]; N];
        let (mut a, mut f) = (N - 1, N - 1);
        let mut label = K_MAX;
        k[a][f] = label;
        let (mut lefts, mut ups) = (MAX_INDEX, MAX_INDEX);

        while label > K_MIN {
            let go_left = match (lefts, ups) {
                (0, _) => false,
                (_, 0) => true,
                _ => rng.gen_bool(0.5),
            };
            if go_left {
                f -= 1;
                lefts -= 1;
            } else {
                a -= 1;
                ups -= 1;
            }
            label -= 1;
            k[a][f] = label;
        }

        for a in (0..N).rev() {
            for f in (0..N).rev() {
                if k[a][f] == 0 && f + 1 < N && k[a][f + 1] > K_MIN {
                    k[a][f] = k[a][f + 1];
                }
            }
        }
        for a in (0..N).rev() {
            for f in (0..N).rev() {
                if k[a][f] == 0 && a + 1 < N && k[a + 1][f] > K_MIN {
                    k[a][f] = k[a + 1][f];
                }
            }
        }
        k[0][0] = K_MIN;
        k[N - 1][N - 1] = K_MAX;
        Self { k }
    }

    /// Use explicit levels, `levels[amp][freq]`. Values are clamped to 1..=9.
    pub fn from_levels(levels: [[u8; GRID_SIZE as usize]; GRID_SIZE as usize]) -> Self {
        let mut k = levels;
        for row in &mut k {
            for v in row.iter_mut() {
                *v = (*v).clamp(K_MIN, K_MAX);
            }
        }
        Self { k }
    }

    pub fn level(&self, cell: GridCell) -> u8 {
        self.k[usize::from(cell.amp())][usize::from(cell.freq())]
    }
}

impl fmt::Display for LevelMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.k {
            let line: Vec<String> = row.iter().map(|k| format!("K{k}")).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plant
// ---------------------------------------------------------------------------

/// How the plant reacted to a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Stress already sat in the target band; converged.
    InsideBand,
    /// Bands overlap; stress clamped into the target band, then converged.
    OverlapClamp,
    /// Disjoint bands on a mixed move; clamped, then converged.
    MixedClamp,
    /// Disjoint bands on a soft move; stress jumped to the panic optimum.
    PanicJump,
    /// Disjoint bands on a hard move; stress jumped to the panic optimum.
    PanicBlock,
}

impl MoveOutcome {
    pub fn is_panic(self) -> bool {
        matches!(self, Self::PanicJump | Self::PanicBlock)
    }
}

pub struct Plant {
    table: LevelTable,
    matrix: LevelMatrix,
    cell: GridCell,
    level: u8,
    stress: f64,
    history: StressHistory,
    panicked: bool,
    config: SimConfig,
}

impl Plant {
    pub fn generate(rng: &mut impl Rng, config: &SimConfig) -> Self {
        let table = LevelTable::generate(rng);
        let matrix = LevelMatrix::generate(rng);
        Self::from_levels(table, matrix, config)
    }

    /// Plant at the boot cell with stress at that cell's optimum.
    pub fn from_levels(table: LevelTable, matrix: LevelMatrix, config: &SimConfig) -> Self {
        let cell = GridCell::STRONGEST;
        let stress = table.sopt(matrix.level(cell));
        Self::starting_at(table, matrix, cell, stress, config)
    }

    pub fn starting_at(
        table: LevelTable,
        matrix: LevelMatrix,
        cell: GridCell,
        stress: f64,
        config: &SimConfig,
    ) -> Self {
        let level = matrix.level(cell);
        let mut history = StressHistory::new(config.history_capacity, config.sample_dt);
        history.record(stress);
        Self {
            table,
            matrix,
            cell,
            level,
            stress,
            history,
            panicked: false,
            config: config.clone(),
        }
    }

    // ── Readings ──────────────────────────────────────────────

    pub fn now(&self) -> f64 {
        self.history.now()
    }

    pub fn cell(&self) -> GridCell {
        self.cell
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    /// True once any move has jumped to the panic optimum.
    pub fn panicked(&self) -> bool {
        self.panicked
    }

    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    pub fn matrix(&self) -> &LevelMatrix {
        &self.matrix
    }

    /// Stress as the heart rate sees it, `tau` seconds ago.
    pub fn stress_delayed(&self) -> f64 {
        self.history
            .delayed(self.now(), self.config.tau)
            .unwrap_or(self.stress)
    }

    /// Heart rate from delayed stress.
    pub fn heartbeat(&self) -> u8 {
        physiology::to_reading(physiology::heartbeat(self.stress_delayed()))
    }

    /// Crying from current stress.
    pub fn crying(&self) -> u8 {
        physiology::to_reading(physiology::crying(self.stress))
    }

    // ── Dynamics ──────────────────────────────────────────────

    /// Let `dt` seconds pass at constant stress.
    pub fn advance(&mut self, dt: f64) {
        self.history.advance(dt, self.stress);
    }

    /// Move the rocker to `cell` and settle the plant.
    pub fn move_to_cell(&mut self, cell: GridCell) -> MoveOutcome {
        let from_level = self.level;
        let target = self.matrix.level(cell);
        let kind = self.cell.move_kind(cell);
        let overlap = self.table.overlaps(from_level, target);
        debug!(
            "plant: move {} K{from_level} -> {cell} K{target} ({kind:?}, overlap={overlap})",
            self.cell
        );

        self.cell = cell;
        self.level = target;

        if self.table.contains(target, self.stress) {
            self.converge();
            return MoveOutcome::InsideBand;
        }

        if !overlap {
            match kind {
                MoveKind::Soft => {
                    self.go_panic("PANIC JUMP");
                    return MoveOutcome::PanicJump;
                }
                MoveKind::Hard => {
                    self.go_panic("PANIC BLOCK");
                    return MoveOutcome::PanicBlock;
                }
                MoveKind::Mixed => {
                    self.clamp_into_band();
                    self.converge();
                    return MoveOutcome::MixedClamp;
                }
            }
        }

        self.clamp_into_band();
        self.converge();
        MoveOutcome::OverlapClamp
    }

    fn clamp_into_band(&mut self) {
        self.stress = self.table.clamp_into(self.level, self.stress);
        self.history.record(self.stress);
    }

    fn converge(&mut self) {
        self.history.advance(self.config.convergence_time, self.stress);
        self.stress = self.table.sopt(self.level);
        self.history.record(self.stress);
        info!(
            "plant: converged at {} K{} S={:.1} t={:.2}",
            self.cell,
            self.level,
            self.stress,
            self.now()
        );
    }

    fn go_panic(&mut self, tag: &str) {
        self.stress = self.table.sopt(K_MAX);
        self.history.record(self.stress);
        self.panicked = true;
        warn!(
            "plant: {tag} at {} -> S={:.1} t={:.2}",
            self.cell,
            self.stress,
            self.now()
        );
        self.history.nudge(self.config.nudge, self.stress);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    /// `Sopt[k] = 10k`. Bands are `[10k - 5, 10k + 10]` after widening,
    /// except K9 at `[85, 95]`.
    fn even_table() -> LevelTable {
        LevelTable::from_parts(
            [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0],
            [5.0; LEVELS],
        )
    }

    fn diagonal_matrix() -> LevelMatrix {
        LevelMatrix::from_levels([
            [1, 2, 3, 4, 5],
            [2, 3, 4, 5, 6],
            [3, 4, 5, 6, 7],
            [4, 5, 6, 7, 8],
            [5, 6, 7, 8, 9],
        ])
    }

    fn cell(amp: u8, freq: u8) -> GridCell {
        GridCell::new(amp, freq).unwrap()
    }

    #[test]
    fn even_table_bands() {
        let t = even_table();
        assert_eq!(t.band(1), (5.0, 20.0));
        assert_eq!(t.band(9), (85.0, 95.0));
        assert!(t.overlaps(4, 5));
        assert!(!t.overlaps(3, 5));
    }

    #[test]
    fn from_parts_forces_strictly_increasing_optima() {
        let t = LevelTable::from_parts([50.0; LEVELS], [6.0; LEVELS]);
        for k in 2..=K_MAX {
            assert!(t.sopt(k) > t.sopt(k - 1));
        }
    }

    #[test]
    fn generated_table_invariants() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let t = LevelTable::generate(&mut rng);
            assert!((10.0..=15.0).contains(&t.sopt(1)));
            for k in 1..=K_MAX {
                let (low, high) = t.band(k);
                assert!(0.0 <= low && low <= high && high <= 100.0);
                if k > 1 {
                    assert!(t.sopt(k) > t.sopt(k - 1));
                    assert!(t.band(k - 1).1 >= t.sopt(k));
                }
            }
        }
    }

    #[test]
    fn generated_matrix_is_monotone() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let m = LevelMatrix::generate(&mut rng);
            assert_eq!(m.level(GridCell::SAFEST), 1);
            assert_eq!(m.level(GridCell::STRONGEST), 9);
            for c in GridCell::all() {
                let k = m.level(c);
                assert!((K_MIN..=K_MAX).contains(&k));
                if let Some(left) = c.left() {
                    assert!(m.level(left) <= k, "{m}");
                }
                if let Some(up) = c.up() {
                    assert!(m.level(up) <= k, "{m}");
                }
            }
        }
    }

    #[test]
    fn inside_band_converges_to_optimum() {
        let config = SimConfig::default();
        let mut p = Plant::starting_at(even_table(), diagonal_matrix(), cell(2, 3), 55.0, &config);
        assert_eq!(p.level(), 6);
        // (2,2) is K5 with band [45, 60].
        let t0 = p.now();
        assert_eq!(p.move_to_cell(cell(2, 2)), MoveOutcome::InsideBand);
        assert_eq!(p.stress(), 50.0);
        assert_eq!(p.level(), 5);
        assert!((p.now() - t0 - config.convergence_time).abs() < 1e-6);
        assert!(!p.panicked());
    }

    #[test]
    fn soft_move_across_disjoint_bands_panics() {
        let config = SimConfig::default();
        let mut p = Plant::from_levels(even_table(), diagonal_matrix(), &config);
        assert_eq!(p.stress(), 90.0);
        // K9 -> K1 via a soft move.
        assert_eq!(p.move_to_cell(GridCell::SAFEST), MoveOutcome::PanicJump);
        assert_eq!(p.stress(), 90.0);
        assert!(p.panicked());
        assert_eq!(p.cell(), GridCell::SAFEST);
        assert_eq!(p.level(), 1);
    }

    #[test]
    fn hard_move_across_disjoint_bands_blocks() {
        let config = SimConfig::default();
        let mut p = Plant::starting_at(even_table(), diagonal_matrix(), GridCell::SAFEST, 10.0, &config);
        assert_eq!(p.move_to_cell(cell(2, 2)), MoveOutcome::PanicBlock);
        assert_eq!(p.stress(), 90.0);
        assert!(p.panicked());
    }

    #[test]
    fn overlapping_bands_clamp_then_converge() {
        let config = SimConfig::default();
        // 62 is outside the K4 band [35, 50], but the K5 and K4 bands overlap.
        let mut p = Plant::starting_at(even_table(), diagonal_matrix(), cell(2, 2), 62.0, &config);
        assert_eq!(p.move_to_cell(cell(2, 1)), MoveOutcome::OverlapClamp);
        assert_eq!(p.stress(), 40.0);
    }

    #[test]
    fn mixed_move_across_disjoint_bands_converges() {
        let config = SimConfig::default();
        // (3,0) K2 -> (0,4) K9: one index falls, one rises, bands disjoint.
        let matrix = LevelMatrix::from_levels([
            [1, 2, 3, 4, 9],
            [2, 3, 4, 5, 9],
            [3, 4, 5, 6, 9],
            [2, 5, 6, 7, 9],
            [5, 6, 7, 8, 9],
        ]);
        let mut p = Plant::starting_at(even_table(), matrix, cell(3, 0), 20.0, &config);
        assert_eq!(p.level(), 2);
        assert_eq!(p.move_to_cell(cell(0, 4)), MoveOutcome::MixedClamp);
        assert_eq!(p.stress(), 90.0);
        assert!(!p.panicked());
    }

    #[test]
    fn heartbeat_lags_and_crying_does_not() {
        let config = SimConfig::default();
        let mut p = Plant::starting_at(even_table(), diagonal_matrix(), cell(1, 1), 30.0, &config);
        p.advance(20.0);
        assert_eq!(p.move_to_cell(cell(1, 0)), MoveOutcome::InsideBand);
        // Convergence took 4 s; heart rate still reflects the old stress.
        assert_eq!(p.crying(), physiology::to_reading(physiology::crying(20.0)));
        assert_eq!(p.heartbeat(), physiology::to_reading(physiology::heartbeat(30.0)));
        p.advance(config.tau + 1.0);
        assert_eq!(p.heartbeat(), physiology::to_reading(physiology::heartbeat(20.0)));
    }
}
