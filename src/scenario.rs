//! Forced-outcome scenario scaffolding for tests (spec §11 supplemented
//! feature, grounded in the teacher's `spin::ForcedOutcome`). Not wired into
//! [`crate::orchestrator::SpinOrchestrator::process_spin`] — scenarios build
//! grids and cascade steps directly for assertions, they never steer the
//! production RNG path.

use crate::config::GridSpec;
use crate::grid::Grid;
use crate::symbols::SymbolTable;

/// A named, hand-built outcome useful for exercising a specific code path in
/// tests without depending on RNG luck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedOutcome {
    NoWin,
    SingleCluster,
    MultiCluster,
    ScatterTrigger,
    NearCapWin,
}

impl ForcedOutcome {
    /// Builds the initial grid this scenario calls for.
    pub fn build_grid(self, table: &SymbolTable) -> Grid {
        let spec = GridSpec::default();
        let mut grid = Grid::empty(spec);
        match self {
            ForcedOutcome::NoWin => {
                let palette = [
                    "gem_red", "gem_green", "gem_blue", "gem_purple", "gem_yellow", "gem_orange",
                ];
                let mut i = 0usize;
                for c in 0..spec.cols {
                    for r in 0..spec.rows {
                        grid.set(c, r, Some(palette[i % palette.len()]));
                        i += 1;
                    }
                }
            }
            ForcedOutcome::SingleCluster | ForcedOutcome::NearCapWin => {
                let symbol = if self == ForcedOutcome::NearCapWin {
                    "infinity_stone"
                } else {
                    "gem_red"
                };
                for r in 0..spec.rows {
                    grid.set(0, r, Some(symbol));
                }
                for r in 0..3 {
                    grid.set(1, r, Some(symbol));
                }
                fill_rest(&mut grid, spec, "gem_blue", &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (1, 0), (1, 1), (1, 2)]);
            }
            ForcedOutcome::MultiCluster => {
                for r in 0..spec.rows {
                    grid.set(0, r, Some("gem_red"));
                }
                for r in 0..3 {
                    grid.set(1, r, Some("gem_red"));
                }
                for r in 0..spec.rows {
                    grid.set(4, r, Some("gem_blue"));
                }
                for r in 0..3 {
                    grid.set(5, r, Some("gem_blue"));
                }
                fill_rest(
                    &mut grid,
                    spec,
                    "gem_purple",
                    &[
                        (0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (1, 0), (1, 1), (1, 2),
                        (4, 0), (4, 1), (4, 2), (4, 3), (4, 4), (5, 0), (5, 1), (5, 2),
                    ],
                );
            }
            ForcedOutcome::ScatterTrigger => {
                let scatter_id = table.scatter_id();
                let positions = [(0, 0), (1, 1), (2, 2), (3, 3)];
                for &(c, r) in &positions {
                    grid.set(c, r, Some(scatter_id));
                }
                fill_rest(&mut grid, spec, "gem_green", &positions);
            }
        }
        grid
    }
}

fn fill_rest(grid: &mut Grid, spec: GridSpec, filler: &'static str, skip: &[(usize, usize)]) {
    for c in 0..spec.cols {
        for r in 0..spec.rows {
            if grid.get(c, r).is_none() && !skip.contains(&(c, r)) {
                grid.set(c, r, Some(filler));
            }
        }
    }
}
