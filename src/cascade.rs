//! Cascade processor: removal, gravity, refill (spec §4.5, component C5)

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::GridSpec;
use crate::error::EngineResult;
use crate::grid::Grid;
use crate::rng::SecureRng;
use crate::symbols::SymbolTable;
use crate::win::{find_clusters, score_clusters, Cluster, ClusterWin};

/// Where a post-refill symbol came from: `row < 0` means it dropped in from
/// above the visible grid (spec §4.5 "drop pattern").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropOrigin {
    pub col: usize,
    pub origin_row: i64,
    pub landed_row: usize,
}

/// One cascade step: the grid before removal, the clusters that paid, the
/// grid after gravity + refill, and how far each new symbol dropped in from
/// (spec §4.5). The scatter payout is not part of a cascade step — it's
/// computed once from the initial grid by the orchestrator (spec §4.4, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeStep {
    pub index: u32,
    pub grid_before: Grid,
    pub clusters: Vec<ClusterWin>,
    pub step_win: f64,
    pub grid_after: Grid,
    pub drop_pattern: Vec<DropOrigin>,
    pub quick_min_ms: f64,
    pub normal_min_ms: f64,
}

/// Result of running a cascade sequence to completion: the accumulated steps
/// and whether the safety cap (`max_steps`) was hit before clusters stopped
/// forming. Hitting the cap is a warning, not a failure (spec §4.5, §4.8
/// Errors "`CascadeLimitReached` (warning only)", §7): the caller finalizes
/// the spin with whatever accrued and records the event itself.
pub struct CascadeRun {
    pub steps: Vec<CascadeStep>,
    pub limit_reached: bool,
}

/// Removes matched positions, settles remaining symbols via gravity, then
/// refills from the top using a per-step deterministic sub-stream (spec
/// §4.5). Capped at `max_steps`.
pub struct CascadeProcessor<'a> {
    spec: GridSpec,
    table: &'a SymbolTable,
    min_cluster: usize,
    max_steps: u32,
}

impl<'a> CascadeProcessor<'a> {
    pub fn new(spec: GridSpec, table: &'a SymbolTable, min_cluster: usize, max_steps: u32) -> Self {
        Self {
            spec,
            table,
            min_cluster,
            max_steps,
        }
    }

    /// Runs the full cascade sequence for one spin starting from
    /// `initial_grid`. Each iteration is one match → remove → gravity →
    /// refill cycle (GLOSSARY "Cascade"); the loop stops as soon as no
    /// qualifying cluster remains, producing zero steps for a grid with no
    /// clusters at all regardless of any scatter payout (spec §4.8
    /// pseudocode: scatter is added to `total` outside this loop).
    pub fn run(
        &self,
        rng: &SecureRng,
        spin_seed: &str,
        initial_grid: Grid,
        bet: f64,
        quick_spin: bool,
        timing: (f64, f64),
    ) -> EngineResult<CascadeRun> {
        let mut steps = Vec::new();
        let mut grid = initial_grid;
        let mut index: u32 = 0;
        let mut limit_reached = false;

        loop {
            let clusters = find_clusters(&grid, self.table, self.min_cluster);
            if clusters.is_empty() {
                break;
            }

            if index >= self.max_steps {
                limit_reached = true;
                break;
            }

            let wins = score_clusters(&clusters, self.table, bet);
            let step_win = wins.iter().map(|w| w.payout).sum::<f64>();

            let grid_before = grid.clone();
            let (grid_after, drop_pattern) = self.settle_and_refill(&grid, &clusters, rng, spin_seed, index)?;

            steps.push(CascadeStep {
                index,
                grid_before,
                clusters: wins,
                step_win,
                grid_after: grid_after.clone(),
                drop_pattern,
                quick_min_ms: if quick_spin { timing.0 } else { timing.1 },
                normal_min_ms: timing.1,
            });

            grid = grid_after;
            index += 1;
        }

        debug!("cascade sequence settled after {} steps (limit_reached={limit_reached})", steps.len());
        Ok(CascadeRun { steps, limit_reached })
    }

    fn settle_and_refill(
        &self,
        grid: &Grid,
        clusters: &[Cluster],
        rng: &SecureRng,
        spin_seed: &str,
        cascade_index: u32,
    ) -> EngineResult<(Grid, Vec<DropOrigin>)> {
        let mut removed = Grid::empty(self.spec);
        for (c, r) in grid.positions() {
            removed.set(c, r, grid.get(c, r));
        }
        for cluster in clusters {
            for &(c, r) in &cluster.positions {
                removed.set(c, r, None);
            }
        }

        let stream = rng.derive_stream(spin_seed, &format!("cascade:{cascade_index}"));
        let (ids, weights) = self.table.regular_weights(false);
        let scatter_id = self.table.scatter_id();
        let scatter_chance = 0.0; // scatters don't refill mid-cascade (spec §4.5)

        let mut out = Grid::empty(self.spec);
        let mut drop_pattern = Vec::new();

        for c in 0..self.spec.cols {
            let existing: Vec<&'static str> = (0..self.spec.rows)
                .filter_map(|r| removed.get(c, r))
                .collect();
            let missing = self.spec.rows - existing.len();

            let mut new_symbols = Vec::with_capacity(missing);
            for _ in 0..missing {
                let symbol = if stream.next() < scatter_chance {
                    scatter_id
                } else {
                    let idx = stream.weighted_pick(&weights)?;
                    ids[idx]
                };
                new_symbols.push(symbol);
            }

            for (landed_row, &symbol) in new_symbols.iter().enumerate() {
                out.set(c, landed_row, Some(symbol));
                drop_pattern.push(DropOrigin {
                    col: c,
                    origin_row: landed_row as i64 - missing as i64,
                    landed_row,
                });
            }
            for (offset, &symbol) in existing.iter().enumerate() {
                out.set(c, missing + offset, Some(symbol));
            }
        }

        Ok((out, drop_pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SecureRng;

    fn gem_cluster_grid() -> Grid {
        let mut grid = Grid::empty(GridSpec::default());
        for r in 0..5 {
            grid.set(0, r, Some("gem_red"));
        }
        for r in 0..3 {
            grid.set(1, r, Some("gem_red"));
        }
        for c in 2..6 {
            for r in 0..5 {
                grid.set(c, r, Some("gem_blue"));
            }
        }
        // Break the big gem_blue cluster so it doesn't also cascade away.
        grid.set(5, 4, Some("witch_sigil"));
        grid
    }

    #[test]
    fn cascade_terminates_and_settles_after_matches_clear() {
        let table = SymbolTable::standard();
        let spec = GridSpec::default();
        let processor = CascadeProcessor::new(spec, &table, 8, 20);
        let rng = SecureRng::new();
        let grid = gem_cluster_grid();

        let run = processor.run(&rng, "seed-a", grid, 1.0, false, (150.0, 200.0)).unwrap();
        assert!(!run.limit_reached);
        assert!(!run.steps.is_empty());
        assert!(run.steps[0].step_win > 0.0);
        let last = run.steps.last().unwrap();
        assert!(last.grid_after.is_settled());
        assert!(last.grid_after.all_filled());
    }

    #[test]
    fn scatter_only_grid_with_no_cluster_produces_no_steps() {
        // Four scatters but no qualifying cluster: cascade_steps must stay
        // empty, the scatter payout is the orchestrator's job (spec §4.8).
        let table = SymbolTable::standard();
        let spec = GridSpec::default();
        let processor = CascadeProcessor::new(spec, &table, 8, 20);
        let rng = SecureRng::new();

        let mut grid = Grid::empty(spec);
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
        let scatter_id = table.scatter_id();
        grid.set(4, 4, Some(scatter_id));
        grid.set(4, 0, Some(scatter_id));
        grid.set(3, 4, Some(scatter_id));
        grid.set(3, 0, Some(scatter_id));

        let run = processor.run(&rng, "seed-b", grid, 1.0, false, (150.0, 200.0)).unwrap();
        assert!(run.steps.is_empty());
        assert!(!run.limit_reached);
    }

    #[test]
    fn deterministic_refill_same_seed_same_outcome() {
        let table = SymbolTable::standard();
        let spec = GridSpec::default();
        let processor = CascadeProcessor::new(spec, &table, 8, 20);
        let rng = SecureRng::new();

        let run_a = processor.run(&rng, "fixed", gem_cluster_grid(), 1.0, false, (150.0, 200.0)).unwrap();
        let run_b = processor.run(&rng, "fixed", gem_cluster_grid(), 1.0, false, (150.0, 200.0)).unwrap();

        let grids_a: Vec<_> = run_a.steps.iter().map(|s| s.grid_after.clone()).collect();
        let grids_b: Vec<_> = run_b.steps.iter().map(|s| s.grid_after.clone()).collect();
        assert_eq!(grids_a, grids_b);
    }

    #[test]
    fn no_match_grid_produces_no_steps() {
        let table = SymbolTable::standard();
        let spec = GridSpec::default();
        let processor = CascadeProcessor::new(spec, &table, 8, 20);
        let rng = SecureRng::new();

        let mut grid = Grid::empty(spec);
        let palette = [
            "gem_red", "gem_green", "gem_blue", "gem_purple", "gem_yellow", "gem_orange",
        ];
        // Sequential assignment across 6 distinct symbols with a 5-row column
        // height: consecutive cells always differ mod 6, so no two orthogonal
        // neighbours ever match.
        let mut i = 0usize;
        for c in 0..spec.cols {
            for r in 0..spec.rows {
                grid.set(c, r, Some(palette[i % palette.len()]));
                i += 1;
            }
        }
        let run = processor.run(&rng, "seed-c", grid, 1.0, false, (150.0, 200.0)).unwrap();
        assert!(run.steps.is_empty());
        assert!(!run.limit_reached);
    }

    #[test]
    fn cascade_limit_reached_warns_but_keeps_accrued_steps() {
        let table = SymbolTable::standard();
        let spec = GridSpec::default();
        // max_steps = 0 forces the very first iteration to hit the cap.
        let processor = CascadeProcessor::new(spec, &table, 8, 0);
        let rng = SecureRng::new();
        let run = processor
            .run(&rng, "seed-d", gem_cluster_grid(), 1.0, false, (150.0, 200.0))
            .unwrap();
        assert!(run.limit_reached);
        assert!(run.steps.is_empty());
    }
}
