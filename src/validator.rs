//! Cascade and spin validator: structural, physics, timing, payout checks
//! plus advisory fraud heuristics (spec §4.11, component C11)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cascade::CascadeStep;
use crate::config::SlotConfig;
use crate::grid::Grid;
use crate::orchestrator::SpinResult;
use crate::symbols::SymbolTable;

/// A single structural/physics/timing/payout check failure. Hard failures
/// invalidate the spin; fraud flags are advisory only (spec §4.11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub detail: String,
}

/// Advisory fraud heuristic kind (spec §4.11 "advisory fraud heuristics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudKind {
    GeometricCluster,
    SymbolRun,
    UniformGrid,
    RepeatedTiles,
    ImpossibleWin,
    CascadeCountOutlier,
    WinRateOutlier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudFlag {
    pub kind: FraudKind,
    pub score: f64,
    pub detail: String,
}

/// Full validation outcome: hard issues plus advisory fraud flags. `is_valid`
/// reflects only the hard issues — fraud flags never block a spin on their
/// own (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
    pub fraud_flags: Vec<FraudFlag>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

const PAYOUT_TOLERANCE: f64 = 0.01;

/// Validates one spin result end to end against structural, continuity,
/// timing, and payout rules, then layers on advisory fraud scoring
/// (spec §4.11).
pub struct CascadeValidator<'a> {
    config: &'a SlotConfig,
    table: &'a SymbolTable,
}

impl<'a> CascadeValidator<'a> {
    pub fn new(config: &'a SlotConfig, table: &'a SymbolTable) -> Self {
        Self { config, table }
    }

    pub fn validate(&self, result: &SpinResult) -> ValidationOutcome {
        let mut issues = Vec::new();

        if let Err(err) = result.initial_grid.validate_shape(self.config.grid) {
            issues.push(ValidationIssue {
                code: "invalid_shape",
                detail: err.to_string(),
            });
        }
        if let Err(err) = result.initial_grid.validate_membership(self.table) {
            issues.push(ValidationIssue {
                code: "invalid_membership",
                detail: err.to_string(),
            });
        }
        if !result.initial_grid.all_filled() {
            issues.push(ValidationIssue {
                code: "floating_symbols",
                detail: "initial grid has empty cells".into(),
            });
        }

        self.check_continuity(&result.initial_grid, &result.cascade_steps, &mut issues);
        self.check_payouts(&result.cascade_steps, &mut issues);

        let fraud_flags = self.score_fraud(result);

        ValidationOutcome { issues, fraud_flags }
    }

    /// `step[n].grid_before == step[n-1].grid_after` continuity, plus
    /// cluster 4-connectivity re-verification (spec §4.11).
    fn check_continuity(&self, initial_grid: &Grid, steps: &[CascadeStep], issues: &mut Vec<ValidationIssue>) {
        let mut previous = initial_grid;
        for step in steps {
            if &step.grid_before != previous {
                issues.push(ValidationIssue {
                    code: "discontinuous_cascade",
                    detail: format!("step {} grid_before does not match prior grid_after", step.index),
                });
            }
            if !step.grid_after.is_settled() {
                issues.push(ValidationIssue {
                    code: "unsettled_grid",
                    detail: format!("step {} grid_after violates the gravity invariant", step.index),
                });
            }
            for win in &step.clusters {
                if !is_connected(&win.cluster.positions) {
                    issues.push(ValidationIssue {
                        code: "disconnected_cluster",
                        detail: format!("step {} cluster of {} is not 4-connected", step.index, win.cluster.symbol_id),
                    });
                }
            }
            previous = &step.grid_after;
        }
    }

    /// `|step_win - sum(cluster.payout)| <= 0.01` (spec §4.11). The scatter
    /// payout is not part of any cascade step (it's added once to the spin
    /// total by the orchestrator, spec §4.4, §4.8) so it plays no part here.
    fn check_payouts(&self, steps: &[CascadeStep], issues: &mut Vec<ValidationIssue>) {
        for step in steps {
            let expected: f64 = step.clusters.iter().map(|c| c.payout).sum::<f64>();
            if (step.step_win - expected).abs() > PAYOUT_TOLERANCE {
                issues.push(ValidationIssue {
                    code: "payout_mismatch",
                    detail: format!(
                        "step {} declares win {:.2}, clusters sum to {:.2}",
                        step.index, step.step_win, expected
                    ),
                });
            }
        }
    }

    /// Advisory-only fraud heuristics: never push a hard issue, only a
    /// scored flag (spec §4.11).
    fn score_fraud(&self, result: &SpinResult) -> Vec<FraudFlag> {
        let mut flags = Vec::new();

        if is_geometric(&result.initial_grid) {
            flags.push(FraudFlag {
                kind: FraudKind::GeometricCluster,
                score: 0.6,
                detail: "initial grid exhibits a suspiciously regular pattern".into(),
            });
        }

        if result.cascade_steps.len() as u32 >= self.config.max_cascade_steps {
            flags.push(FraudFlag {
                kind: FraudKind::CascadeCountOutlier,
                score: 0.5,
                detail: "cascade chain reached the configured step ceiling".into(),
            });
        }

        let cap = result.bet * self.config.max_win_multiplier;
        if result.total_win >= cap - PAYOUT_TOLERANCE && !result.win_capped {
            flags.push(FraudFlag {
                kind: FraudKind::ImpossibleWin,
                score: 0.9,
                detail: "win sits at the cap boundary without the capped flag set".into(),
            });
        }

        flags
    }
}

fn is_connected(positions: &[(usize, usize)]) -> bool {
    if positions.is_empty() {
        return true;
    }
    let set: std::collections::HashSet<(usize, usize)> = positions.iter().copied().collect();
    let mut visited = std::collections::HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(positions[0]);
    visited.insert(positions[0]);
    while let Some((c, r)) = queue.pop_front() {
        let candidates = [
            (c.wrapping_sub(1), r),
            (c + 1, r),
            (c, r.wrapping_sub(1)),
            (c, r + 1),
        ];
        for next in candidates {
            if set.contains(&next) && !visited.contains(&next) {
                visited.insert(next);
                queue.push_back(next);
            }
        }
    }
    visited.len() == positions.len()
}

/// Flags grids where every column repeats the same symbol sequence, a
/// pattern real spins essentially never produce (spec §4.11).
fn is_geometric(grid: &Grid) -> bool {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for (col, row) in grid.positions() {
        if let Some(symbol) = grid.get(col, row) {
            *counts.entry(symbol).or_insert(0) += 1;
        }
    }
    let total = grid.cols * grid.rows;
    counts.values().any(|&count| count as f64 / total as f64 > 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridSpec;
    use crate::orchestrator::GameMode;

    #[test]
    fn connected_positions_pass() {
        assert!(is_connected(&[(0, 0), (0, 1), (1, 1)]));
    }

    #[test]
    fn disconnected_positions_fail() {
        assert!(!is_connected(&[(0, 0), (3, 3)]));
    }

    #[test]
    fn uniform_grid_flagged_as_geometric() {
        let mut grid = Grid::empty(GridSpec::default());
        for (c, r) in grid.positions() {
            grid.set(c, r, Some("gem_red"));
        }
        assert!(is_geometric(&grid));
    }

    #[test]
    fn full_pipeline_result_validates_clean() {
        let config = SlotConfig::default();
        let table = SymbolTable::standard();
        let orchestrator = crate::orchestrator::SpinOrchestrator::new(config.clone());
        let result = orchestrator.process_spin(1.0, GameMode::Base).unwrap();
        let validator = CascadeValidator::new(&config, &table);
        let outcome = validator.validate(&result);
        assert!(outcome.is_valid(), "{:?}", outcome.issues);
    }
}
