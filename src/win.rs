//! Win calculator: flood-fill cluster detection and tiered payout (spec §4.4,
//! component C4)

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::symbols::SymbolTable;

/// A set of same-symbol, 4-connected positions (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub symbol_id: &'static str,
    pub positions: Vec<(usize, usize)>,
}

/// One cluster's computed payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterWin {
    pub cluster: Cluster,
    pub tier: usize,
    pub payout: f64,
}

/// Scatter payout, computed once per spin from the initial grid (spec
/// §4.4: "added once per spin (not per cascade)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPayout {
    pub count: usize,
    pub payout: f64,
}

/// Rounds to two decimals, half-away-from-zero (spec §4.4, §9 "From float
/// arithmetic to decimal rounding").
pub fn round2(value: f64) -> f64 {
    if value >= 0.0 {
        (value * 100.0 + 0.5).floor() / 100.0
    } else {
        (value * 100.0 - 0.5).ceil() / 100.0
    }
}

/// Flood-fill cluster detection over 4-neighbour adjacency, scatters
/// excluded, emitted in column-major discovery order (spec §4.4). A
/// shared `visited` set across the outer scan means candidate clusters
/// never overlap.
pub fn find_clusters(grid: &Grid, table: &SymbolTable, min_cluster: usize) -> Vec<Cluster> {
    let scatter_id = table.scatter_id();
    let mut visited: HashSet<(usize, usize)> = HashSet::new();
    let mut clusters = Vec::new();

    for (col, row) in grid.positions() {
        if visited.contains(&(col, row)) {
            continue;
        }
        let Some(symbol_id) = grid.get(col, row) else {
            continue;
        };
        if symbol_id == scatter_id {
            continue;
        }

        let mut positions = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((col, row));
        visited.insert((col, row));

        while let Some((c, r)) = queue.pop_front() {
            positions.push((c, r));
            for (nc, nr) in neighbours(c, r, grid.cols, grid.rows) {
                if visited.contains(&(nc, nr)) {
                    continue;
                }
                if grid.get(nc, nr) == Some(symbol_id) {
                    visited.insert((nc, nr));
                    queue.push_back((nc, nr));
                }
            }
        }

        if positions.len() >= min_cluster {
            clusters.push(Cluster {
                symbol_id,
                positions,
            });
        }
    }

    clusters
}

fn neighbours(col: usize, row: usize, cols: usize, rows: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(4);
    if col > 0 {
        out.push((col - 1, row));
    }
    if col + 1 < cols {
        out.push((col + 1, row));
    }
    if row > 0 {
        out.push((col, row - 1));
    }
    if row + 1 < rows {
        out.push((col, row + 1));
    }
    out
}

/// `payout = (bet / 20) * payout_multiplier[tier(c)] * symbol_multiplier`
/// (spec §4.4).
pub fn score_clusters(clusters: &[Cluster], table: &SymbolTable, bet: f64) -> Vec<ClusterWin> {
    clusters
        .iter()
        .filter_map(|cluster| {
            let symbol = table.get(cluster.symbol_id)?;
            let tier = symbol.tier_for(cluster.positions.len())?;
            let base = bet / 20.0;
            let payout = round2(base * symbol.payout_for(cluster.positions.len()) * symbol.symbol_multiplier);
            Some(ClusterWin {
                cluster: cluster.clone(),
                tier,
                payout,
            })
        })
        .collect()
}

/// `(bet / 20) * payout[scatter_count]`, only when `scatter_count >= min`
/// (spec §4.4).
pub fn scatter_payout(scatter_count: usize, table: &SymbolTable, bet: f64, min_scatter: usize) -> Option<ScatterPayout> {
    if scatter_count < min_scatter {
        return None;
    }
    let scatter = table.scatter();
    let base = bet / 20.0;
    let payout = round2(base * scatter.payout_for(scatter_count));
    Some(ScatterPayout {
        count: scatter_count,
        payout,
    })
}
