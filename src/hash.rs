//! Integrity hasher: canonical serialization + salted SHA-256 (spec §4.9,
//! component C9)

use sha2::{Digest, Sha256};

use crate::cascade::CascadeStep;
use crate::grid::Grid;

/// What a hash was computed over (spec §4.9 scopes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScope {
    Grid,
    Step,
    FullResult,
}

impl HashScope {
    fn label(self) -> &'static str {
        match self {
            HashScope::Grid => "grid",
            HashScope::Step => "step",
            HashScope::FullResult => "full_result",
        }
    }
}

/// Canonicalizes a grid into a fixed, whitespace-free, lexicographically
/// ordered representation: `col:row:symbol` triples joined by `|`, columns
/// then rows ascending (spec §4.9 "canonical serialization").
pub fn canonical_grid(grid: &Grid) -> String {
    let mut out = String::new();
    for (col, row) in grid.positions() {
        let symbol = grid.get(col, row).unwrap_or("_");
        out.push_str(&format!("{col}:{row}:{symbol}|"));
    }
    out
}

/// Canonicalizes one cascade step's payout-relevant fields: the before/after
/// grids and the step win with fixed two-decimal formatting (spec §4.9).
pub fn canonical_step(step: &CascadeStep) -> String {
    format!(
        "{}#{}#{:.2}#{}",
        step.index,
        canonical_grid(&step.grid_before),
        step.step_win,
        canonical_grid(&step.grid_after),
    )
}

/// Canonicalizes a full spin result: every step in order plus the final
/// totals, fixed two-decimal formatting throughout (spec §4.9).
pub fn canonical_full_result(bet: f64, steps: &[CascadeStep], total_win: f64) -> String {
    let mut out = format!("{bet:.2}#");
    for step in steps {
        out.push_str(&canonical_step(step));
        out.push('#');
    }
    out.push_str(&format!("{total_win:.2}"));
    out
}

/// Computes `SHA256(canonical ‖ salt)` hex-encoded (spec §4.9). The salt is
/// per-spin, 16 bytes, generated once by the orchestrator via
/// [`crate::rng::SecureRng::generate_seed`].
pub fn compute(canonical: &str, salt: &str, scope: HashScope) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(b"\0");
    hasher.update(salt.as_bytes());
    hasher.update(b"\0");
    hasher.update(scope.label().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridSpec;

    #[test]
    fn canonical_grid_has_no_whitespace() {
        let grid = Grid::empty(GridSpec::default());
        let canon = canonical_grid(&grid);
        assert!(!canon.contains(' '));
        assert!(!canon.contains('\n'));
    }

    #[test]
    fn same_grid_same_salt_same_hash() {
        let grid = Grid::empty(GridSpec::default());
        let canon = canonical_grid(&grid);
        let h1 = compute(&canon, "salt-1", HashScope::Grid);
        let h2 = compute(&canon, "salt-1", HashScope::Grid);
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_salt_changes_hash() {
        let grid = Grid::empty(GridSpec::default());
        let canon = canonical_grid(&grid);
        let h1 = compute(&canon, "salt-1", HashScope::Grid);
        let h2 = compute(&canon, "salt-2", HashScope::Grid);
        assert_ne!(h1, h2);
    }

    #[test]
    fn different_scope_changes_hash_for_same_canonical_and_salt() {
        let grid = Grid::empty(GridSpec::default());
        let canon = canonical_grid(&grid);
        let h1 = compute(&canon, "salt-1", HashScope::Grid);
        let h2 = compute(&canon, "salt-1", HashScope::FullResult);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_is_sixty_four_hex_chars() {
        let grid = Grid::empty(GridSpec::default());
        let canon = canonical_grid(&grid);
        let h = compute(&canon, "salt-1", HashScope::Grid);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
