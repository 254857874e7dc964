//! Slot engine configuration (spec §6.5)

use serde::{Deserialize, Serialize};

/// Grid dimensions. `spec.md` fixes these at 6 columns x 5 rows, but the
/// pipeline reads them from here rather than hard-coding them so the
/// invariants stay honest about what drives the shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: usize,
    pub rows: usize,
}

impl GridSpec {
    pub fn total_positions(&self) -> usize {
        self.cols * self.rows
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { cols: 6, rows: 5 }
    }
}

/// Minimum cluster sizes for a match (spec §3, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMatchConfig {
    pub cluster: usize,
    pub scatter: usize,
}

impl Default for MinMatchConfig {
    fn default() -> Self {
        Self {
            cluster: 8,
            scatter: 4,
        }
    }
}

/// Accepted bet range (spec §6.5, §7 `InvalidBet`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetRange {
    pub min: f64,
    pub max: f64,
}

impl Default for BetRange {
    fn default() -> Self {
        Self {
            min: 0.40,
            max: 2000.00,
        }
    }
}

impl BetRange {
    pub fn contains(&self, bet: f64) -> bool {
        bet.is_finite() && bet >= self.min && bet <= self.max
    }
}

/// Per-cell scatter probability, base game vs. free spins (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterChance {
    pub base: f64,
    pub free_spins: f64,
}

impl Default for ScatterChance {
    fn default() -> Self {
        Self {
            base: 0.035,
            free_spins: 0.025,
        }
    }
}

/// Free spins award table (spec §4.7, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeSpinsConfig {
    pub scatter_award: u32,
    pub retrigger_award: u32,
    pub buy_cost_multiplier: f64,
    pub buy_spins: u32,
    pub trigger_scatter_count: usize,
}

impl Default for FreeSpinsConfig {
    fn default() -> Self {
        Self {
            scatter_award: 15,
            retrigger_award: 5,
            buy_cost_multiplier: 100.0,
            buy_spins: 15,
            trigger_scatter_count: 4,
        }
    }
}

/// Random multiplier engine tuning (spec §4.6, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierConfig {
    pub trigger_chance: f64,
    pub min_win: f64,
    pub fs_cascade_chance: f64,
    /// Probability of `thanos` over `witch` when sampling character metadata.
    pub thanos_chance: f64,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            trigger_chance: 0.40,
            min_win: 0.01,
            fs_cascade_chance: 0.35,
            thanos_chance: 0.8,
        }
    }
}

/// Cascade synchronizer tuning (spec §4.10, §5, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub step_timeout_ms: u64,
    pub max_recovery_attempts: u32,
    pub tolerance_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 5_000,
            max_recovery_attempts: 3,
            tolerance_ms: 1_000,
        }
    }
}

/// Win-tier presentation thresholds (bet-multiplier ratios); metadata only,
/// never payout-affecting. Grounded in the teacher's `WinTierThresholds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinTierThresholds {
    pub big_win: f64,
    pub mega_win: f64,
    pub epic_win: f64,
    pub ultra_win: f64,
}

impl Default for WinTierThresholds {
    fn default() -> Self {
        Self {
            big_win: 15.0,
            mega_win: 25.0,
            epic_win: 50.0,
            ultra_win: 100.0,
        }
    }
}

/// Minimum cascade phase durations (spec §4.5), keyed by `quick_spin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub quick_min_ms: f64,
    pub normal_min_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            quick_min_ms: 150.0,
            normal_min_ms: 200.0,
        }
    }
}

/// Complete engine configuration. Serializable so it can be loaded from a
/// YAML or JSON config file by an external loader; this crate only owns the
/// shape and defaults, not the file I/O (out of scope per spec §1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub grid: GridSpec,
    pub min_match: MinMatchConfig,
    pub max_win_multiplier: f64,
    pub bet: BetRange,
    pub scatter_chance: ScatterChance,
    pub free_spins: FreeSpinsConfig,
    pub multiplier: MultiplierConfig,
    pub sync: SyncConfig,
    pub win_tiers: WinTierThresholds,
    pub timing: TimingConfig,
    pub max_cascade_steps: u32,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            min_match: MinMatchConfig::default(),
            max_win_multiplier: 5000.0,
            bet: BetRange::default(),
            scatter_chance: ScatterChance::default(),
            free_spins: FreeSpinsConfig::default(),
            multiplier: MultiplierConfig::default(),
            sync: SyncConfig::default(),
            win_tiers: WinTierThresholds::default(),
            timing: TimingConfig::default(),
            max_cascade_steps: 20,
        }
    }
}

impl SlotConfig {
    /// Deserialize from a YAML document (external loader hands us the string).
    pub fn from_yaml(doc: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(doc)
    }

    /// Deserialize from a JSON document.
    pub fn from_json(doc: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = SlotConfig::default();
        assert_eq!(cfg.grid.cols, 6);
        assert_eq!(cfg.grid.rows, 5);
        assert_eq!(cfg.min_match.cluster, 8);
        assert_eq!(cfg.min_match.scatter, 4);
        assert_eq!(cfg.max_win_multiplier, 5000.0);
        assert_eq!(cfg.bet.min, 0.40);
        assert_eq!(cfg.bet.max, 2000.00);
        assert_eq!(cfg.free_spins.scatter_award, 15);
        assert_eq!(cfg.free_spins.retrigger_award, 5);
        assert_eq!(cfg.sync.max_recovery_attempts, 3);
    }

    #[test]
    fn bet_range_boundaries() {
        let cfg = SlotConfig::default();
        assert!(cfg.bet.contains(0.40));
        assert!(cfg.bet.contains(2000.00));
        assert!(!cfg.bet.contains(0.39));
        assert!(!cfg.bet.contains(2000.01));
        assert!(!cfg.bet.contains(f64::NAN));
    }

    #[test]
    fn round_trip_yaml() {
        let cfg = SlotConfig::default();
        let yaml = serde_yml::to_string(&cfg).unwrap();
        let back = SlotConfig::from_yaml(&yaml).unwrap();
        assert_eq!(cfg, back);
    }
}
