//! Symbol distribution (spec §4.2, component C2)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Closed set of symbol classifications (spec §3, §9 "tagged variants").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Low,
    High,
    Scatter,
}

/// A symbol in the closed ten-symbol set: six low-pay gems, two high-pay
/// characters, one top-pay character, one scatter (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub id: &'static str,
    pub kind: SymbolKind,
    /// Unnormalized base-game weight.
    pub base_weight: u32,
    /// Free-spin weight multiplier: <=1 for gems (scarcer), >1 for high/top
    /// (spec §4.2 — "Open Questions" flags the multiplicative-vs-renormalized
    /// ambiguity from the original source; this crate resolves it as a
    /// multiplicative factor applied to the base weight, see DESIGN.md).
    pub fs_weight_factor: f64,
    /// Payout multiplier per cluster-size tier, regular symbols: {8, 10, 12}.
    /// Scatter instead keys by exact count: {4, 5, 6}.
    pub pay_table: BTreeMap<usize, f64>,
    /// Extra scalar applied on top of the tiered payout; defaults to 1.0
    /// (spec §4.4 `symbol_multiplier`).
    pub symbol_multiplier: f64,
}

impl SymbolDef {
    fn regular(id: &'static str, kind: SymbolKind, base_weight: u32, fs_weight_factor: f64, tiers: [f64; 3]) -> Self {
        let mut pay_table = BTreeMap::new();
        pay_table.insert(8, tiers[0]);
        pay_table.insert(10, tiers[1]);
        pay_table.insert(12, tiers[2]);
        Self {
            id,
            kind,
            base_weight,
            fs_weight_factor,
            pay_table,
            symbol_multiplier: 1.0,
        }
    }

    fn scatter(id: &'static str, base_weight: u32, fs_weight_factor: f64, pays: [f64; 3]) -> Self {
        let mut pay_table = BTreeMap::new();
        pay_table.insert(4, pays[0]);
        pay_table.insert(5, pays[1]);
        pay_table.insert(6, pays[2]);
        Self {
            id,
            kind: SymbolKind::Scatter,
            base_weight,
            fs_weight_factor,
            pay_table,
            symbol_multiplier: 1.0,
        }
    }

    /// Greatest tier key `<= c` with a defined payout, or `None` if `c` is
    /// below the lowest tier (spec §4.2 "tiers a cluster size c to the
    /// greatest key <= c").
    pub fn tier_for(&self, count: usize) -> Option<usize> {
        self.pay_table
            .keys()
            .rev()
            .find(|&&tier| tier <= count)
            .copied()
    }

    /// Payout multiplier for a cluster/scatter count, 0 if below the lowest
    /// tier.
    pub fn payout_for(&self, count: usize) -> f64 {
        self.tier_for(count)
            .and_then(|tier| self.pay_table.get(&tier))
            .copied()
            .unwrap_or(0.0)
    }
}

/// The closed ten-symbol table plus both weight totals, computed once at
/// construction (spec §4.2: "computes base total and free-spin total once
/// at init").
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<SymbolDef>,
    base_total: f64,
    fs_total: f64,
    scatter_index: usize,
}

impl SymbolTable {
    /// Standard distribution: six gems, two high-pay characters, one
    /// top-pay character, one scatter (`infinity_glove`).
    pub fn standard() -> Self {
        let symbols = vec![
            SymbolDef::regular("gem_red", SymbolKind::Low, 180, 0.9, [0.25, 0.5, 2.0]),
            SymbolDef::regular("gem_green", SymbolKind::Low, 170, 0.9, [0.3, 0.6, 2.5]),
            SymbolDef::regular("gem_blue", SymbolKind::Low, 160, 0.9, [0.4, 0.8, 3.0]),
            SymbolDef::regular("gem_purple", SymbolKind::Low, 140, 0.85, [0.5, 1.0, 4.0]),
            SymbolDef::regular("gem_yellow", SymbolKind::Low, 120, 0.85, [0.6, 1.2, 5.0]),
            SymbolDef::regular("gem_orange", SymbolKind::Low, 100, 0.8, [0.8, 1.6, 6.0]),
            SymbolDef::regular("witch_sigil", SymbolKind::High, 60, 1.2, [2.0, 5.0, 15.0]),
            SymbolDef::regular("thanos_gauntlet", SymbolKind::High, 45, 1.3, [3.0, 8.0, 25.0]),
            SymbolDef::regular("infinity_stone", SymbolKind::High, 25, 1.5, [5.0, 15.0, 50.0]),
            SymbolDef::scatter("infinity_glove", 20, 0.9, [2.0, 5.0, 20.0]),
        ];

        let base_total = symbols.iter().map(|s| s.base_weight as f64).sum();
        let fs_total = symbols
            .iter()
            .map(|s| s.base_weight as f64 * s.fs_weight_factor)
            .sum();
        let scatter_index = symbols
            .iter()
            .position(|s| s.kind == SymbolKind::Scatter)
            .expect("standard table always carries exactly one scatter");

        Self {
            symbols,
            base_total,
            fs_total,
            scatter_index,
        }
    }

    pub fn symbols(&self) -> &[SymbolDef] {
        &self.symbols
    }

    pub fn scatter(&self) -> &SymbolDef {
        &self.symbols[self.scatter_index]
    }

    pub fn scatter_id(&self) -> &'static str {
        self.symbols[self.scatter_index].id
    }

    pub fn get(&self, id: &str) -> Option<&SymbolDef> {
        self.symbols.iter().find(|s| s.id == id)
    }

    /// Non-scatter symbols and their weights for the requested mode, in
    /// table order (spec §4.3: weighted-pick "among the nine non-scatter
    /// symbols").
    pub fn regular_weights(&self, free_spins: bool) -> (Vec<&'static str>, Vec<f64>) {
        self.symbols
            .iter()
            .filter(|s| s.kind != SymbolKind::Scatter)
            .map(|s| {
                let w = if free_spins {
                    s.base_weight as f64 * s.fs_weight_factor
                } else {
                    s.base_weight as f64
                };
                (s.id, w)
            })
            .unzip()
    }

    pub fn base_total(&self) -> f64 {
        self.base_total
    }

    pub fn fs_total(&self) -> f64 {
        self.fs_total
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_ten_symbols_one_scatter() {
        let table = SymbolTable::standard();
        assert_eq!(table.symbols().len(), 10);
        assert_eq!(
            table.symbols().iter().filter(|s| s.kind == SymbolKind::Scatter).count(),
            1
        );
        assert_eq!(
            table.symbols().iter().filter(|s| s.kind == SymbolKind::Low).count(),
            6
        );
        assert_eq!(
            table.symbols().iter().filter(|s| s.kind == SymbolKind::High).count(),
            3
        );
    }

    #[test]
    fn tier_mapping_matches_spec_boundaries() {
        // Cluster sizes 7..13 map to tiers -, 8, 8, 10, 10, 12, 12 (spec §8).
        let symbol = SymbolDef::regular("x", SymbolKind::Low, 1, 1.0, [1.0, 2.0, 3.0]);
        assert_eq!(symbol.tier_for(7), None);
        assert_eq!(symbol.tier_for(8), Some(8));
        assert_eq!(symbol.tier_for(9), Some(8));
        assert_eq!(symbol.tier_for(10), Some(10));
        assert_eq!(symbol.tier_for(11), Some(10));
        assert_eq!(symbol.tier_for(12), Some(12));
        assert_eq!(symbol.tier_for(13), Some(12));
    }

    #[test]
    fn scatter_tiers_are_exact_counts() {
        let table = SymbolTable::standard();
        let scatter = table.scatter();
        assert_eq!(scatter.payout_for(3), 0.0);
        assert!(scatter.payout_for(4) > 0.0);
        assert!(scatter.payout_for(7) > 0.0); // clamps to 6-tier payout
    }

    #[test]
    fn free_spin_weights_favor_high_tier_symbols() {
        let table = SymbolTable::standard();
        let (ids, base) = table.regular_weights(false);
        let (_, fs) = table.regular_weights(true);
        let top_idx = ids.iter().position(|&id| id == "infinity_stone").unwrap();
        assert!(fs[top_idx] > base[top_idx]);
        let gem_idx = ids.iter().position(|&id| id == "gem_red").unwrap();
        assert!(fs[gem_idx] < base[gem_idx]);
    }
}
