//! Random multiplier engine (spec §4.6, component C6)

use serde::{Deserialize, Serialize};

use crate::config::MultiplierConfig;
use crate::rng::DeterministicStream;

/// Character shown alongside a multiplier roll; purely presentational, never
/// affects payout (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Thanos,
    Witch,
}

/// One multiplier roll: the value drawn and the character shown with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRoll {
    pub value: u32,
    pub character: Character,
}

/// The fixed 1000-entry weighted multiplier table (spec §4.6). Built once;
/// entries are grouped by value rather than literally repeated 1000 times.
pub struct MultiplierTable {
    values: Vec<u32>,
    weights: Vec<f64>,
}

const TABLE_ENTRIES: [(u32, u32); 10] = [
    (2, 487),
    (3, 200),
    (4, 90),
    (5, 70),
    (6, 70),
    (8, 40),
    (10, 20),
    (20, 10),
    (100, 10),
    (500, 3),
];

impl MultiplierTable {
    pub fn standard() -> Self {
        let values = TABLE_ENTRIES.iter().map(|&(v, _)| v).collect();
        let weights = TABLE_ENTRIES.iter().map(|&(_, w)| w as f64).collect();
        Self { values, weights }
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn draw(&self, stream: &DeterministicStream) -> u32 {
        let idx = stream
            .weighted_pick(&self.weights)
            .expect("standard multiplier table weights are always valid");
        self.values[idx]
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Rolls the single post-cascade base-game multiplier: triggered with
/// probability `trigger_chance`, only when the spin's accumulated total win
/// (cascade wins plus the scatter payout) is at least `min_win`, and applied
/// multiplicatively to that total. Rolled at most once per spin, after the
/// cascade loop has fully settled (spec §4.6, §4.8 pseudocode).
pub fn roll_base_game(
    config: &MultiplierConfig,
    stream: &DeterministicStream,
    table: &MultiplierTable,
    total_win: f64,
) -> Option<MultiplierRoll> {
    if total_win < config.min_win {
        return None;
    }
    if stream.next() >= config.trigger_chance {
        return None;
    }
    Some(MultiplierRoll {
        value: table.draw(stream),
        character: draw_character(config, stream),
    })
}

/// Rolls a free-spin cascade multiplier: only from the second cascade step
/// onward (`cascade_index >= 2`), additive to the session's accumulated
/// multiplier rather than multiplicative (spec §4.6, §4.7).
pub fn roll_free_spins(
    config: &MultiplierConfig,
    stream: &DeterministicStream,
    table: &MultiplierTable,
    cascade_index: u32,
) -> Option<MultiplierRoll> {
    if cascade_index < 2 {
        return None;
    }
    if stream.next() >= config.fs_cascade_chance {
        return None;
    }
    Some(MultiplierRoll {
        value: table.draw(stream),
        character: draw_character(config, stream),
    })
}

fn draw_character(config: &MultiplierConfig, stream: &DeterministicStream) -> Character {
    if stream.next() < config.thanos_chance {
        Character::Thanos
    } else {
        Character::Witch
    }
}
