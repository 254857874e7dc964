//! Spin orchestrator (spec §4.8, component C8)
//!
//! Ties together the grid generator, cascade processor, multiplier engine,
//! free spins engine, and integrity hasher into the single `process_spin`
//! entry point a caller drives per wager (spec §4.8 pseudocode contract).

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditComponent, AuditKind, AuditRecord, AuditSink};
use crate::cascade::{CascadeProcessor, CascadeStep};
use crate::config::SlotConfig;
use crate::error::{EngineError, EngineResult};
use crate::free_spins::FreeSpinsEngine;
use crate::grid::{Grid, GridGenerator};
use crate::hash::{canonical_full_result, canonical_grid, compute, HashScope};
use crate::multiplier::{roll_base_game, roll_free_spins, MultiplierRoll, MultiplierTable};
use crate::rng::SecureRng;
use crate::symbols::SymbolTable;
use crate::win::scatter_payout;

/// Base game vs. an active free spins session (spec §3 `game_mode`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum GameMode {
    Base,
    FreeSpins { session_id: String },
}

/// Root spin result entity (spec §3 `SpinResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinResult {
    pub spin_id: String,
    pub timestamp_ms: i64,
    pub bet: f64,
    pub game_mode: GameMode,
    pub rng_seed: String,
    pub hash_salt: String,
    pub initial_grid: Grid,
    pub cascade_steps: Vec<CascadeStep>,
    pub final_grid: Grid,
    pub base_win: f64,
    pub accumulated_multiplier: f64,
    pub total_win: f64,
    pub multiplier_rolls: Vec<MultiplierRoll>,
    pub free_spins_triggered: bool,
    pub free_spins_session_id: Option<String>,
    pub win_capped: bool,
    pub validation_hash: String,
}

/// Wires the five spin-time collaborators together behind one call. Owns no
/// mutable state itself beyond the free spins session map; the RNG, symbol
/// table, and config are process-wide read-only resources (spec §9
/// "process-wide read-only RNG/distribution tables").
pub struct SpinOrchestrator {
    config: SlotConfig,
    table: SymbolTable,
    rng: SecureRng,
    multipliers: MultiplierTable,
    free_spins: FreeSpinsEngine,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SpinOrchestrator {
    pub fn new(config: SlotConfig) -> Self {
        let free_spins = FreeSpinsEngine::new(config.free_spins);
        Self {
            config,
            table: SymbolTable::standard(),
            rng: SecureRng::new(),
            multipliers: MultiplierTable::standard(),
            free_spins,
            audit: None,
        }
    }

    /// Same as `new`, but routes `WinCapped`/`CascadeLimitReached` events
    /// (and every RNG draw, via `SecureRng::with_audit_sink`) through the
    /// given sink instead of discarding them (spec §9).
    pub fn with_audit_sink(config: SlotConfig, sink: Arc<dyn AuditSink>) -> Self {
        let free_spins = FreeSpinsEngine::new(config.free_spins);
        Self {
            config,
            table: SymbolTable::standard(),
            rng: SecureRng::with_audit_sink(sink.clone()),
            multipliers: MultiplierTable::standard(),
            free_spins,
            audit: Some(sink),
        }
    }

    pub fn free_spins_engine(&self) -> &FreeSpinsEngine {
        &self.free_spins
    }

    fn emit_audit(&self, kind: AuditKind) {
        if let Some(sink) = &self.audit {
            sink.record(AuditRecord::new(now_ms(), AuditComponent::Orchestrator, kind));
        }
    }

    /// Executes one full spin: validates the bet, generates the initial
    /// grid, runs cascades to completion, rolls multipliers, settles free
    /// spins bookkeeping, caps the total win, and seals the result with a
    /// validation hash (spec §4.8).
    pub fn process_spin(&self, bet: f64, mode: GameMode) -> EngineResult<SpinResult> {
        debug!("process_spin: bet={bet}, mode={mode:?}");
        if !self.config.bet.contains(bet) {
            warn!("process_spin rejected: bet {bet} outside [{}, {}]", self.config.bet.min, self.config.bet.max);
            return Err(EngineError::InvalidBet(bet, self.config.bet.min, self.config.bet.max));
        }

        let free_spins_active = matches!(mode, GameMode::FreeSpins { .. });
        if let GameMode::FreeSpins { session_id } = &mode {
            if !self.free_spins.is_active(session_id) {
                return Err(EngineError::FreeSpinsContextMismatch);
            }
        }

        let spin_id = self.rng.uuid_v4();
        let rng_seed = self.rng.generate_seed(32);
        let hash_salt = self.rng.generate_seed(16);
        let timestamp_ms = now_ms();

        let grid_gen = GridGenerator::new(self.config.grid, &self.table);
        let grid_stream = self.rng.derive_stream(&rng_seed, "grid");
        let initial_grid = grid_gen.generate(
            &grid_stream,
            self.config.scatter_chance.base,
            self.config.scatter_chance.free_spins,
            free_spins_active,
        )?;

        let processor = CascadeProcessor::new(
            self.config.grid,
            &self.table,
            self.config.min_match.cluster,
            self.config.max_cascade_steps,
        );
        let cascade_run = processor.run(
            &self.rng,
            &rng_seed,
            initial_grid.clone(),
            bet,
            false,
            (self.config.timing.quick_min_ms, self.config.timing.normal_min_ms),
        )?;
        let mut cascade_steps = cascade_run.steps;
        if cascade_run.limit_reached {
            warn!("process_spin {spin_id}: cascade limit reached at {} steps; spin finalizes with accrued totals", self.config.max_cascade_steps);
            self.emit_audit(AuditKind::CascadeLimitReached {
                steps: self.config.max_cascade_steps,
            });
        }

        let scatter_count = initial_grid.count_scatters(self.table.scatter_id());
        let scatter_win = scatter_payout(scatter_count, &self.table, bet, self.config.min_match.scatter)
            .map(|s| s.payout)
            .unwrap_or(0.0);

        let mult_stream = self.rng.derive_stream(&rng_seed, "multiplier");
        let mut multiplier_rolls = Vec::new();
        let mut accumulated_multiplier = if let GameMode::FreeSpins { session_id } = &mode {
            self.free_spins
                .get(session_id)
                .map(|s| s.accumulated_multiplier)
                .unwrap_or(1.0)
        } else {
            1.0
        };

        if free_spins_active {
            for step in &cascade_steps {
                if let Some(roll) = roll_free_spins(&self.config.multiplier, &mult_stream, &self.multipliers, step.index) {
                    accumulated_multiplier += roll.value as f64;
                    multiplier_rolls.push(roll);
                }
            }
        }

        let cascade_win: f64 = cascade_steps.iter().map(|s| s.step_win).sum();
        let base_win = cascade_win + scatter_win;

        // Single post-cascade trigger, gated on the spin's total win
        // including the scatter payout (spec §4.6, §4.8 pseudocode).
        let multiplicative_factor: f64 = if free_spins_active {
            1.0
        } else if let Some(roll) = roll_base_game(&self.config.multiplier, &mult_stream, &self.multipliers, base_win) {
            let value = roll.value as f64;
            multiplier_rolls.push(roll);
            value
        } else {
            1.0
        };

        let raw_total = if free_spins_active {
            base_win * accumulated_multiplier
        } else {
            base_win * multiplicative_factor
        };

        let cap = bet * self.config.max_win_multiplier;
        let win_capped = raw_total > cap;
        if win_capped {
            warn!("process_spin {spin_id}: win {raw_total:.2} capped to {cap:.2}");
            self.emit_audit(AuditKind::WinCapped {
                bet,
                uncapped: raw_total,
                capped: cap,
            });
        }
        let total_win = crate::win::round2(if win_capped { cap } else { raw_total });

        let mut free_spins_triggered = false;
        let mut free_spins_session_id = None;

        match &mode {
            GameMode::Base => {
                if scatter_count >= self.config.free_spins.trigger_scatter_count {
                    let session_id = self.rng.uuid_v4();
                    self.free_spins.trigger(session_id.clone(), bet, scatter_count);
                    free_spins_triggered = true;
                    free_spins_session_id = Some(session_id);
                }
            }
            GameMode::FreeSpins { session_id } => {
                self.free_spins.retrigger(session_id, scatter_count)?;
                if accumulated_multiplier > 1.0 {
                    let delta = accumulated_multiplier
                        - self.free_spins.get(session_id).map(|s| s.accumulated_multiplier).unwrap_or(1.0);
                    if delta > 0.0 {
                        self.free_spins.apply_multiplier(session_id, delta.round() as u32)?;
                    }
                }
                self.free_spins.record_spin(session_id, total_win)?;
                free_spins_session_id = Some(session_id.clone());
            }
        }

        let final_grid = cascade_steps
            .last()
            .map(|s| s.grid_after.clone())
            .unwrap_or_else(|| initial_grid.clone());

        let validation_hash = compute(
            &canonical_full_result(bet, &cascade_steps, total_win),
            &hash_salt,
            HashScope::FullResult,
        );
        let _ = canonical_grid(&initial_grid);

        cascade_steps.shrink_to_fit();

        info!(
            "process_spin {spin_id} complete: {} cascade steps, total_win={total_win:.2}",
            cascade_steps.len()
        );

        Ok(SpinResult {
            spin_id,
            timestamp_ms,
            bet,
            game_mode: mode,
            rng_seed,
            hash_salt,
            initial_grid,
            cascade_steps,
            final_grid,
            base_win,
            accumulated_multiplier,
            total_win,
            multiplier_rolls,
            free_spins_triggered,
            free_spins_session_id,
            win_capped,
            validation_hash,
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
