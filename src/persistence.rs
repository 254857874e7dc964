//! Persistence and wallet boundary traits (spec §6.2, §6.3). This crate owns
//! the contract only; concrete storage and wallet integrations live outside
//! it (spec §1 scope boundary).

use crate::error::EngineResult;
use crate::orchestrator::SpinResult;

/// Durable storage for sealed spin results, keyed by `spin_id`.
pub trait SpinStore: Send + Sync {
    fn save(&self, result: &SpinResult) -> EngineResult<()>;
    fn load(&self, spin_id: &str) -> EngineResult<Option<SpinResult>>;
}

/// Debits and credits against a player's balance. The pipeline calls this at
/// the edges of `process_spin`; it never reasons about balances itself.
pub trait WalletClient: Send + Sync {
    fn debit(&self, player_id: &str, amount: f64) -> EngineResult<()>;
    fn credit(&self, player_id: &str, amount: f64) -> EngineResult<()>;
    fn balance(&self, player_id: &str) -> EngineResult<f64>;
}
