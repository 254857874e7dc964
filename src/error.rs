//! Crate-wide error types

use thiserror::Error;

/// Errors surfaced by the spin pipeline, synchronizer, and validator.
///
/// Narrower per-module errors (`crate::win::WinError`, `crate::sync::SyncError`,
/// ...) compose into this type via `#[from]` at the points where the
/// orchestrator or a caller needs a single error surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bet {0} outside accepted range [{1}, {2}]")]
    InvalidBet(f64, f64, f64),

    #[error("free spins context mismatch: free_spins_active=true with no owning session id")]
    FreeSpinsContextMismatch,

    #[error("cascade limit reached ({0} steps); spin concluded with accrued totals")]
    CascadeLimitReached(u32),

    #[error("invalid weighted table: {0}")]
    InvalidWeights(&'static str),

    #[error("empty sampling range: lo > hi")]
    EmptyRange,

    #[error("invalid grid shape: expected {expected_cols}x{expected_rows}, got {cols}x{rows}")]
    InvalidGridShape {
        expected_cols: usize,
        expected_rows: usize,
        cols: usize,
        rows: usize,
    },

    #[error("invalid symbol id: {0}")]
    InvalidSymbol(String),

    #[error("hash mismatch for {0}")]
    HashMismatch(&'static str),

    #[error("timing out of tolerance: drift {drift_ms}ms exceeds {tolerance_ms}ms")]
    TimingOutOfTolerance { drift_ms: f64, tolerance_ms: f64 },

    #[error("sync session {0} timed out waiting for a step acknowledgement")]
    SyncTimeout(String),

    #[error("sync session {0} exhausted its recovery attempts")]
    RecoveryExhausted(String),

    #[error("RNG entropy source unavailable: {0}")]
    RngEntropyUnavailable(String),

    #[error("payout manipulation detected: {0}")]
    PayoutManipulation(String),

    #[error("insufficient funds for player {0}")]
    InsufficientFunds(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
