//! Structured audit channel (spec §9: "From callback/event-emitter audit to
//! structured channel").
//!
//! Raw RNG values and seeds are never logged (spec §4.1); only hashed
//! prefixes long enough to deduplicate. Every `AuditRecord` is written to an
//! out-of-band sink owned by the persistence collaborator — this crate only
//! defines the record shape and the trait a sink implements, the same way
//! `rf-slot-lab`'s feature chapters accept narrow trait objects at their
//! integration seams rather than concrete infrastructure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Component that produced an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditComponent {
    Rng,
    Orchestrator,
    Cascade,
    FreeSpins,
    Synchronizer,
    Validator,
}

/// Kind of event being audited. Kept as a closed tagged variant per spec §9
/// ("tagged variants", not a catch-all bag of fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AuditKind {
    SecureBytesDrawn { len: usize },
    SeedGenerated,
    StreamDerived { label: String },
    WinCapped { bet: f64, uncapped: f64, capped: f64 },
    CascadeLimitReached { steps: u32 },
    HashSealed { scope: &'static str },
    DesyncDetected { sync_id: String, step: u32 },
    RecoveryExhausted { sync_id: String },
    FraudFlag { reason: String, score: f64 },
}

/// One structured audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts_ms: i64,
    pub component: AuditComponent,
    pub kind: AuditKind,
    /// SHA-256 prefix of whatever raw value motivated the record, never the
    /// raw value itself (spec §4.1).
    pub hashed_value_prefix: Option<String>,
}

impl AuditRecord {
    pub fn new(ts_ms: i64, component: AuditComponent, kind: AuditKind) -> Self {
        Self {
            ts_ms,
            component,
            kind,
            hashed_value_prefix: None,
        }
    }

    pub fn with_hashed_value(mut self, raw: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw);
        let digest = hasher.finalize();
        self.hashed_value_prefix = Some(hex::encode(&digest[..8]));
        self
    }
}

/// Sink that durably records audit events. The real implementation lives
/// with the persistence collaborator (spec §1); this crate ships an
/// in-memory sink for tests and as a default for callers that don't need
/// durability.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// In-memory sink, single-writer via an internal lock, readable via
/// `drain()` snapshots (spec §9 single-writer discipline).
#[derive(Default)]
pub struct MemoryAuditSink {
    records: parking_lot::Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}
