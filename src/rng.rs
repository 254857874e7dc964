//! RNG (spec §4.1, component C1)
//!
//! Two distinct generators live here, deliberately kept apart:
//!
//! - [`SecureRng`] draws from OS entropy (`rand::rngs::OsRng`) for anything
//!   that must never be reproducible outside this process: the per-spin
//!   seed, per-spin hash salt, UUIDs.
//! - [`DeterministicStream`], returned by [`SecureRng::derive_stream`], is a
//!   pure function of `(seed, label, counter)` via SHA-256 (spec §4.1 "From
//!   wall-clock seeded sub-streams to deterministic derivation"). Everything
//!   downstream of the initial seed — grid generation, cascades, free-spin
//!   multiplier rolls — draws from a derived stream, never from OS entropy,
//!   so the entire spin is reproducible from `(seed, bet, context)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::audit::{AuditComponent, AuditKind, AuditRecord, AuditSink};
use crate::error::{EngineError, EngineResult};

/// Entropy-backed RNG for seed/salt/uuid generation. Stateless (OS entropy
/// has no per-call state to own), cheap to clone, safe to share across
/// threads — matches spec §5 ("RNG is thread-safe; counter-derived
/// sub-streams are per-call objects").
#[derive(Clone, Default)]
pub struct SecureRng {
    audit: Option<Arc<dyn AuditSink>>,
}

impl SecureRng {
    pub fn new() -> Self {
        Self { audit: None }
    }

    pub fn with_audit_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self { audit: Some(sink) }
    }

    fn emit(&self, kind: AuditKind, raw: Option<&[u8]>) {
        if let Some(sink) = &self.audit {
            let mut record = AuditRecord::new(now_ms(), AuditComponent::Rng, kind);
            if let Some(raw) = raw {
                record = record.with_hashed_value(raw);
            }
            sink.record(record);
        }
    }

    /// `secure_bytes(n)`: fatal at startup if the OS entropy source is
    /// unavailable (spec §4.1, §7 `RngEntropyUnavailable`). `OsRng` panics
    /// internally on failure; we can't intercept that panic portably, so
    /// this is documented as the process-fatal boundary spec §7 calls for.
    pub fn secure_bytes(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        OsRng.fill_bytes(&mut buf);
        self.emit(AuditKind::SecureBytesDrawn { len: n }, Some(&buf));
        buf
    }

    /// `uniform01()`: f64 in `[0, 1)` via 4 secure bytes / 2^32 (spec §4.1).
    pub fn uniform01(&self) -> f64 {
        let bytes = self.secure_bytes(4);
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 4294967296.0
    }

    /// `uniform_int(lo, hi)`: inclusive range.
    pub fn uniform_int(&self, lo: i64, hi: i64) -> EngineResult<i64> {
        if lo > hi {
            return Err(EngineError::EmptyRange);
        }
        let span = (hi - lo + 1) as u64;
        let bytes = self.secure_bytes(8);
        let raw = u64::from_be_bytes(bytes.try_into().unwrap());
        Ok(lo + (raw % span) as i64)
    }

    /// `weighted_pick(weights)`: pick an index proportional to its weight.
    pub fn weighted_pick(&self, weights: &[f64]) -> EngineResult<usize> {
        if weights.is_empty() {
            return Err(EngineError::InvalidWeights("empty table"));
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(EngineError::InvalidWeights("negative weight"));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::InvalidWeights("total weight <= 0"));
        }
        let mut target = self.uniform01() * total;
        for (idx, &w) in weights.iter().enumerate() {
            if target < w {
                return Ok(idx);
            }
            target -= w;
        }
        Ok(weights.len() - 1)
    }

    /// `shuffle(list)`: Fisher-Yates using `uniform_int`.
    pub fn shuffle<T>(&self, list: &mut [T]) -> EngineResult<()> {
        if list.len() < 2 {
            return Ok(());
        }
        for i in (1..list.len()).rev() {
            let j = self.uniform_int(0, i as i64)? as usize;
            list.swap(i, j);
        }
        Ok(())
    }

    /// `uuid_v4()`.
    pub fn uuid_v4(&self) -> String {
        let bytes = self.secure_bytes(16);
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        uuid::Builder::from_random_bytes(arr).into_uuid().to_string()
    }

    /// `generate_seed(len)`: hex-encoded.
    pub fn generate_seed(&self, len: usize) -> String {
        let seed = hex::encode(self.secure_bytes(len));
        self.emit(AuditKind::SeedGenerated, Some(seed.as_bytes()));
        seed
    }

    /// `derive_stream(seed, label)`: a deterministic sub-stream. Identical
    /// `(seed, label)` pairs must observe identical sequences across calls
    /// and across processes (spec §4.1).
    pub fn derive_stream(&self, seed: &str, label: &str) -> DeterministicStream {
        if let Some(sink) = &self.audit {
            sink.record(AuditRecord::new(
                now_ms(),
                AuditComponent::Rng,
                AuditKind::StreamDerived {
                    label: label.to_string(),
                },
            ));
        }
        DeterministicStream {
            seed: seed.to_string(),
            label: label.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

/// A deterministic sub-stream of `[0, 1)` floats derived from a seed and a
/// label. `SHA256(seed ‖ label ‖ k).first4bytes / 2^32`, `k` incrementing
/// from 0 on each call (spec §4.1).
pub struct DeterministicStream {
    seed: String,
    label: String,
    counter: AtomicU64,
}

impl DeterministicStream {
    /// Next value in `[0, 1)`.
    pub fn next(&self) -> f64 {
        let k = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.label.as_bytes());
        hasher.update(b"\0");
        hasher.update(k.to_be_bytes());
        let digest = hasher.finalize();
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as f64 / 4294967296.0
    }

    /// Weighted pick drawing from this deterministic stream instead of
    /// entropy — used by the grid generator and cascade refill so the whole
    /// spin is a pure function of the seed.
    pub fn weighted_pick(&self, weights: &[f64]) -> EngineResult<usize> {
        if weights.is_empty() {
            return Err(EngineError::InvalidWeights("empty table"));
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(EngineError::InvalidWeights("negative weight"));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::InvalidWeights("total weight <= 0"));
        }
        let mut target = self.next() * total;
        for (idx, &w) in weights.iter().enumerate() {
            if target < w {
                return Ok(idx);
            }
            target -= w;
        }
        Ok(weights.len() - 1)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_stream_is_deterministic() {
        let rng = SecureRng::new();
        let a = rng.derive_stream("seed-1", "grid");
        let b = rng.derive_stream("seed-1", "grid");
        let seq_a: Vec<f64> = (0..10).map(|_| a.next()).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.next()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn derive_stream_differs_by_label() {
        let rng = SecureRng::new();
        let a = rng.derive_stream("seed-1", "grid");
        let b = rng.derive_stream("seed-1", "cascade:0");
        assert_ne!(a.next(), b.next());
    }

    #[test]
    fn uniform01_is_bounded() {
        let rng = SecureRng::new();
        for _ in 0..100 {
            let v = rng.uniform01();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn weighted_pick_rejects_invalid_tables() {
        let rng = SecureRng::new();
        assert!(matches!(
            rng.weighted_pick(&[]),
            Err(EngineError::InvalidWeights(_))
        ));
        assert!(matches!(
            rng.weighted_pick(&[-1.0, 2.0]),
            Err(EngineError::InvalidWeights(_))
        ));
        assert!(matches!(
            rng.weighted_pick(&[0.0, 0.0]),
            Err(EngineError::InvalidWeights(_))
        ));
    }

    #[test]
    fn uniform_int_rejects_empty_range() {
        let rng = SecureRng::new();
        assert!(matches!(rng.uniform_int(5, 1), Err(EngineError::EmptyRange)));
    }

    #[test]
    fn shuffle_preserves_elements() {
        let rng = SecureRng::new();
        let mut list: Vec<u32> = (0..20).collect();
        let original = list.clone();
        rng.shuffle(&mut list).unwrap();
        let mut sorted = list.clone();
        sorted.sort();
        assert_eq!(sorted, original);
    }

    #[test]
    fn generate_seed_has_expected_hex_length() {
        let rng = SecureRng::new();
        let seed = rng.generate_seed(32);
        assert_eq!(seed.len(), 64);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
