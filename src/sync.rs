//! Cascade synchronizer: server/client step streaming protocol (spec §4.10,
//! §5, component C10)

use std::collections::HashMap;

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::{EngineError, EngineResult};

/// Directional wire events exchanged between server and client during a
/// cascade stream (spec §4.10). `InitSpin`/`StepPush` carry the server's
/// grid hash for the client to echo back in `InitAck`/`StepAck`; the
/// transition table's hash-match guards (spec §4.10) compare these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SyncEvent {
    InitSpin { sync_id: String, total_steps: u32, grid_hash: String },
    InitAck { sync_id: String, grid_hash: String },
    StepPush { sync_id: String, step_index: u32, grid_hash: String },
    StepAck { sync_id: String, step_index: u32, grid_hash: String },
    DesyncReport { sync_id: String, step_index: u32, desync_type: DesyncType },
    RecoveryCommand { sync_id: String, strategy: RecoveryStrategy },
    RecoveryComplete { sync_id: String },
    StreamComplete { sync_id: String },
}

/// Kind of desynchronization the client observed (spec §4.10, §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesyncType {
    Hash,
    Validation,
    Timing,
    Grid,
}

/// Recovery strategies, tried in desync-type-specific order as attempts
/// escalate (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    StateResync,
    StepReplay,
    FullResync,
    TimingAdjustment,
    GridCorrection,
    CascadeReplay,
}

/// Recovery escalation order per desync type, indexed by attempt number
/// (0-based); the last entry is used for every attempt beyond the table's
/// length (spec §4.10).
fn recovery_ladder(kind: DesyncType) -> &'static [RecoveryStrategy] {
    use RecoveryStrategy::*;
    match kind {
        DesyncType::Hash | DesyncType::Validation => &[StateResync, StepReplay, FullResync],
        DesyncType::Timing => &[TimingAdjustment, StepReplay, FullResync],
        DesyncType::Grid => &[GridCorrection, CascadeReplay, FullResync],
    }
}

fn strategy_for_attempt(kind: DesyncType, attempt: u32) -> RecoveryStrategy {
    let ladder = recovery_ladder(kind);
    let idx = (attempt as usize).min(ladder.len() - 1);
    ladder[idx]
}

/// State machine phase of a sync session (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    AwaitingInitAck,
    StreamingSteps,
    Recovering,
    Completed,
    Failed,
}

/// One cascade synchronization session (spec §3, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSession {
    pub sync_id: String,
    pub total_steps: u32,
    pub last_acked_step: Option<u32>,
    pub phase: SyncPhase,
    pub recovery_attempts: u32,
    expected_init_hash: String,
    expected_step_hashes: HashMap<u32, String>,
    /// FIFO queue of events not yet processed for this session (spec §4.10
    /// "FIFO per sync_id ordering").
    pending: Vec<SyncEvent>,
}

impl SyncSession {
    fn new(sync_id: String, total_steps: u32, grid_hash: String) -> Self {
        Self {
            sync_id,
            total_steps,
            last_acked_step: None,
            phase: SyncPhase::AwaitingInitAck,
            recovery_attempts: 0,
            expected_init_hash: grid_hash,
            expected_step_hashes: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn expected_step_index(&self) -> u32 {
        self.last_acked_step.map(|n| n + 1).unwrap_or(0)
    }
}

/// Owns all in-flight sync sessions (spec §9 single-writer session map).
#[derive(Default)]
pub struct CascadeSynchronizer {
    config: SyncConfig,
    sessions: RwLock<HashMap<String, SyncSession>>,
}

impl CascadeSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn init(&self, sync_id: String, total_steps: u32, grid_hash: String) -> SyncEvent {
        let session = SyncSession::new(sync_id.clone(), total_steps, grid_hash.clone());
        self.sessions.write().insert(sync_id.clone(), session);
        SyncEvent::InitSpin {
            sync_id,
            total_steps,
            grid_hash,
        }
    }

    /// Records the hash a client is expected to echo back for `step_index`
    /// before the corresponding `StepPush` is sent (spec §4.10 transition
    /// table: `streaming_steps → streaming_steps` requires "hash matches").
    pub fn register_step_hash(&self, sync_id: &str, step_index: u32, hash: String) -> EngineResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(sync_id)
            .ok_or_else(|| EngineError::SyncTimeout(sync_id.to_string()))?;
        session.expected_step_hashes.insert(step_index, hash);
        Ok(())
    }

    /// Enqueues an inbound event for FIFO processing, then drains and
    /// applies it immediately (single-threaded driver; the queue exists so
    /// out-of-order delivery at the transport layer still processes events
    /// in receipt order per session, spec §4.10).
    pub fn handle(&self, event: SyncEvent) -> EngineResult<Vec<SyncEvent>> {
        let sync_id = sync_id_of(&event).to_string();
        {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(&sync_id)
                .ok_or_else(|| EngineError::SyncTimeout(sync_id.clone()))?;
            session.pending.push(event);
        }
        self.drain(&sync_id)
    }

    fn drain(&self, sync_id: &str) -> EngineResult<Vec<SyncEvent>> {
        let mut responses = Vec::new();
        loop {
            let event = {
                let mut sessions = self.sessions.write();
                let session = sessions
                    .get_mut(sync_id)
                    .ok_or_else(|| EngineError::SyncTimeout(sync_id.to_string()))?;
                if session.pending.is_empty() {
                    break;
                }
                session.pending.remove(0)
            };
            if let Some(response) = self.apply(sync_id, event)? {
                responses.push(response);
            }
        }
        Ok(responses)
    }

    fn apply(&self, sync_id: &str, event: SyncEvent) -> EngineResult<Option<SyncEvent>> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(sync_id)
            .ok_or_else(|| EngineError::SyncTimeout(sync_id.to_string()))?;

        match event {
            SyncEvent::InitAck { grid_hash, .. } => {
                if grid_hash != session.expected_init_hash {
                    warn!("sync {sync_id} init hash mismatch");
                    return escalate(session, sync_id, DesyncType::Hash, &self.config);
                }
                session.phase = SyncPhase::StreamingSteps;
                Ok(None)
            }
            SyncEvent::StepAck { step_index, grid_hash, .. } => {
                let expected_index = session.expected_step_index();
                if step_index != expected_index {
                    warn!("sync {sync_id} step ack out of order: got {step_index}, expected {expected_index}");
                    return escalate(session, sync_id, DesyncType::Grid, &self.config);
                }
                if let Some(expected_hash) = session.expected_step_hashes.get(&step_index) {
                    if expected_hash != &grid_hash {
                        warn!("sync {sync_id} step {step_index} hash mismatch");
                        return escalate(session, sync_id, DesyncType::Hash, &self.config);
                    }
                }
                session.last_acked_step = Some(step_index);
                if step_index + 1 >= session.total_steps {
                    session.phase = SyncPhase::Completed;
                    return Ok(Some(SyncEvent::StreamComplete {
                        sync_id: sync_id.to_string(),
                    }));
                }
                Ok(None)
            }
            SyncEvent::DesyncReport {
                step_index,
                desync_type,
                ..
            } => {
                warn!("sync {sync_id} desync at step {step_index}: {desync_type:?}");
                escalate(session, sync_id, desync_type, &self.config)
            }
            SyncEvent::RecoveryComplete { .. } => {
                session.phase = SyncPhase::StreamingSteps;
                Ok(None)
            }
            other => Ok(Some(other)),
        }
    }

    pub fn get(&self, sync_id: &str) -> Option<SyncSession> {
        self.sessions.read().get(sync_id).cloned()
    }

    pub fn step_timeout_ms(&self) -> u64 {
        self.config.step_timeout_ms
    }
}

/// Routes a detected mismatch (hash or ordering) through the same
/// recovery-attempt ladder and max-attempts/`Failed` bookkeeping as an
/// explicit `DesyncReport`, so InitAck/StepAck mismatches and client-reported
/// desyncs share one escalation path (spec §4.10).
fn escalate(
    session: &mut SyncSession,
    sync_id: &str,
    desync_type: DesyncType,
    config: &SyncConfig,
) -> EngineResult<Option<SyncEvent>> {
    if session.recovery_attempts >= config.max_recovery_attempts {
        session.phase = SyncPhase::Failed;
        return Err(EngineError::RecoveryExhausted(sync_id.to_string()));
    }
    session.phase = SyncPhase::Recovering;
    let strategy = strategy_for_attempt(desync_type, session.recovery_attempts);
    debug!("sync {sync_id} recovery attempt {}: {strategy:?}", session.recovery_attempts);
    session.recovery_attempts += 1;
    Ok(Some(SyncEvent::RecoveryCommand {
        sync_id: sync_id.to_string(),
        strategy,
    }))
}

fn sync_id_of(event: &SyncEvent) -> &str {
    match event {
        SyncEvent::InitSpin { sync_id, .. }
        | SyncEvent::InitAck { sync_id, .. }
        | SyncEvent::StepPush { sync_id, .. }
        | SyncEvent::StepAck { sync_id, .. }
        | SyncEvent::DesyncReport { sync_id, .. }
        | SyncEvent::RecoveryCommand { sync_id, .. }
        | SyncEvent::RecoveryComplete { sync_id }
        | SyncEvent::StreamComplete { sync_id } => sync_id,
    }
}
