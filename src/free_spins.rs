//! Free spins engine and session lifecycle (spec §4.7, §3, component C7)

use std::collections::HashMap;

use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::FreeSpinsConfig;
use crate::error::{EngineError, EngineResult};

/// Lifecycle state of a free spins session (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// A free spins session: spins remaining, accumulated multiplier, and total
/// winnings across the feature (spec §3 `FreeSpinsSession`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeSpinsSession {
    pub session_id: String,
    pub bet: f64,
    pub spins_remaining: u32,
    pub spins_played: u32,
    /// Additive across random-multiplier rolls during the session; never
    /// drops below 1.0 (spec §4.6, §4.7).
    pub accumulated_multiplier: f64,
    pub total_win: f64,
    pub status: SessionStatus,
}

impl FreeSpinsSession {
    fn new(session_id: String, bet: f64, spins: u32) -> Self {
        Self {
            session_id,
            bet,
            spins_remaining: spins,
            spins_played: 0,
            accumulated_multiplier: 1.0,
            total_win: 0.0,
            status: SessionStatus::Active,
        }
    }

    fn retrigger(&mut self, additional: u32) {
        self.spins_remaining += additional;
    }

    fn apply_multiplier(&mut self, value: u32) {
        self.accumulated_multiplier += value as f64;
    }

    fn record_spin(&mut self, win: f64) {
        self.spins_played += 1;
        self.spins_remaining = self.spins_remaining.saturating_sub(1);
        self.total_win += win;
        if self.spins_remaining == 0 {
            self.status = SessionStatus::Completed;
        }
    }
}

/// Owns the set of in-flight free spins sessions. Single-writer: every
/// mutation goes through `&mut self` methods behind one lock, matching the
/// teacher's project-state discipline.
#[derive(Default)]
pub struct FreeSpinsEngine {
    config: FreeSpinsConfig,
    sessions: RwLock<HashMap<String, FreeSpinsSession>>,
}

impl FreeSpinsEngine {
    pub fn new(config: FreeSpinsConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Starts a new session from a base-game scatter trigger
    /// (`scatter_count >= trigger_scatter_count`), awarding `scatter_award`
    /// spins (spec §4.7).
    pub fn trigger(&self, session_id: String, bet: f64, scatter_count: usize) -> Option<FreeSpinsSession> {
        if scatter_count < self.config.trigger_scatter_count {
            return None;
        }
        let session = FreeSpinsSession::new(session_id.clone(), bet, self.config.scatter_award);
        info!("free spins triggered: session={session_id}, scatter_count={scatter_count}, spins={}", self.config.scatter_award);
        self.sessions.write().insert(session_id, session.clone());
        Some(session)
    }

    /// Starts a session via the buy-feature path: costs
    /// `bet * buy_cost_multiplier`, awards `buy_spins` spins directly
    /// (spec §4.7).
    pub fn buy(&self, session_id: String, bet: f64) -> (FreeSpinsSession, f64) {
        let cost = bet * self.config.buy_cost_multiplier;
        let session = FreeSpinsSession::new(session_id.clone(), bet, self.config.buy_spins);
        self.sessions.write().insert(session_id, session.clone());
        (session, cost)
    }

    /// Retriggers an active session with `retrigger_award` additional spins
    /// when enough scatters land mid-session (spec §4.7).
    pub fn retrigger(&self, session_id: &str, scatter_count: usize) -> EngineResult<()> {
        if scatter_count < self.config.trigger_scatter_count {
            return Ok(());
        }
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::FreeSpinsContextMismatch)?;
        if session.status != SessionStatus::Active {
            return Err(EngineError::FreeSpinsContextMismatch);
        }
        session.retrigger(self.config.retrigger_award);
        Ok(())
    }

    /// Applies a random-multiplier roll to the session's accumulated
    /// multiplier (spec §4.6 additive rule).
    pub fn apply_multiplier(&self, session_id: &str, value: u32) -> EngineResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::FreeSpinsContextMismatch)?;
        session.apply_multiplier(value);
        Ok(())
    }

    /// Consumes one spin, recording its win against the session and closing
    /// it once spins run out (spec §3 active/completed transition).
    pub fn record_spin(&self, session_id: &str, win: f64) -> EngineResult<FreeSpinsSession> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::FreeSpinsContextMismatch)?;
        if session.status != SessionStatus::Active {
            return Err(EngineError::FreeSpinsContextMismatch);
        }
        session.record_spin(win);
        Ok(session.clone())
    }

    pub fn get(&self, session_id: &str) -> Option<FreeSpinsSession> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.status == SessionStatus::Active)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_requires_minimum_scatter_count() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        assert!(engine.trigger("s1".into(), 1.0, 3).is_none());
        let session = engine.trigger("s1".into(), 1.0, 4).unwrap();
        assert_eq!(session.spins_remaining, 15);
        assert_eq!(session.accumulated_multiplier, 1.0);
    }

    #[test]
    fn retrigger_adds_spins_to_active_session() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        engine.trigger("s1".into(), 1.0, 4).unwrap();
        engine.retrigger("s1", 4).unwrap();
        let session = engine.get("s1").unwrap();
        assert_eq!(session.spins_remaining, 20);
    }

    #[test]
    fn buy_feature_charges_expected_cost_and_spins() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        let (session, cost) = engine.buy("s2".into(), 2.0);
        assert_eq!(cost, 200.0);
        assert_eq!(session.spins_remaining, 15);
    }

    #[test]
    fn multiplier_accumulates_additively() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        engine.trigger("s1".into(), 1.0, 4).unwrap();
        engine.apply_multiplier("s1", 5).unwrap();
        engine.apply_multiplier("s1", 3).unwrap();
        let session = engine.get("s1").unwrap();
        assert_eq!(session.accumulated_multiplier, 1.0 + 5.0 + 3.0);
    }

    #[test]
    fn session_completes_after_spins_exhausted() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        engine.trigger("s1".into(), 1.0, 4).unwrap();
        for _ in 0..15 {
            engine.record_spin("s1", 1.0).unwrap();
        }
        let session = engine.get("s1").unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(!engine.is_active("s1"));
        assert_eq!(session.spins_played, 15);
    }

    #[test]
    fn spin_on_completed_session_errors() {
        let engine = FreeSpinsEngine::new(FreeSpinsConfig::default());
        engine.trigger("s1".into(), 1.0, 4).unwrap();
        for _ in 0..15 {
            engine.record_spin("s1", 0.0).unwrap();
        }
        assert!(engine.record_spin("s1", 0.0).is_err());
    }
}
