//! Session statistics (spec §10/§11 ambient & supplemented; grounded in the
//! teacher's `engine::SessionStats`)

use serde::{Deserialize, Serialize};

/// Aggregate stats across a run of spins. Presentation/reporting only —
/// never consulted by the payout pipeline itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_spins: u64,
    pub total_bet: f64,
    pub total_win: f64,
    pub wins: u64,
    pub losses: u64,
    pub big_wins: u64,
    pub mega_wins: u64,
    pub features_triggered: u64,
    pub max_win_ratio: f64,
    pub cascade_chains: u64,
}

impl SessionStats {
    pub fn record_spin(&mut self, bet: f64, total_win: f64, cascade_steps: u32, feature_triggered: bool, win_tiers: &crate::config::WinTierThresholds) {
        self.total_spins += 1;
        self.total_bet += bet;
        self.total_win += total_win;
        if total_win > 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        if cascade_steps > 0 {
            self.cascade_chains += 1;
        }
        if feature_triggered {
            self.features_triggered += 1;
        }

        let ratio = if bet > 0.0 { total_win / bet } else { 0.0 };
        self.max_win_ratio = self.max_win_ratio.max(ratio);
        if ratio >= win_tiers.mega_win {
            self.mega_wins += 1;
        } else if ratio >= win_tiers.big_win {
            self.big_wins += 1;
        }
    }

    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            self.total_win / self.total_bet
        } else {
            0.0
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_spins > 0 {
            self.wins as f64 / self.total_spins as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WinTierThresholds;

    #[test]
    fn rtp_and_hit_rate_track_recorded_spins() {
        let tiers = WinTierThresholds::default();
        let mut stats = SessionStats::default();
        stats.record_spin(1.0, 2.0, 1, false, &tiers);
        stats.record_spin(1.0, 0.0, 0, false, &tiers);
        assert_eq!(stats.total_spins, 2);
        assert_eq!(stats.rtp(), 1.0);
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
    }

    #[test]
    fn big_win_and_mega_win_classified_by_ratio() {
        let tiers = WinTierThresholds::default();
        let mut stats = SessionStats::default();
        stats.record_spin(1.0, 20.0, 2, false, &tiers);
        stats.record_spin(1.0, 30.0, 2, false, &tiers);
        assert_eq!(stats.big_wins, 1);
        assert_eq!(stats.mega_wins, 1);
    }
}
