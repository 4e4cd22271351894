//! Contest structure: type, payouts, and lifecycle phase.
//!
//! Contest definitions arrive from an external contest-management component;
//! this module only models what the simulator and cache need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contest style, which shapes the payout curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContestType {
    /// Pays roughly the top half a flat amount. Favors high-floor lineups.
    Cash,
    /// Guaranteed prize pool with a top-heavy curve. Favors high ceilings.
    Tournament,
}

/// A contiguous band of finishing ranks sharing one payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutTier {
    /// First rank in the band (1-based, inclusive).
    pub from_rank: usize,
    /// Last rank in the band (inclusive).
    pub to_rank: usize,
    /// Payout per entry in this band.
    pub payout: f64,
}

/// Ordered rank → payout tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayoutStructure {
    tiers: Vec<PayoutTier>,
}

impl PayoutStructure {
    /// Builds a structure from tiers, sorting by rank. Overlapping or
    /// zero-width tiers are rejected.
    pub fn new(mut tiers: Vec<PayoutTier>) -> Result<Self, String> {
        tiers.sort_by_key(|t| t.from_rank);
        for t in &tiers {
            if t.from_rank == 0 || t.to_rank < t.from_rank {
                return Err(format!(
                    "invalid payout tier: ranks {}-{}",
                    t.from_rank, t.to_rank
                ));
            }
            if t.payout < 0.0 {
                return Err(format!("negative payout for ranks {}-{}", t.from_rank, t.to_rank));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].from_rank <= pair[0].to_rank {
                return Err(format!(
                    "overlapping payout tiers at rank {}",
                    pair[1].from_rank
                ));
            }
        }
        Ok(Self { tiers })
    }

    /// Single winner takes the whole prize.
    #[must_use]
    pub fn winner_take_all(prize: f64) -> Self {
        Self {
            tiers: vec![PayoutTier {
                from_rank: 1,
                to_rank: 1,
                payout: prize,
            }],
        }
    }

    /// Top half of `entries` doubles the entry fee (minus rake).
    #[must_use]
    pub fn double_up(entries: usize, entry_fee: f64) -> Self {
        let paid = (entries / 2).max(1);
        Self {
            tiers: vec![PayoutTier {
                from_rank: 1,
                to_rank: paid,
                payout: entry_fee * 2.0,
            }],
        }
    }

    /// Tournament-style curve: 40% to the winner, 20% split over ranks 2-10,
    /// the rest spread over the top 20% of the field.
    #[must_use]
    pub fn top_heavy(entries: usize, prize_pool: f64) -> Self {
        let mut tiers = vec![PayoutTier {
            from_rank: 1,
            to_rank: 1,
            payout: prize_pool * 0.40,
        }];
        if entries >= 10 {
            tiers.push(PayoutTier {
                from_rank: 2,
                to_rank: 10,
                payout: prize_pool * 0.20 / 9.0,
            });
        }
        let paid_through = (entries / 5).max(11);
        if entries > 10 && paid_through > 10 {
            let band = (paid_through - 10) as f64;
            tiers.push(PayoutTier {
                from_rank: 11,
                to_rank: paid_through,
                payout: prize_pool * 0.40 / band,
            });
        }
        Self { tiers }
    }

    /// Payout for a finishing rank, or 0.0 outside the money.
    #[must_use]
    pub fn payout_for_rank(&self, rank: usize) -> f64 {
        self.tiers
            .iter()
            .find(|t| rank >= t.from_rank && rank <= t.to_rank)
            .map_or(0.0, |t| t.payout)
    }

    /// Worst rank that still pays, or None for an empty structure.
    #[must_use]
    pub fn min_cash_rank(&self) -> Option<usize> {
        self.tiers.iter().map(|t| t.to_rank).max()
    }

    /// Returns true when no tiers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Read-only view of the tiers.
    #[must_use]
    pub fn tiers(&self) -> &[PayoutTier] {
        &self.tiers
    }
}

/// Contest lifecycle, used by the result cache to pick a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContestPhase {
    /// Lock has not passed; projections still move.
    Scheduled,
    /// Games underway; data changes constantly.
    Live,
    /// Final; results are immutable history.
    Completed,
}

/// Contest metadata the engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    /// Display name.
    pub name: String,
    /// Cash or tournament.
    pub contest_type: ContestType,
    /// Entry fee per lineup.
    pub entry_fee: f64,
    /// Total field size.
    pub size: usize,
    /// Rank → payout tiers.
    pub payouts: PayoutStructure,
    /// Scheduled lock time.
    pub starts_at: DateTime<Utc>,
    /// Set once the contest has been graded.
    pub completed: bool,
}

impl Contest {
    /// Lifecycle phase as of `now`.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> ContestPhase {
        if self.completed {
            ContestPhase::Completed
        } else if now >= self.starts_at {
            ContestPhase::Live
        } else {
            ContestPhase::Scheduled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn payout_lookup_hits_band_and_misses_outside() {
        let payouts = PayoutStructure::new(vec![
            PayoutTier {
                from_rank: 1,
                to_rank: 1,
                payout: 100.0,
            },
            PayoutTier {
                from_rank: 2,
                to_rank: 5,
                payout: 20.0,
            },
        ])
        .unwrap();

        assert!((payouts.payout_for_rank(1) - 100.0).abs() < f64::EPSILON);
        assert!((payouts.payout_for_rank(4) - 20.0).abs() < f64::EPSILON);
        assert!((payouts.payout_for_rank(6) - 0.0).abs() < f64::EPSILON);
        assert_eq!(payouts.min_cash_rank(), Some(5));
    }

    #[test]
    fn overlapping_tiers_rejected() {
        let result = PayoutStructure::new(vec![
            PayoutTier {
                from_rank: 1,
                to_rank: 3,
                payout: 10.0,
            },
            PayoutTier {
                from_rank: 3,
                to_rank: 5,
                payout: 5.0,
            },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn double_up_pays_top_half() {
        let payouts = PayoutStructure::double_up(100, 10.0);
        assert!((payouts.payout_for_rank(50) - 20.0).abs() < f64::EPSILON);
        assert!((payouts.payout_for_rank(51) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn top_heavy_pays_winner_most() {
        let payouts = PayoutStructure::top_heavy(1_000, 10_000.0);
        let first = payouts.payout_for_rank(1);
        let second = payouts.payout_for_rank(2);
        assert!(first > second);
        assert!((first - 4_000.0).abs() < f64::EPSILON);
        assert!(payouts.payout_for_rank(200) > 0.0);
        assert!((payouts.payout_for_rank(201) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_follows_clock_and_completion() {
        let starts = Utc.with_ymd_and_hms(2025, 9, 7, 17, 0, 0).unwrap();
        let mut contest = Contest {
            name: "Main".to_string(),
            contest_type: ContestType::Tournament,
            entry_fee: 20.0,
            size: 1_000,
            payouts: PayoutStructure::top_heavy(1_000, 18_000.0),
            starts_at: starts,
            completed: false,
        };

        let before = Utc.with_ymd_and_hms(2025, 9, 7, 12, 0, 0).unwrap();
        let during = Utc.with_ymd_and_hms(2025, 9, 7, 18, 0, 0).unwrap();
        assert_eq!(contest.phase(before), ContestPhase::Scheduled);
        assert_eq!(contest.phase(during), ContestPhase::Live);

        contest.completed = true;
        assert_eq!(contest.phase(during), ContestPhase::Completed);
    }
}
