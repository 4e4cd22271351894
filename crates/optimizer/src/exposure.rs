//! Batch-level exposure accounting.
//!
//! Tracks how often each player has appeared across the lineups accepted so
//! far and answers the three questions the search asks: can this player be
//! added again, must this player be in the current lineup to still hit their
//! minimum, and how hard should repeated use be penalized.

use slate_core::{OptimizationConfig, PlayerId};
use std::collections::HashMap;

/// Rounding slack when converting exposure fractions to appearance counts.
const FRACTION_EPS: f64 = 1e-9;

/// Appearance counts and configured bounds for one optimization batch.
#[derive(Debug)]
pub struct ExposureTracker {
    counts: HashMap<PlayerId, usize>,
    bounds: HashMap<PlayerId, (f64, f64)>,
    batch_size: usize,
}

impl ExposureTracker {
    /// Creates a tracker for a batch of `cfg.lineup_count` lineups.
    #[must_use]
    pub fn new(cfg: &OptimizationConfig) -> Self {
        Self {
            counts: HashMap::new(),
            bounds: cfg
                .exposure
                .iter()
                .map(|b| (b.player, (b.min, b.max)))
                .collect(),
            batch_size: cfg.lineup_count,
        }
    }

    /// Records an accepted lineup's roster.
    pub fn record(&mut self, ids: &[PlayerId]) {
        for id in ids {
            *self.counts.entry(*id).or_insert(0) += 1;
        }
    }

    /// Appearances so far.
    #[must_use]
    pub fn count(&self, id: PlayerId) -> usize {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Highest appearance count the player's max-exposure fraction allows
    /// across the whole batch.
    #[must_use]
    pub fn max_appearances(&self, id: PlayerId) -> usize {
        let max = self.bounds.get(&id).map_or(1.0, |(_, max)| *max);
        ((max * self.batch_size as f64) + FRACTION_EPS).floor() as usize
    }

    /// Lowest appearance count the player's min-exposure fraction requires.
    #[must_use]
    pub fn min_appearances(&self, id: PlayerId) -> usize {
        let min = self.bounds.get(&id).map_or(0.0, |(min, _)| *min);
        ((min * self.batch_size as f64) - FRACTION_EPS).ceil().max(0.0) as usize
    }

    /// Returns true if one more appearance stays within the max bound.
    #[must_use]
    pub fn may_add(&self, id: PlayerId) -> bool {
        self.count(id) < self.max_appearances(id)
    }

    /// Returns true when the player has to appear in every remaining lineup
    /// (including the one under construction) to reach their minimum.
    #[must_use]
    pub fn must_include(&self, id: PlayerId, produced: usize) -> bool {
        let deficit = self.min_appearances(id).saturating_sub(self.count(id));
        deficit > 0 && deficit >= self.batch_size.saturating_sub(produced)
    }

    /// Ids that still owe appearances to their minimum bound, most-constrained
    /// first, ties by id.
    #[must_use]
    pub fn deficit_ids(&self, produced: usize) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .bounds
            .keys()
            .copied()
            .filter(|id| self.must_include(*id, produced))
            .collect();
        ids.sort();
        ids
    }

    /// Multiplier in (0, 1] that shrinks a candidate's score the closer the
    /// player sits to their max-exposure ceiling. Unused players score 1.0.
    #[must_use]
    pub fn penalty(&self, id: PlayerId) -> f64 {
        let allowed = self.max_appearances(id);
        if allowed == 0 {
            return 0.0;
        }
        let usage = self.count(id) as f64 / allowed as f64;
        1.0 - 0.6 * usage.min(1.0)
    }

    /// The `n` most-used players so far, counts descending, ties by id.
    /// Construction retries ban these to force the next lineup away from the
    /// batch's current core.
    #[must_use]
    pub fn most_used(&self, n: usize) -> Vec<PlayerId> {
        let mut by_count: Vec<(usize, PlayerId)> =
            self.counts.iter().map(|(id, c)| (*c, *id)).collect();
        by_count.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        by_count.into_iter().take(n).map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::ExposureBound;

    fn cfg_with(bounds: Vec<ExposureBound>, batch: usize) -> OptimizationConfig {
        let mut cfg = OptimizationConfig::default();
        cfg.lineup_count = batch;
        cfg.exposure = bounds;
        cfg
    }

    #[test]
    fn max_appearances_floors_the_fraction() {
        let tracker = ExposureTracker::new(&cfg_with(
            vec![ExposureBound {
                player: PlayerId(1),
                min: 0.0,
                max: 0.5,
            }],
            5,
        ));
        // 0.5 of 5 lineups floors to 2 appearances.
        assert_eq!(tracker.max_appearances(PlayerId(1)), 2);
        // Unbounded players may appear everywhere.
        assert_eq!(tracker.max_appearances(PlayerId(2)), 5);
    }

    #[test]
    fn may_add_stops_at_the_ceiling() {
        let mut tracker = ExposureTracker::new(&cfg_with(
            vec![ExposureBound {
                player: PlayerId(1),
                min: 0.0,
                max: 0.5,
            }],
            4,
        ));
        assert!(tracker.may_add(PlayerId(1)));
        tracker.record(&[PlayerId(1)]);
        assert!(tracker.may_add(PlayerId(1)));
        tracker.record(&[PlayerId(1)]);
        assert!(!tracker.may_add(PlayerId(1)));
    }

    #[test]
    fn must_include_fires_when_slack_runs_out() {
        let tracker = ExposureTracker::new(&cfg_with(
            vec![ExposureBound {
                player: PlayerId(1),
                min: 0.75,
                max: 1.0,
            }],
            4,
        ));
        // Needs 3 of 4; with none produced there is one lineup of slack.
        assert!(!tracker.must_include(PlayerId(1), 0));
        // After one lineup without them, the remaining 3 are all required.
        assert!(tracker.must_include(PlayerId(1), 1));
    }

    #[test]
    fn penalty_decreases_with_usage() {
        let mut tracker = ExposureTracker::new(&cfg_with(Vec::new(), 10));
        let fresh = tracker.penalty(PlayerId(1));
        tracker.record(&[PlayerId(1)]);
        tracker.record(&[PlayerId(1)]);
        assert!(tracker.penalty(PlayerId(1)) < fresh);
    }

    #[test]
    fn most_used_orders_by_count_then_id() {
        let mut tracker = ExposureTracker::new(&cfg_with(Vec::new(), 10));
        tracker.record(&[PlayerId(3), PlayerId(1)]);
        tracker.record(&[PlayerId(3), PlayerId(2)]);
        assert_eq!(
            tracker.most_used(3),
            vec![PlayerId(3), PlayerId(1), PlayerId(2)]
        );
    }
}
