//! Per-lineup simulation statistics and worker-aggregate merging.
//!
//! Workers accumulate into private `WorkerAggregate`s; the caller merges
//! them after the join barrier, so nothing on the hot path takes a lock.

use serde::{Deserialize, Serialize};

/// Summary statistics for one lineup across all trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Index of the lineup in the simulated batch.
    pub lineup_index: usize,
    /// Trials aggregated.
    pub trials: usize,
    /// Mean simulated total.
    pub mean: f64,
    /// Population standard deviation of the totals.
    pub std_dev: f64,
    /// Lowest simulated total.
    pub min: f64,
    /// Highest simulated total.
    pub max: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 95th percentile.
    pub p95: f64,
    /// Percent of trials where the payout covered the entry fee.
    pub cash_probability: f64,
    /// Percent of trials finishing first.
    pub win_probability: f64,
    /// Expected return on the entry fee, percent.
    pub expected_roi: f64,
}

/// One lineup's running accumulation inside a single worker.
#[derive(Debug, Clone)]
pub struct LineupAccum {
    /// Sum of totals.
    pub sum: f64,
    /// Sum of squared totals.
    pub sum_sq: f64,
    /// Every simulated total, kept for exact percentiles.
    pub samples: Vec<f64>,
    /// Trials where the payout covered the entry fee.
    pub cash_hits: usize,
    /// Trials finishing first.
    pub wins: usize,
    /// Sum of payouts.
    pub payout_sum: f64,
}

impl LineupAccum {
    /// Creates an accumulator sized for `capacity` trials.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sum: 0.0,
            sum_sq: 0.0,
            samples: Vec::with_capacity(capacity),
            cash_hits: 0,
            wins: 0,
            payout_sum: 0.0,
        }
    }

    /// Records one simulated total.
    pub fn record(&mut self, total: f64) {
        self.sum += total;
        self.sum_sq += total * total;
        self.samples.push(total);
    }

    /// Folds another accumulator into this one. Sample order follows merge
    /// order, which the simulator keeps fixed for reproducibility.
    pub fn merge(&mut self, other: LineupAccum) {
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.samples.extend(other.samples);
        self.cash_hits += other.cash_hits;
        self.wins += other.wins;
        self.payout_sum += other.payout_sum;
    }

    /// Finalizes into a `SimulationResult`. Percentiles come from one sorted
    /// copy of the samples, so their ordering holds by construction.
    #[must_use]
    pub fn finalize(mut self, lineup_index: usize, entry_fee: f64) -> SimulationResult {
        let n = self.samples.len();
        debug_assert!(n > 0, "finalize requires at least one trial");
        let n_f = n as f64;

        self.samples
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = self.sum / n_f;
        let variance = (self.sum_sq / n_f - mean * mean).max(0.0);

        let expected_roi = if entry_fee > 0.0 {
            (self.payout_sum / n_f - entry_fee) / entry_fee * 100.0
        } else {
            0.0
        };

        SimulationResult {
            lineup_index,
            trials: n,
            mean,
            std_dev: variance.sqrt(),
            min: self.samples[0],
            max: self.samples[n - 1],
            p25: percentile(&self.samples, 0.25),
            p50: percentile(&self.samples, 0.50),
            p75: percentile(&self.samples, 0.75),
            p90: percentile(&self.samples, 0.90),
            p95: percentile(&self.samples, 0.95),
            cash_probability: self.cash_hits as f64 / n_f * 100.0,
            win_probability: self.wins as f64 / n_f * 100.0,
            expected_roi,
        }
    }
}

/// A worker's private aggregates for every lineup in the batch.
#[derive(Debug)]
pub struct WorkerAggregate {
    /// Trials this worker completed.
    pub trials: usize,
    /// One accumulator per lineup, in batch order.
    pub lineups: Vec<LineupAccum>,
}

impl WorkerAggregate {
    /// Creates aggregates for `lineup_count` lineups and `capacity` trials.
    #[must_use]
    pub fn new(lineup_count: usize, capacity: usize) -> Self {
        Self {
            trials: 0,
            lineups: (0..lineup_count)
                .map(|_| LineupAccum::with_capacity(capacity))
                .collect(),
        }
    }
}

/// Interpolation-free percentile of a sorted slice (nearest-rank on the
/// rounded index), matching the rest of the engine's summary statistics.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_are_ordered_by_construction() {
        let mut accum = LineupAccum::with_capacity(100);
        // Deliberately un-sorted insertion order.
        for i in (0..100).rev() {
            accum.record(f64::from(i));
        }
        let result = accum.finalize(0, 0.0);

        assert!(result.min <= result.p25);
        assert!(result.p25 <= result.p50);
        assert!(result.p50 <= result.p75);
        assert!(result.p75 <= result.p90);
        assert!(result.p90 <= result.p95);
        assert!(result.p95 <= result.max);
    }

    #[test]
    fn single_trial_degenerates_to_the_observation() {
        let mut accum = LineupAccum::with_capacity(1);
        accum.record(123.5);
        let result = accum.finalize(3, 0.0);

        assert_eq!(result.trials, 1);
        for v in [
            result.min, result.p25, result.p50, result.p75, result.p90, result.p95, result.max,
            result.mean,
        ] {
            assert!((v - 123.5).abs() < f64::EPSILON);
        }
        assert!((result.std_dev - 0.0).abs() < f64::EPSILON);
        assert_eq!(result.lineup_index, 3);
    }

    #[test]
    fn mean_and_std_dev_match_known_values() {
        let mut accum = LineupAccum::with_capacity(4);
        for v in [2.0, 4.0, 4.0, 6.0] {
            accum.record(v);
        }
        let result = accum.finalize(0, 0.0);
        assert!((result.mean - 4.0).abs() < 1e-12);
        // Population variance of [2,4,4,6] is 2.
        assert!((result.std_dev - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn merge_concatenates_and_sums() {
        let mut a = LineupAccum::with_capacity(2);
        a.record(10.0);
        a.cash_hits = 1;
        a.payout_sum = 5.0;
        let mut b = LineupAccum::with_capacity(2);
        b.record(20.0);
        b.wins = 1;
        b.payout_sum = 50.0;

        a.merge(b);
        let result = a.finalize(0, 10.0);

        assert_eq!(result.trials, 2);
        assert!((result.mean - 15.0).abs() < 1e-12);
        assert!((result.cash_probability - 50.0).abs() < 1e-12);
        assert!((result.win_probability - 50.0).abs() < 1e-12);
        // Average payout 27.5 on a 10.0 fee: +175%.
        assert!((result.expected_roi - 175.0).abs() < 1e-9);
    }

    #[test]
    fn roi_zero_without_entry_fee() {
        let mut accum = LineupAccum::with_capacity(1);
        accum.record(100.0);
        accum.payout_sum = 40.0;
        let result = accum.finalize(0, 0.0);
        assert!((result.expected_roi - 0.0).abs() < f64::EPSILON);
    }
}
