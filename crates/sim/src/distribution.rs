//! Parametric score distributions per player.
//!
//! The factory picks a family from the sport's position profile and
//! moment-matches its parameters so the expectation reproduces the player's
//! projection, with spread set by the profile's variance ratio. Sampling
//! always goes through a caller-owned RNG, so a distribution set can be
//! shared read-only across simulation workers.

use rand::distributions::Distribution as RandDistribution;
use rand::Rng;
use slate_core::{DfsError, DistributionFamily, Player, PlayerId, Result, SportConfig};
use statrs::distribution::{Beta, ContinuousCDF, Gamma, LogNormal, Normal};
use statrs::statistics::Distribution as StatDistribution;
use std::collections::{BTreeMap, HashMap};

/// Smallest spread we will fit; keeps log/ratio math away from zero.
const MIN_STD_DEV: f64 = 1e-6;

/// A player's marginal score distribution.
#[derive(Debug, Clone, Copy)]
pub enum ScoreDistribution {
    /// Symmetric around the projection.
    Normal(Normal),
    /// Heavy right tail; floor at zero.
    LogNormal(LogNormal),
    /// Bounded on [0, scale].
    Beta {
        /// Shape on the unit interval.
        dist: Beta,
        /// Upper bound of the support.
        scale: f64,
    },
    /// Skewed positive; floor at zero.
    Gamma(Gamma),
}

impl ScoreDistribution {
    /// One pseudo-random draw.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Normal(d) => d.sample(rng),
            Self::LogNormal(d) => d.sample(rng),
            Self::Beta { dist, scale } => dist.sample(rng) * scale,
            Self::Gamma(d) => d.sample(rng),
        }
    }

    /// P(score < x).
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        match self {
            Self::Normal(d) => d.cdf(x),
            Self::LogNormal(d) => d.cdf(x),
            Self::Beta { dist, scale } => dist.cdf(x / scale),
            Self::Gamma(d) => d.cdf(x),
        }
    }

    /// Quantile function; `p` is clamped away from 0 and 1 so copula
    /// transforms never produce infinities.
    #[must_use]
    pub fn inverse_cdf(&self, p: f64) -> f64 {
        let p = p.clamp(1e-9, 1.0 - 1e-9);
        match self {
            Self::Normal(d) => d.inverse_cdf(p),
            Self::LogNormal(d) => d.inverse_cdf(p),
            Self::Beta { dist, scale } => dist.inverse_cdf(p) * scale,
            Self::Gamma(d) => d.inverse_cdf(p),
        }
    }

    /// Expected score; equals the player's projection by construction.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Self::Normal(d) => d.mean().unwrap_or(0.0),
            Self::LogNormal(d) => d.mean().unwrap_or(0.0),
            Self::Beta { dist, scale } => dist.mean().unwrap_or(0.0) * scale,
            Self::Gamma(d) => d.mean().unwrap_or(0.0),
        }
    }

    /// Variance of the score.
    #[must_use]
    pub fn variance(&self) -> f64 {
        match self {
            Self::Normal(d) => d.variance().unwrap_or(0.0),
            Self::LogNormal(d) => d.variance().unwrap_or(0.0),
            Self::Beta { dist, scale } => dist.variance().unwrap_or(0.0) * scale * scale,
            Self::Gamma(d) => d.variance().unwrap_or(0.0),
        }
    }
}

/// Builds moment-matched distributions from projections.
pub struct DistributionFactory;

impl DistributionFactory {
    /// Fits a distribution for one player from the sport's position profile.
    ///
    /// # Errors
    ///
    /// `DfsError::Validation` when the projection cannot be fit (negative
    /// projection with a positive-support family falls back to Normal, so in
    /// practice only pathological profiles fail).
    pub fn for_player(player: &Player, sport: &SportConfig) -> Result<ScoreDistribution> {
        let (family, ratio) = sport.profile_for(&player.position);
        let mean = player.projection;
        let std_dev = (ratio.max(0.0) * mean.abs()).max(MIN_STD_DEV);

        // Positive-support families need a positive mean to fit against.
        let family = if mean <= 0.0 {
            DistributionFamily::Normal
        } else {
            family
        };

        match family {
            DistributionFamily::Normal => {
                let dist = Normal::new(mean, std_dev)
                    .map_err(|e| DfsError::validation(format!("normal fit for {}: {e}", player.id)))?;
                Ok(ScoreDistribution::Normal(dist))
            }
            DistributionFamily::LogNormal => {
                // E[X] = exp(mu + sigma^2/2); match mean and ratio-derived CV.
                let cv2 = (std_dev / mean).powi(2);
                let sigma2 = (1.0 + cv2).ln();
                let mu = mean.ln() - sigma2 / 2.0;
                let dist = LogNormal::new(mu, sigma2.sqrt()).map_err(|e| {
                    DfsError::validation(format!("lognormal fit for {}: {e}", player.id))
                })?;
                Ok(ScoreDistribution::LogNormal(dist))
            }
            DistributionFamily::Gamma => {
                // mean = k/rate, var = k/rate^2.
                let cv = std_dev / mean;
                let shape = 1.0 / (cv * cv);
                let rate = shape / mean;
                let dist = Gamma::new(shape, rate)
                    .map_err(|e| DfsError::validation(format!("gamma fit for {}: {e}", player.id)))?;
                Ok(ScoreDistribution::Gamma(dist))
            }
            DistributionFamily::Beta => {
                let scale = Self::beta_scale(player);
                let mean_frac = mean / scale;
                // Beta variance is bounded by m(1-m); keep the requested
                // spread strictly inside that bound.
                let max_ratio = 0.95 * ((1.0 - mean_frac) / mean_frac).sqrt();
                let cv = (std_dev / mean).min(max_ratio);
                let var_frac = (cv * mean_frac).powi(2);
                let nu = mean_frac * (1.0 - mean_frac) / var_frac - 1.0;
                let alpha = mean_frac * nu;
                let beta = (1.0 - mean_frac) * nu;
                let dist = Beta::new(alpha, beta)
                    .map_err(|e| DfsError::validation(format!("beta fit for {}: {e}", player.id)))?;
                Ok(ScoreDistribution::Beta { dist, scale })
            }
        }
    }

    /// Fits the whole pool, keyed by player id.
    ///
    /// # Errors
    ///
    /// Propagates the first per-player fit failure.
    pub fn for_pool(
        players: &[Player],
        sport: &SportConfig,
    ) -> Result<HashMap<PlayerId, ScoreDistribution>> {
        // BTreeMap first so failures surface in id order, then hand back a
        // hash map for O(1) lookups on the hot path.
        let mut fitted = BTreeMap::new();
        for player in players {
            fitted.insert(player.id, Self::for_player(player, sport)?);
        }
        Ok(fitted.into_iter().collect())
    }

    /// Support upper bound for Beta scoring: the ceiling when it is a real
    /// ceiling, otherwise a multiple of the projection.
    fn beta_scale(player: &Player) -> f64 {
        if player.ceiling > player.projection {
            player.ceiling * 1.25
        } else {
            player.projection * 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use slate_core::Position;

    fn player(position: &str, projection: f64, ceiling: f64) -> Player {
        Player {
            id: PlayerId(7),
            name: "Tester".to_string(),
            position: Position::new(position),
            team: "KC".to_string(),
            game: "KC@BUF".to_string(),
            salary: 7_500,
            projection,
            floor: projection * 0.4,
            ceiling,
            ownership_pct: 15.0,
        }
    }

    fn sample_stats(dist: &ScoreDistribution, n: usize, seed: u64) -> (f64, f64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let samples: Vec<f64> = (0..n).map(|_| dist.sample(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        (mean, var.sqrt())
    }

    // ==================== Fit Tests ====================

    #[test]
    fn every_family_reproduces_the_projection() {
        let sport = SportConfig::nfl_classic();
        for (pos, proj) in [("QB", 22.0), ("RB", 16.5), ("WR", 14.0), ("TE", 9.0)] {
            let dist = DistributionFactory::for_player(&player(pos, proj, proj * 1.8), &sport)
                .unwrap();
            assert!(
                (dist.mean() - proj).abs() < 1e-9,
                "{pos} mean {} != projection {proj}",
                dist.mean()
            );
        }
    }

    #[test]
    fn beta_fit_reproduces_projection_within_bound() {
        let sport = SportConfig::golf_classic();
        let dist =
            DistributionFactory::for_player(&player("G", 70.0, 110.0), &sport).unwrap();
        assert!((dist.mean() - 70.0).abs() < 1e-9);
        assert!(matches!(dist, ScoreDistribution::Beta { .. }));
    }

    #[test]
    fn non_positive_projection_falls_back_to_normal() {
        let sport = SportConfig::nfl_classic();
        let dist = DistributionFactory::for_player(&player("WR", 0.0, 0.0), &sport).unwrap();
        assert!(matches!(dist, ScoreDistribution::Normal(_)));
    }

    // ==================== Sampling Fidelity ====================

    #[test]
    fn normal_sample_moments_match_configuration() {
        // Normal(45, 11.25): 10k draws should land within +/-0.5 on both moments.
        let dist = ScoreDistribution::Normal(Normal::new(45.0, 11.25).unwrap());
        let (mean, std_dev) = sample_stats(&dist, 10_000, 42);
        assert!((mean - 45.0).abs() < 0.5, "sample mean {mean}");
        assert!((std_dev - 11.25).abs() < 0.5, "sample std dev {std_dev}");
    }

    #[test]
    fn lognormal_samples_are_positive_and_centered() {
        let sport = SportConfig::nfl_classic();
        let dist =
            DistributionFactory::for_player(&player("WR", 14.0, 30.0), &sport).unwrap();
        let (mean, _) = sample_stats(&dist, 20_000, 9);
        assert!((mean - 14.0).abs() < 0.3, "sample mean {mean}");

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!((0..1_000).all(|_| dist.sample(&mut rng) > 0.0));
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let sport = SportConfig::nfl_classic();
        let dist =
            DistributionFactory::for_player(&player("RB", 16.0, 28.0), &sport).unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(123);
        let mut b = ChaCha8Rng::seed_from_u64(123);
        for _ in 0..100 {
            assert!((dist.sample(&mut a) - dist.sample(&mut b)).abs() < f64::EPSILON);
        }
    }

    // ==================== CDF / Quantile ====================

    #[test]
    fn cdf_and_inverse_cdf_round_trip() {
        let sport = SportConfig::nfl_classic();
        let dist =
            DistributionFactory::for_player(&player("RB", 16.0, 28.0), &sport).unwrap();
        for p in [0.05, 0.25, 0.5, 0.75, 0.95] {
            let x = dist.inverse_cdf(p);
            assert!((dist.cdf(x) - p).abs() < 1e-6, "p={p} x={x}");
        }
    }

    #[test]
    fn inverse_cdf_clamps_extreme_percentiles() {
        let dist = ScoreDistribution::Normal(Normal::new(10.0, 3.0).unwrap());
        assert!(dist.inverse_cdf(0.0).is_finite());
        assert!(dist.inverse_cdf(1.0).is_finite());
    }
}
