//! Correlation-weighted objective shared by construction and refinement.
//!
//! A pair of rostered players contributes `rho * (proj_a + proj_b) / 2`
//! points of correlation mass, so the marginal bonus of adding a candidate is
//! exactly the objective delta the swap pass measures.

use slate_core::{OptimizationConfig, Player};
use slate_sim::CorrelationMatrix;

/// Points a player contributes before correlation: projection minus the
/// ownership fade penalty (tournament leverage, 0 = off).
#[must_use]
pub fn base_points(player: &Player, cfg: &OptimizationConfig) -> f64 {
    player.projection - cfg.ownership_fade * player.ownership_pct
}

/// Correlation bonus, in points, of adding `candidate` next to `rostered`.
#[must_use]
pub fn correlation_bonus(
    candidate: &Player,
    rostered: &[&Player],
    matrix: &CorrelationMatrix,
) -> f64 {
    rostered
        .iter()
        .map(|r| matrix.get(candidate.id, r.id) * 0.5 * (candidate.projection + r.projection))
        .sum()
}

/// Total pairwise correlation mass of a roster, in points.
#[must_use]
pub fn lineup_correlation(players: &[&Player], matrix: &CorrelationMatrix) -> f64 {
    let mut total = 0.0;
    for (i, a) in players.iter().enumerate() {
        for b in &players[i + 1..] {
            total += matrix.get(a.id, b.id) * 0.5 * (a.projection + b.projection);
        }
    }
    total
}

/// The weighted objective the search maximizes.
#[must_use]
pub fn objective(players: &[&Player], matrix: &CorrelationMatrix, cfg: &OptimizationConfig) -> f64 {
    players.iter().map(|p| base_points(p, cfg)).sum::<f64>()
        + cfg.correlation_weight * lineup_correlation(players, matrix)
}
