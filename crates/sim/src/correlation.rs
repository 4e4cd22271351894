//! Pairwise player correlation: sparse symmetric matrix, rule-based
//! builder, and the Cholesky factor consumed by the copula sampler.

use serde::{Deserialize, Serialize};
use slate_core::{Player, PlayerId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Same-team quarterback/pass-catcher relationship.
const QB_PASS_CATCHER: f64 = 0.30;
/// Generic same-team relationship.
const SAME_TEAM: f64 = 0.10;
/// Opposing players sharing game-total variance.
const SAME_GAME: f64 = 0.05;
/// Opposing running-game roles in adverse weather (shared slow script).
const WEATHER_RUN_GAME: f64 = 0.15;
/// Starter vs same-position backup in a blowout script (role competition).
const BLOWOUT_BACKUP: f64 = -0.20;

/// Expected flow of a game, supplied by an external context service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameScript {
    /// Close game; no adjustment.
    Competitive,
    /// Lopsided script; starters cede time to backups.
    Blowout,
}

/// Weather classification for outdoor games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    /// No adjustment.
    Clear,
    /// Wind/rain/snow pushing both offenses toward the ground game.
    Adverse,
}

/// Optional situational context keyed by game identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationContext {
    /// Game id → expected script.
    pub game_scripts: HashMap<String, GameScript>,
    /// Game id → weather call.
    pub weather: HashMap<String, Weather>,
}

impl CorrelationContext {
    fn script_for(&self, game: &str) -> GameScript {
        self.game_scripts
            .get(game)
            .copied()
            .unwrap_or(GameScript::Competitive)
    }

    fn weather_for(&self, game: &str) -> Weather {
        self.weather.get(game).copied().unwrap_or(Weather::Clear)
    }
}

/// Sparse symmetric correlation matrix over the player pool.
///
/// Only non-zero coefficients are stored, keyed by the ordered id pair; the
/// diagonal is implicitly 1.0. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMatrix {
    entries: HashMap<(PlayerId, PlayerId), f64>,
}

impl CorrelationMatrix {
    /// Creates an empty matrix (all players independent).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Coefficient for a pair; 1.0 on the diagonal, 0.0 when unstored.
    #[must_use]
    pub fn get(&self, a: PlayerId, b: PlayerId) -> f64 {
        if a == b {
            return 1.0;
        }
        self.entries.get(&Self::key(a, b)).copied().unwrap_or(0.0)
    }

    /// Stores a coefficient, clamped to [-1, 1]. Zero removes the entry;
    /// the diagonal is not writable.
    pub fn set(&mut self, a: PlayerId, b: PlayerId, rho: f64) {
        if a == b {
            return;
        }
        let rho = rho.clamp(-1.0, 1.0);
        if rho == 0.0 {
            self.entries.remove(&Self::key(a, b));
        } else {
            self.entries.insert(Self::key(a, b), rho);
        }
    }

    /// Number of stored (non-zero) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when every pair is independent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates stored pairs as `((a, b), rho)` with `a < b`.
    pub fn pairs(&self) -> impl Iterator<Item = (&(PlayerId, PlayerId), &f64)> {
        self.entries.iter()
    }
}

/// Builds the matrix from team/game relationships plus optional context.
pub struct CorrelationBuilder;

impl CorrelationBuilder {
    /// Deterministic for identical inputs; symmetric by construction since
    /// every rule writes through the ordered-pair key.
    #[must_use]
    pub fn build(players: &[Player], context: &CorrelationContext) -> CorrelationMatrix {
        let mut matrix = CorrelationMatrix::new();

        for (i, a) in players.iter().enumerate() {
            for b in &players[i + 1..] {
                let rho = Self::pair_correlation(a, b, context);
                if rho != 0.0 {
                    matrix.set(a.id, b.id, rho);
                }
            }
        }

        debug!(
            players = players.len(),
            stored_pairs = matrix.len(),
            "correlation matrix built"
        );
        matrix
    }

    fn pair_correlation(a: &Player, b: &Player, context: &CorrelationContext) -> f64 {
        if !a.same_game(b) {
            return 0.0;
        }

        if a.same_team(b) {
            // Blowout script: same-position teammates compete for the same
            // role, so one eating the other's snaps moves them oppositely.
            if a.position == b.position
                && context.script_for(&a.game) == GameScript::Blowout
            {
                return BLOWOUT_BACKUP;
            }
            if Self::is_qb_stack_pair(a, b) {
                return QB_PASS_CATCHER;
            }
            return SAME_TEAM;
        }

        // Opposing teams, same game: shared game-total variance, amplified
        // for the running games when weather slows the script for both sides.
        if context.weather_for(&a.game) == Weather::Adverse
            && Self::is_run_game_role(a)
            && Self::is_run_game_role(b)
        {
            return WEATHER_RUN_GAME;
        }
        SAME_GAME
    }

    fn is_qb_stack_pair(a: &Player, b: &Player) -> bool {
        let catcher = |p: &Player| matches!(p.position.as_str(), "WR" | "TE");
        (a.position.as_str() == "QB" && catcher(b)) || (b.position.as_str() == "QB" && catcher(a))
    }

    fn is_run_game_role(p: &Player) -> bool {
        p.position.as_str() == "RB"
    }
}

/// Dense lower-triangular Cholesky factor of the correlation matrix
/// restricted to an ordered player list.
///
/// Rule-built matrices are occasionally not numerically positive
/// semi-definite; the factorization retries under escalating diagonal
/// loading before falling back to independence.
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    dim: usize,
    lower: Vec<f64>,
}

impl CholeskyFactor {
    /// Factors the matrix over `ordered` (row/column i = `ordered[i]`).
    #[must_use]
    pub fn from_matrix(matrix: &CorrelationMatrix, ordered: &[PlayerId]) -> Self {
        let n = ordered.len();
        let mut dense = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                dense[i * n + j] = matrix.get(ordered[i], ordered[j]);
            }
        }

        for jitter in [0.0, 1e-8, 1e-6, 1e-4, 1e-2, 0.1] {
            if let Some(lower) = Self::factor(&dense, n, jitter) {
                if jitter > 0.0 {
                    debug!(jitter, "correlation matrix required diagonal loading");
                }
                return Self { dim: n, lower };
            }
        }

        warn!("correlation matrix far from PSD; falling back to independence");
        let mut lower = vec![0.0; n * n];
        for i in 0..n {
            lower[i * n + i] = 1.0;
        }
        Self { dim: n, lower }
    }

    /// Standard Cholesky on `(C + jitter*I) / (1 + jitter)`, preserving the
    /// unit diagonal. Returns None on a non-positive pivot.
    fn factor(dense: &[f64], n: usize, jitter: f64) -> Option<Vec<f64>> {
        let scale = 1.0 / (1.0 + jitter);
        let mut lower = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let base = (dense[i * n + j] + if i == j { jitter } else { 0.0 }) * scale;
                let dot: f64 = (0..j).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                if i == j {
                    let pivot = base - dot;
                    if pivot <= 1e-12 {
                        return None;
                    }
                    lower[i * n + i] = pivot.sqrt();
                } else {
                    lower[i * n + j] = (base - dot) / lower[j * n + j];
                }
            }
        }
        Some(lower)
    }

    /// Matrix dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Correlates a vector of independent standard normals in place:
    /// `out[i] = sum_{j<=i} L[i][j] * eps[j]`.
    pub fn correlate(&self, eps: &[f64], out: &mut [f64]) {
        debug_assert_eq!(eps.len(), self.dim);
        debug_assert_eq!(out.len(), self.dim);
        for i in 0..self.dim {
            let row = &self.lower[i * self.dim..i * self.dim + i + 1];
            out[i] = row.iter().zip(eps).map(|(l, e)| l * e).sum();
        }
    }
}
