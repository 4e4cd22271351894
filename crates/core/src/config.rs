//! Optimizer and simulator request configuration.
//!
//! Both configs are plain data with builder-style setters; `validate` runs
//! before any search or simulation work starts and is the only place
//! `Validation` errors originate.

use crate::contest::PayoutStructure;
use crate::error::{DfsError, Result};
use crate::player::{Player, PlayerId, RosterSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Grouping scope for a stacking rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackScope {
    /// Players from one team (e.g. "KC").
    Team(String),
    /// Players from one game (e.g. "KC@BUF").
    Game(String),
}

/// Min/max count of rostered players drawn from one team or game,
/// optionally restricted to certain positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRule {
    /// Team or game the rule applies to.
    pub scope: StackScope,
    /// When set, only players at these positions count toward the rule.
    pub positions: Option<Vec<crate::player::Position>>,
    /// Minimum players required from the scope.
    pub min: usize,
    /// Maximum players allowed from the scope.
    pub max: usize,
}

impl StackRule {
    /// Returns true if `player` counts toward this rule.
    #[must_use]
    pub fn covers(&self, player: &Player) -> bool {
        let in_scope = match &self.scope {
            StackScope::Team(team) => &player.team == team,
            StackScope::Game(game) => &player.game == game,
        };
        in_scope
            && self
                .positions
                .as_ref()
                .map_or(true, |ps| ps.contains(&player.position))
    }
}

/// Allowed appearance fraction for one player across an N-lineup batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureBound {
    /// Player the bound applies to.
    pub player: PlayerId,
    /// Minimum fraction of lineups the player must appear in.
    pub min: f64,
    /// Maximum fraction of lineups the player may appear in.
    pub max: f64,
}

/// Full optimizer request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Salary cap per lineup, whole currency units.
    pub salary_cap: u32,
    /// Number of lineups requested (N).
    pub lineup_count: usize,
    /// Minimum differing players between any two output lineups (D).
    pub min_unique: usize,
    /// Weight of the correlation bonus in the objective, in [0, 1].
    pub correlation_weight: f64,
    /// Penalty weight on projected ownership (tournament leverage); 0 = off.
    pub ownership_fade: f64,
    /// Required roster slots.
    pub roster: Vec<RosterSlot>,
    /// Stacking rules enforced on every lineup.
    pub stack_rules: Vec<StackRule>,
    /// Players forced into every lineup.
    pub locked: Vec<PlayerId>,
    /// Players removed from the pool before search.
    pub excluded: Vec<PlayerId>,
    /// Per-player exposure bounds across the batch.
    pub exposure: Vec<ExposureBound>,
    /// Soft deadline for the whole batch, milliseconds.
    pub max_runtime_ms: Option<u64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            salary_cap: 50_000,
            lineup_count: 1,
            min_unique: 1,
            correlation_weight: 0.3,
            ownership_fade: 0.0,
            roster: Vec::new(),
            stack_rules: Vec::new(),
            locked: Vec::new(),
            excluded: Vec::new(),
            exposure: Vec::new(),
            max_runtime_ms: None,
        }
    }
}

impl OptimizationConfig {
    /// Creates a config for a roster under a salary cap.
    #[must_use]
    pub fn new(salary_cap: u32, roster: Vec<RosterSlot>) -> Self {
        Self {
            salary_cap,
            roster,
            ..Default::default()
        }
    }

    /// Sets the requested lineup count.
    #[must_use]
    pub fn with_lineup_count(mut self, n: usize) -> Self {
        self.lineup_count = n;
        self
    }

    /// Sets the minimum-different-players threshold.
    #[must_use]
    pub fn with_min_unique(mut self, d: usize) -> Self {
        self.min_unique = d;
        self
    }

    /// Sets the correlation weight α.
    #[must_use]
    pub fn with_correlation_weight(mut self, alpha: f64) -> Self {
        self.correlation_weight = alpha;
        self
    }

    /// Sets the ownership fade weight.
    #[must_use]
    pub fn with_ownership_fade(mut self, fade: f64) -> Self {
        self.ownership_fade = fade;
        self
    }

    /// Adds a stacking rule.
    #[must_use]
    pub fn with_stack_rule(mut self, rule: StackRule) -> Self {
        self.stack_rules.push(rule);
        self
    }

    /// Locks players into every lineup.
    #[must_use]
    pub fn with_locked(mut self, ids: Vec<PlayerId>) -> Self {
        self.locked = ids;
        self
    }

    /// Excludes players from the pool.
    #[must_use]
    pub fn with_excluded(mut self, ids: Vec<PlayerId>) -> Self {
        self.excluded = ids;
        self
    }

    /// Adds an exposure bound.
    #[must_use]
    pub fn with_exposure(mut self, bound: ExposureBound) -> Self {
        self.exposure.push(bound);
        self
    }

    /// Sets the batch deadline in milliseconds.
    #[must_use]
    pub fn with_max_runtime_ms(mut self, ms: u64) -> Self {
        self.max_runtime_ms = Some(ms);
        self
    }

    /// Exposure bound for a player, if one was configured.
    #[must_use]
    pub fn exposure_for(&self, id: PlayerId) -> Option<&ExposureBound> {
        self.exposure.iter().find(|b| b.player == id)
    }

    /// Checks the config against the player pool. Runs before any search
    /// iteration; every failure here is a caller error, never retried.
    ///
    /// # Errors
    ///
    /// `DfsError::Validation` describing the first problem found.
    pub fn validate(&self, players: &[Player]) -> Result<()> {
        if self.lineup_count == 0 {
            return Err(DfsError::validation("lineup_count must be at least 1"));
        }
        if self.roster.is_empty() {
            return Err(DfsError::validation("roster has no required slots"));
        }
        if !(0.0..=1.0).contains(&self.correlation_weight) {
            return Err(DfsError::validation(format!(
                "correlation_weight {} outside [0, 1]",
                self.correlation_weight
            )));
        }
        if self.ownership_fade < 0.0 {
            return Err(DfsError::validation("ownership_fade must be non-negative"));
        }
        if self.min_unique > self.roster.len() {
            return Err(DfsError::validation(format!(
                "min_unique {} exceeds roster size {}",
                self.min_unique,
                self.roster.len()
            )));
        }
        for rule in &self.stack_rules {
            if rule.min > rule.max {
                return Err(DfsError::validation(format!(
                    "stack rule min {} exceeds max {}",
                    rule.min, rule.max
                )));
            }
            if rule.max > self.roster.len() {
                return Err(DfsError::validation(format!(
                    "stack rule max {} exceeds roster size {}",
                    rule.max,
                    self.roster.len()
                )));
            }
        }
        for bound in &self.exposure {
            if !(0.0..=1.0).contains(&bound.min)
                || !(0.0..=1.0).contains(&bound.max)
                || bound.min > bound.max
            {
                return Err(DfsError::validation(format!(
                    "exposure bound for player {} is malformed: [{}, {}]",
                    bound.player, bound.min, bound.max
                )));
            }
        }

        let mut seen = HashSet::new();
        for p in players {
            if !seen.insert(p.id) {
                return Err(DfsError::validation(format!(
                    "duplicate player id {} in pool",
                    p.id
                )));
            }
        }

        if self.locked.len() > self.roster.len() {
            return Err(DfsError::validation(format!(
                "{} locked players cannot fit {} roster slots",
                self.locked.len(),
                self.roster.len()
            )));
        }
        let excluded: HashSet<PlayerId> = self.excluded.iter().copied().collect();
        let mut locked_salary: u64 = 0;
        for id in &self.locked {
            if excluded.contains(id) {
                return Err(DfsError::validation(format!(
                    "player {id} is both locked and excluded"
                )));
            }
            let Some(player) = players.iter().find(|p| p.id == *id) else {
                return Err(DfsError::validation(format!(
                    "locked player {id} is not in the pool"
                )));
            };
            if !self.roster.iter().any(|s| s.accepts(&player.position)) {
                return Err(DfsError::validation(format!(
                    "locked player {} ({}) fits no roster slot",
                    player.name, player.position
                )));
            }
            if let Some(bound) = self.exposure_for(*id) {
                if bound.max < 1.0 {
                    return Err(DfsError::validation(format!(
                        "locked player {id} has max exposure {} below 1.0",
                        bound.max
                    )));
                }
            }
            locked_salary += u64::from(player.salary);
        }
        if locked_salary > u64::from(self.salary_cap) {
            return Err(DfsError::validation(format!(
                "locked players cost {locked_salary}, above the {} cap",
                self.salary_cap
            )));
        }

        Ok(())
    }
}

/// Monte Carlo simulation request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of simulated trials.
    pub num_simulations: usize,
    /// Worker tasks the trials are partitioned across.
    pub workers: usize,
    /// Simulated opposing entries; 0 disables the contest field model.
    pub contest_size: usize,
    /// Rank → payout tiers; required when `contest_size` > 0.
    pub payouts: Option<PayoutStructure>,
    /// Entry fee, used for cash probability and ROI.
    pub entry_fee: f64,
    /// Draw scores through the correlation matrix (Gaussian copula) rather
    /// than independently.
    pub correlated: bool,
    /// RNG seed; `None` seeds from entropy (non-reproducible).
    pub seed: Option<u64>,
    /// Trials per progress message and cancellation check.
    pub progress_batch: usize,
    /// Field mean quality relative to the slate average projection.
    pub field_strength: f64,
    /// Soft deadline for the whole run, milliseconds.
    pub max_runtime_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            workers: 4,
            contest_size: 0,
            payouts: None,
            entry_fee: 0.0,
            correlated: true,
            seed: None,
            progress_batch: 1_000,
            field_strength: 0.95,
            max_runtime_ms: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a config running `num_simulations` trials.
    #[must_use]
    pub fn new(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Default::default()
        }
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enables the contest field model.
    #[must_use]
    pub fn with_contest(mut self, size: usize, payouts: PayoutStructure, entry_fee: f64) -> Self {
        self.contest_size = size;
        self.payouts = Some(payouts);
        self.entry_fee = entry_fee;
        self
    }

    /// Sets a seed for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Toggles correlated sampling.
    #[must_use]
    pub fn with_correlated(mut self, correlated: bool) -> Self {
        self.correlated = correlated;
        self
    }

    /// Sets the run deadline in milliseconds.
    #[must_use]
    pub fn with_max_runtime_ms(mut self, ms: u64) -> Self {
        self.max_runtime_ms = Some(ms);
        self
    }

    /// Checks the config before any trial runs.
    ///
    /// # Errors
    ///
    /// `DfsError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(DfsError::validation("num_simulations must be at least 1"));
        }
        if self.workers == 0 {
            return Err(DfsError::validation("workers must be at least 1"));
        }
        if self.progress_batch == 0 {
            return Err(DfsError::validation("progress_batch must be at least 1"));
        }
        if self.entry_fee < 0.0 {
            return Err(DfsError::validation("entry_fee must be non-negative"));
        }
        if self.field_strength <= 0.0 {
            return Err(DfsError::validation("field_strength must be positive"));
        }
        if self.contest_size > 0 && self.payouts.as_ref().map_or(true, PayoutStructure::is_empty) {
            return Err(DfsError::validation(
                "contest_size set without a payout structure",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Position;

    fn pool() -> Vec<Player> {
        (1..=4)
            .map(|i| Player {
                id: PlayerId(i),
                name: format!("P{i}"),
                position: Position::new("RB"),
                team: "KC".to_string(),
                game: "KC@BUF".to_string(),
                salary: 20_000,
                projection: 15.0,
                floor: 8.0,
                ceiling: 25.0,
                ownership_pct: 12.0,
            })
            .collect()
    }

    fn roster() -> Vec<RosterSlot> {
        vec![RosterSlot::single("RB"), RosterSlot::single("RB")]
    }

    // ==================== OptimizationConfig Tests ====================

    #[test]
    fn zero_lineups_is_validation_error() {
        let cfg = OptimizationConfig::new(50_000, roster()).with_lineup_count(0);
        let err = cfg.validate(&pool()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn correlation_weight_outside_unit_interval_rejected() {
        let cfg = OptimizationConfig::new(50_000, roster()).with_correlation_weight(1.5);
        assert!(cfg.validate(&pool()).unwrap_err().is_validation());
    }

    #[test]
    fn locked_salary_above_cap_rejected_before_search() {
        let cfg = OptimizationConfig::new(30_000, roster())
            .with_locked(vec![PlayerId(1), PlayerId(2)]);
        let err = cfg.validate(&pool()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("cap"));
    }

    #[test]
    fn locked_and_excluded_conflict_rejected() {
        let cfg = OptimizationConfig::new(50_000, roster())
            .with_locked(vec![PlayerId(1)])
            .with_excluded(vec![PlayerId(1)]);
        assert!(cfg.validate(&pool()).unwrap_err().is_validation());
    }

    #[test]
    fn unknown_locked_player_rejected() {
        let cfg = OptimizationConfig::new(50_000, roster()).with_locked(vec![PlayerId(99)]);
        assert!(cfg.validate(&pool()).unwrap_err().is_validation());
    }

    #[test]
    fn locked_player_with_capped_exposure_rejected() {
        let cfg = OptimizationConfig::new(50_000, roster())
            .with_locked(vec![PlayerId(1)])
            .with_exposure(ExposureBound {
                player: PlayerId(1),
                min: 0.0,
                max: 0.5,
            });
        assert!(cfg.validate(&pool()).unwrap_err().is_validation());
    }

    #[test]
    fn min_unique_beyond_roster_rejected() {
        let cfg = OptimizationConfig::new(50_000, roster()).with_min_unique(3);
        assert!(cfg.validate(&pool()).unwrap_err().is_validation());
    }

    #[test]
    fn valid_config_passes() {
        let cfg = OptimizationConfig::new(50_000, roster())
            .with_lineup_count(2)
            .with_locked(vec![PlayerId(1)]);
        assert!(cfg.validate(&pool()).is_ok());
    }

    #[test]
    fn stack_rule_covers_filters_by_position() {
        let rule = StackRule {
            scope: StackScope::Team("KC".to_string()),
            positions: Some(vec![Position::new("WR")]),
            min: 1,
            max: 2,
        };
        let players = pool();
        assert!(!rule.covers(&players[0])); // RB, filtered out
    }

    // ==================== SimulationConfig Tests ====================

    #[test]
    fn zero_simulations_is_validation_error() {
        let cfg = SimulationConfig::new(0);
        assert!(cfg.validate().unwrap_err().is_validation());
    }

    #[test]
    fn contest_without_payouts_rejected() {
        let mut cfg = SimulationConfig::new(1_000);
        cfg.contest_size = 100;
        assert!(cfg.validate().unwrap_err().is_validation());
    }

    #[test]
    fn default_simulation_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_round_trips() {
        let cfg = SimulationConfig::new(5_000)
            .with_workers(8)
            .with_seed(42)
            .with_correlated(false);
        assert_eq!(cfg.num_simulations, 5_000);
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.seed, Some(42));
        assert!(!cfg.correlated);
    }
}
