//! Iterative constructive lineup search with local-swap refinement.
//!
//! Each lineup is seeded by greedily filling roster slots with the best
//! correlation-weighted points per salary dollar, then improved by pairwise
//! swaps until no swap raises the weighted objective. Batch diversity comes
//! from an exposure penalty plus escalating bans on the most-used players
//! when a rebuilt candidate still collides with an accepted lineup.
//!
//! The search is single-threaded and RNG-free; identical inputs always
//! produce identical batches.

use crate::exposure::ExposureTracker;
use crate::scoring;
use slate_core::{
    DfsError, Lineup, OptimizationConfig, Player, PlayerId, Result, RosterSlot,
};
use slate_sim::CorrelationMatrix;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rebuild attempts per lineup before the batch is declared stalled.
const ATTEMPTS_PER_LINEUP: usize = 24;
/// Upper bound on swap-refinement passes per lineup.
const SWAP_PASSES: usize = 16;
/// Scores closer than this are tied and fall through to salary, then id.
const SCORE_EPS: f64 = 1e-9;

/// Constrained lineup search over a fixed player pool.
pub struct LineupOptimizer;

impl LineupOptimizer {
    /// Produces up to `cfg.lineup_count` constraint-valid lineups, best
    /// weighted score first. The input pool is never mutated.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed config or a jointly impossible lock set,
    ///   raised before any search iteration.
    /// - `Infeasible` when no lineup satisfies the constraints at all.
    /// - `PartialBatch` when some but not all requested lineups were found
    ///   under the diversity/exposure constraints.
    /// - `Timeout` when the configured deadline expires between lineup
    ///   constructions; no lineups ride along since the batch is incomplete
    ///   by an arbitrary cut.
    pub fn optimize(
        players: &[Player],
        matrix: &CorrelationMatrix,
        cfg: &OptimizationConfig,
    ) -> Result<Vec<Lineup>> {
        cfg.validate(players)?;
        let started = Instant::now();

        let excluded: HashSet<PlayerId> = cfg.excluded.iter().copied().collect();
        let mut pool: Vec<&Player> = players
            .iter()
            .filter(|p| !excluded.contains(&p.id))
            .collect();
        // Fixed candidate order makes the greedy argmax deterministic.
        pool.sort_by_key(|p| p.id);

        if pool.len() < cfg.roster.len() {
            return Err(DfsError::infeasible(format!(
                "pool of {} players cannot fill {} roster slots",
                pool.len(),
                cfg.roster.len()
            )));
        }

        let mut locked_players = Vec::with_capacity(cfg.locked.len());
        for id in &cfg.locked {
            let Some(player) = pool.iter().copied().find(|p| p.id == *id) else {
                return Err(DfsError::validation(format!(
                    "locked player {id} is not in the pool"
                )));
            };
            locked_players.push(player);
        }
        let every_slot: Vec<usize> = (0..cfg.roster.len()).collect();
        let Some(locked_assignment) = assign_to_slots(&locked_players, &cfg.roster, &every_slot)
        else {
            return Err(DfsError::validation(
                "locked players cannot jointly fit the roster slots",
            ));
        };

        let cheapest: Vec<u32> = cfg
            .roster
            .iter()
            .map(|slot| {
                pool.iter()
                    .filter(|p| slot.accepts(&p.position))
                    .map(|p| p.salary)
                    .min()
                    .unwrap_or(u32::MAX)
            })
            .collect();
        for (slot, min_salary) in cfg.roster.iter().zip(&cheapest) {
            if *min_salary == u32::MAX {
                return Err(DfsError::infeasible(format!(
                    "no eligible players in the pool for slot {}",
                    slot.label
                )));
            }
        }

        let ctx = SearchCtx {
            pool,
            slots: &cfg.roster,
            matrix,
            cfg,
            cheapest,
            locked: locked_assignment,
            locked_ids: cfg.locked.iter().copied().collect(),
        };

        let max_shared = cfg.roster.len() - cfg.min_unique;
        let mut tracker = ExposureTracker::new(cfg);
        let mut accepted: Vec<Lineup> = Vec::new();

        while accepted.len() < cfg.lineup_count {
            if let Some(budget) = cfg.max_runtime_ms {
                if started.elapsed() >= Duration::from_millis(budget) {
                    warn!(
                        completed = accepted.len(),
                        requested = cfg.lineup_count,
                        "optimization hit its deadline"
                    );
                    return Err(DfsError::Timeout {
                        elapsed_ms: elapsed_ms(started),
                        completed: accepted.len(),
                        total: cfg.lineup_count,
                    });
                }
            }

            let mut found = None;
            for attempt in 0..ATTEMPTS_PER_LINEUP {
                // Each retry bans one more of the batch's most-used players,
                // pushing the construction away from the current core.
                let banned: HashSet<PlayerId> = tracker
                    .most_used(attempt)
                    .into_iter()
                    .filter(|id| {
                        !ctx.locked_ids.contains(id) && !tracker.must_include(*id, accepted.len())
                    })
                    .collect();
                let Some(mut draft) = ctx.construct(&tracker, accepted.len(), &banned) else {
                    continue;
                };
                ctx.refine(&mut draft, &tracker, accepted.len(), &banned);
                if ctx.diverse_against(&accepted, &draft, max_shared) {
                    found = Some(draft);
                    break;
                }
            }

            let Some(draft) = found else { break };
            let lineup = ctx.finish(&draft);
            tracker.record(&lineup.player_ids());
            debug!(
                lineup = accepted.len() + 1,
                salary = lineup.total_salary,
                projected = lineup.projected_points,
                "lineup accepted"
            );
            accepted.push(lineup);
        }

        if accepted.is_empty() {
            return Err(DfsError::infeasible(
                "no lineup satisfies the salary/position/stacking constraints",
            ));
        }
        if accepted.len() < cfg.lineup_count {
            return Err(DfsError::PartialBatch {
                requested: cfg.lineup_count,
                reason: format!(
                    "diversity and exposure constraints stalled the batch after \
                     {ATTEMPTS_PER_LINEUP} rebuild attempts per lineup"
                ),
                lineups: accepted,
            });
        }

        // Best weighted score first; sort is stable so construction order
        // breaks exact ties.
        accepted.sort_by(|a, b| {
            let ka = a.projected_points + cfg.correlation_weight * a.correlation_score;
            let kb = b.projected_points + cfg.correlation_weight * b.correlation_score;
            kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            lineups = accepted.len(),
            elapsed_ms = elapsed_ms(started),
            "optimization complete"
        );
        Ok(accepted)
    }
}

/// A lineup under construction: one optional player per roster slot.
struct Draft<'a> {
    slots: Vec<Option<&'a Player>>,
}

impl<'a> Draft<'a> {
    fn empty(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
        }
    }

    fn salary(&self) -> u32 {
        self.slots.iter().flatten().map(|p| p.salary).sum()
    }

    fn players(&self) -> Vec<&'a Player> {
        self.slots.iter().flatten().copied().collect()
    }

    fn contains(&self, id: PlayerId) -> bool {
        self.slots.iter().flatten().any(|p| p.id == id)
    }

    /// The roster with slot `idx` hypothetically replaced by `candidate`.
    fn players_with_swap(&self, idx: usize, candidate: &'a Player) -> Vec<&'a Player> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| if i == idx { Some(candidate) } else { *slot })
            .collect()
    }
}

/// Read-only inputs shared by every construction attempt in one request.
struct SearchCtx<'a> {
    pool: Vec<&'a Player>,
    slots: &'a [RosterSlot],
    matrix: &'a CorrelationMatrix,
    cfg: &'a OptimizationConfig,
    /// Cheapest eligible salary per slot, for remaining-budget pruning.
    cheapest: Vec<u32>,
    locked: Vec<(usize, &'a Player)>,
    locked_ids: HashSet<PlayerId>,
}

impl<'a> SearchCtx<'a> {
    fn eligible_count(&self, slot_idx: usize) -> usize {
        self.pool
            .iter()
            .filter(|p| self.slots[slot_idx].accepts(&p.position))
            .count()
    }

    /// Greedy seed: locked players, then min-exposure debtors, then every
    /// remaining slot (scarcest eligibility first) by weighted value per
    /// dollar. Returns `None` when some slot cannot be filled this attempt.
    fn construct(
        &self,
        tracker: &ExposureTracker,
        produced: usize,
        banned: &HashSet<PlayerId>,
    ) -> Option<Draft<'a>> {
        let slot_count = self.slots.len();
        let mut draft = Draft::empty(slot_count);
        for (idx, player) in &self.locked {
            draft.slots[*idx] = Some(*player);
        }

        // Players who must appear in every remaining lineup to reach their
        // min exposure are seeded like locks, while slots are still open.
        for id in tracker.deficit_ids(produced) {
            if draft.contains(id) {
                continue;
            }
            let Some(player) = self.pool.iter().copied().find(|p| p.id == id) else {
                continue;
            };
            let home = (0..slot_count)
                .filter(|i| draft.slots[*i].is_none() && self.slots[*i].accepts(&player.position))
                .min_by_key(|i| (self.eligible_count(*i), *i));
            if let Some(idx) = home {
                draft.slots[idx] = Some(player);
            }
        }

        let mut order: Vec<usize> = (0..slot_count)
            .filter(|i| draft.slots[*i].is_none())
            .collect();
        order.sort_by_key(|i| (self.eligible_count(*i), *i));

        for (k, &slot_idx) in order.iter().enumerate() {
            // Reserve at least the cheapest fill for every slot still open.
            let reserve: u32 = order[k + 1..].iter().map(|i| self.cheapest[*i]).sum();
            let rostered = draft.players();
            let salary_now = draft.salary();

            let mut best: Option<(f64, &Player)> = None;
            for candidate in &self.pool {
                let candidate = *candidate;
                if !self.slots[slot_idx].accepts(&candidate.position)
                    || draft.contains(candidate.id)
                    || banned.contains(&candidate.id)
                    || !tracker.may_add(candidate.id)
                {
                    continue;
                }
                if salary_now + candidate.salary + reserve > self.cfg.salary_cap {
                    continue;
                }
                if self.violates_stack_max(&rostered, candidate) {
                    continue;
                }
                let bonus = scoring::correlation_bonus(candidate, &rostered, self.matrix);
                let weighted =
                    scoring::base_points(candidate, self.cfg) + self.cfg.correlation_weight * bonus;
                let per_dollar = weighted / (f64::from(candidate.salary.max(1)) / 1_000.0);
                let score = per_dollar * tracker.penalty(candidate.id);
                if better(score, candidate, best) {
                    best = Some((score, candidate));
                }
            }
            let (_, pick) = best?;
            draft.slots[slot_idx] = Some(pick);
        }

        if !self.repair_stack_minimums(&mut draft, tracker, produced, banned) {
            return None;
        }
        Some(draft)
    }

    fn violates_stack_max(&self, rostered: &[&Player], candidate: &Player) -> bool {
        self.cfg.stack_rules.iter().any(|rule| {
            rule.covers(candidate)
                && rostered.iter().filter(|p| rule.covers(p)).count() + 1 > rule.max
        })
    }

    /// A swap may never push a rule over its max, and may only leave a rule
    /// under its min if it was already under and is not being made worse.
    fn swap_keeps_stacks(&self, draft: &Draft<'a>, idx: usize, candidate: &'a Player) -> bool {
        let before = draft.players();
        let after = draft.players_with_swap(idx, candidate);
        self.cfg.stack_rules.iter().all(|rule| {
            let was = before.iter().filter(|p| rule.covers(p)).count();
            let now = after.iter().filter(|p| rule.covers(p)).count();
            now <= rule.max && (now >= rule.min || now >= was)
        })
    }

    /// Targeted swaps that pull covered players in until every min-stack rule
    /// is satisfied. Returns false when a rule cannot be repaired.
    fn repair_stack_minimums(
        &self,
        draft: &mut Draft<'a>,
        tracker: &ExposureTracker,
        produced: usize,
        banned: &HashSet<PlayerId>,
    ) -> bool {
        for rule in &self.cfg.stack_rules {
            loop {
                let have = draft.players().iter().filter(|p| rule.covers(p)).count();
                if have >= rule.min {
                    break;
                }
                let salary_now = draft.salary();
                let mut best: Option<(f64, usize, &'a Player)> = None;
                for idx in 0..self.slots.len() {
                    let Some(occupant) = draft.slots[idx] else {
                        continue;
                    };
                    if rule.covers(occupant)
                        || self.locked_ids.contains(&occupant.id)
                        || tracker.must_include(occupant.id, produced)
                    {
                        continue;
                    }
                    for candidate in &self.pool {
                        let candidate = *candidate;
                        if !rule.covers(candidate)
                            || !self.slots[idx].accepts(&candidate.position)
                            || draft.contains(candidate.id)
                            || banned.contains(&candidate.id)
                            || !tracker.may_add(candidate.id)
                        {
                            continue;
                        }
                        if salary_now - occupant.salary + candidate.salary > self.cfg.salary_cap {
                            continue;
                        }
                        if !self.swap_keeps_stacks(draft, idx, candidate) {
                            continue;
                        }
                        let obj = scoring::objective(
                            &draft.players_with_swap(idx, candidate),
                            self.matrix,
                            self.cfg,
                        );
                        if better(obj, candidate, best.map(|(o, _, p)| (o, p))) {
                            best = Some((obj, idx, candidate));
                        }
                    }
                }
                let Some((_, idx, candidate)) = best else {
                    return false;
                };
                draft.slots[idx] = Some(candidate);
            }
        }
        true
    }

    /// Best-improvement pairwise swaps until a pass finds nothing better.
    fn refine(
        &self,
        draft: &mut Draft<'a>,
        tracker: &ExposureTracker,
        produced: usize,
        banned: &HashSet<PlayerId>,
    ) {
        for _ in 0..SWAP_PASSES {
            let current = scoring::objective(&draft.players(), self.matrix, self.cfg);
            let salary_now = draft.salary();
            let mut best: Option<(f64, usize, &'a Player)> = None;
            for idx in 0..self.slots.len() {
                let Some(occupant) = draft.slots[idx] else {
                    continue;
                };
                if self.locked_ids.contains(&occupant.id)
                    || tracker.must_include(occupant.id, produced)
                {
                    continue;
                }
                for candidate in &self.pool {
                    let candidate = *candidate;
                    if !self.slots[idx].accepts(&candidate.position)
                        || draft.contains(candidate.id)
                        || banned.contains(&candidate.id)
                        || !tracker.may_add(candidate.id)
                    {
                        continue;
                    }
                    if salary_now - occupant.salary + candidate.salary > self.cfg.salary_cap {
                        continue;
                    }
                    if !self.swap_keeps_stacks(draft, idx, candidate) {
                        continue;
                    }
                    let obj = scoring::objective(
                        &draft.players_with_swap(idx, candidate),
                        self.matrix,
                        self.cfg,
                    );
                    if obj - current > SCORE_EPS
                        && better(obj, candidate, best.map(|(o, _, p)| (o, p)))
                    {
                        best = Some((obj, idx, candidate));
                    }
                }
            }
            let Some((_, idx, candidate)) = best else { break };
            draft.slots[idx] = Some(candidate);
        }
    }

    /// Diversity gate: a candidate may share at most `max_shared` players
    /// with any accepted lineup, and may never duplicate one outright.
    fn diverse_against(&self, accepted: &[Lineup], draft: &Draft<'a>, max_shared: usize) -> bool {
        let players = draft.players();
        accepted.iter().all(|lineup| {
            let shared = players.iter().filter(|p| lineup.contains(p.id)).count();
            shared <= max_shared && shared < self.slots.len()
        })
    }

    fn finish(&self, draft: &Draft<'a>) -> Lineup {
        let assignments: Vec<(&str, &Player)> = self
            .slots
            .iter()
            .zip(&draft.slots)
            .filter_map(|(slot, occupant)| occupant.map(|p| (slot.label.as_str(), p)))
            .collect();
        let correlation = scoring::lineup_correlation(&draft.players(), self.matrix);
        Lineup::from_assignments(&assignments, correlation)
    }
}

/// Tie-break chain: higher score, then lower salary, then lower id.
fn better(score: f64, candidate: &Player, best: Option<(f64, &Player)>) -> bool {
    match best {
        None => true,
        Some((best_score, best_player)) => {
            if (score - best_score).abs() > SCORE_EPS {
                score > best_score
            } else if candidate.salary != best_player.salary {
                candidate.salary < best_player.salary
            } else {
                candidate.id < best_player.id
            }
        }
    }
}

/// Backtracking assignment of players to accepting free slots,
/// most-constrained player first. Exact, so a feasible lock set is never
/// rejected by placement order.
fn assign_to_slots<'a>(
    players: &[&'a Player],
    slots: &[RosterSlot],
    free: &[usize],
) -> Option<Vec<(usize, &'a Player)>> {
    let mut order: Vec<&Player> = players.to_vec();
    order.sort_by_key(|p| {
        (
            free.iter()
                .filter(|&&s| slots[s].accepts(&p.position))
                .count(),
            p.id,
        )
    });
    let mut taken = vec![false; free.len()];
    let mut placed = Vec::with_capacity(order.len());
    if place(&order, 0, slots, free, &mut taken, &mut placed) {
        Some(placed)
    } else {
        None
    }
}

fn place<'a>(
    players: &[&'a Player],
    next: usize,
    slots: &[RosterSlot],
    free: &[usize],
    taken: &mut [bool],
    placed: &mut Vec<(usize, &'a Player)>,
) -> bool {
    let Some(player) = players.get(next) else {
        return true;
    };
    for (i, &slot_idx) in free.iter().enumerate() {
        if taken[i] || !slots[slot_idx].accepts(&player.position) {
            continue;
        }
        taken[i] = true;
        placed.push((slot_idx, player));
        if place(players, next + 1, slots, free, taken, placed) {
            return true;
        }
        placed.pop();
        taken[i] = false;
    }
    false
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
