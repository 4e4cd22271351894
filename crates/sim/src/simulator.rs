//! Correlation-aware Monte Carlo contest simulator.
//!
//! Trials are partitioned across blocking worker tasks, each with its own
//! seeded RNG and private aggregates; the caller merges after the join
//! barrier. Correlated draws go through a Gaussian copula: correlate
//! standard normals with the Cholesky factor of the matrix, map each through
//! Φ, then through the player's marginal quantile function, preserving the
//! marginal while inducing the pairwise correlation.
//!
//! Progress is streamed over an optional channel as monotonically
//! non-decreasing completed counts, reaching the total exactly once.
//! Deadlines cancel cooperatively between trial batches.

use crate::correlation::{CholeskyFactor, CorrelationMatrix};
use crate::distribution::ScoreDistribution;
use crate::stats::{SimulationResult, WorkerAggregate};
use rand::distributions::Distribution as RandDistribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use slate_core::{DfsError, Lineup, PayoutStructure, PlayerId, Result, SimulationConfig};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Spreads worker seeds across the u64 space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Completion state streamed to the caller while a simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Trials finished so far.
    pub completed: usize,
    /// Trials requested.
    pub total: usize,
}

/// Opposing-field model for contest ranking.
#[derive(Debug, Clone)]
struct ContestModel {
    size: f64,
    payouts: PayoutStructure,
    entry_fee: f64,
    field_mean: f64,
    field_std: f64,
}

/// Everything a worker needs, shared read-only.
struct SimPlan {
    /// Marginal distribution per ordered player index.
    dists: Vec<ScoreDistribution>,
    /// Copula factor; `None` means independent draws.
    cholesky: Option<CholeskyFactor>,
    /// Lineup → ordered-player indices.
    members: Vec<Vec<usize>>,
    contest: Option<ContestModel>,
    std_normal: Normal,
}

/// Runs correlated Monte Carlo trials over a lineup batch.
pub struct MonteCarloSimulator;

impl MonteCarloSimulator {
    /// Simulates every lineup across `cfg.num_simulations` correlated trials
    /// and returns one summary per lineup, in input order.
    ///
    /// `progress` may be `None` to skip reporting; it is safe to forward the
    /// stream from an HTTP handler onto a WebSocket.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed config, an empty lineup batch, or a
    ///   rostered player with no distribution.
    /// - `Timeout` when the deadline expires before the trials finish.
    pub async fn simulate(
        lineups: &[Lineup],
        matrix: &CorrelationMatrix,
        distributions: &HashMap<PlayerId, ScoreDistribution>,
        cfg: &SimulationConfig,
        progress: Option<mpsc::Sender<Progress>>,
    ) -> Result<Vec<SimulationResult>> {
        cfg.validate()?;
        if lineups.is_empty() {
            return Err(DfsError::validation("no lineups to simulate"));
        }

        let plan = Arc::new(Self::build_plan(lineups, matrix, distributions, cfg)?);

        let total = cfg.num_simulations;
        let workers = cfg.workers.min(total);
        let base_seed = cfg
            .seed
            .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
        let counter = Arc::new(AtomicUsize::new(0));
        let cancel = Arc::new(AtomicBool::new(false));
        let started = Instant::now();

        debug!(
            lineups = lineups.len(),
            players = plan.dists.len(),
            trials = total,
            workers,
            correlated = plan.cholesky.is_some(),
            "starting simulation"
        );

        let watchdog = cfg.max_runtime_ms.map(|ms| {
            let cancel = Arc::clone(&cancel);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                cancel.store(true, Ordering::Relaxed);
            })
        });

        // Workers report finished batch sizes to a single forwarder, whose
        // lone accumulator is what makes the emitted counts monotonic.
        let (batch_tx, batch_rx) = mpsc::unbounded_channel::<usize>();
        let forwarder =
            progress.map(|sink| tokio::spawn(forward_progress(batch_rx, sink, total)));
        let batch_tx = if forwarder.is_some() {
            Some(batch_tx)
        } else {
            None
        };

        let mut handles = Vec::with_capacity(workers);
        let base = total / workers;
        let remainder = total % workers;
        for w in 0..workers {
            let trials = base + usize::from(w < remainder);
            let plan = Arc::clone(&plan);
            let cancel = Arc::clone(&cancel);
            let counter = Arc::clone(&counter);
            let tx = batch_tx.clone();
            let batch = cfg.progress_batch;
            let seed = base_seed.wrapping_add((w as u64 + 1).wrapping_mul(SEED_STRIDE));
            handles.push(tokio::task::spawn_blocking(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                run_worker(&plan, trials, batch, &mut rng, &cancel, &counter, tx)
            }));
        }
        drop(batch_tx);

        // Join barrier; aggregates collected in worker order keeps the merge
        // (and therefore the statistics) bit-reproducible per seed.
        let mut aggregates = Vec::with_capacity(workers);
        for handle in handles {
            let agg = handle
                .await
                .map_err(|e| DfsError::validation(format!("simulation worker failed: {e}")))?;
            aggregates.push(agg);
        }
        if let Some(forwarder) = forwarder {
            let _ = forwarder.await;
        }
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let completed = counter.load(Ordering::Relaxed);
        if cancel.load(Ordering::Relaxed) && completed < total {
            warn!(completed, total, "simulation hit its deadline");
            return Err(DfsError::Timeout {
                elapsed_ms: elapsed_ms(started),
                completed,
                total,
            });
        }

        let mut merged = WorkerAggregate::new(plan.members.len(), total);
        for agg in aggregates {
            merged.trials += agg.trials;
            for (i, accum) in agg.lineups.into_iter().enumerate() {
                merged.lineups[i].merge(accum);
            }
        }

        info!(
            lineups = plan.members.len(),
            trials = total,
            elapsed_ms = elapsed_ms(started),
            "simulation complete"
        );

        Ok(merged
            .lineups
            .into_iter()
            .enumerate()
            .map(|(i, accum)| accum.finalize(i, cfg.entry_fee))
            .collect())
    }

    fn build_plan(
        lineups: &[Lineup],
        matrix: &CorrelationMatrix,
        distributions: &HashMap<PlayerId, ScoreDistribution>,
        cfg: &SimulationConfig,
    ) -> Result<SimPlan> {
        // Sorted union of rostered players fixes the copula ordering.
        let ordered: Vec<PlayerId> = lineups
            .iter()
            .flat_map(Lineup::player_ids)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<PlayerId, usize> =
            ordered.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut dists = Vec::with_capacity(ordered.len());
        for id in &ordered {
            let Some(dist) = distributions.get(id) else {
                return Err(DfsError::validation(format!(
                    "no distribution supplied for player {id}"
                )));
            };
            dists.push(*dist);
        }

        let members: Vec<Vec<usize>> = lineups
            .iter()
            .map(|l| l.player_ids().iter().map(|id| index[id]).collect())
            .collect();

        let cholesky = (cfg.correlated && !matrix.is_empty())
            .then(|| CholeskyFactor::from_matrix(matrix, &ordered));

        let contest = if cfg.contest_size > 0 {
            let payouts = cfg.payouts.clone().unwrap_or_default();
            let slate_mean = lineups.iter().map(|l| l.projected_points).sum::<f64>()
                / lineups.len() as f64;
            let avg_variance = members
                .iter()
                .map(|m| m.iter().map(|&i| dists[i].variance()).sum::<f64>())
                .sum::<f64>()
                / members.len() as f64;
            Some(ContestModel {
                size: cfg.contest_size as f64,
                payouts,
                entry_fee: cfg.entry_fee,
                field_mean: slate_mean * cfg.field_strength,
                field_std: avg_variance.sqrt().max(1e-9),
            })
        } else {
            None
        };

        let std_normal = Normal::new(0.0, 1.0)
            .map_err(|e| DfsError::validation(format!("standard normal: {e}")))?;

        Ok(SimPlan {
            dists,
            cholesky,
            members,
            contest,
            std_normal,
        })
    }
}

/// One worker's slice of the trial budget. Checks the cancel flag between
/// batches, never mid-trial.
fn run_worker(
    plan: &SimPlan,
    trials: usize,
    batch: usize,
    rng: &mut ChaCha8Rng,
    cancel: &AtomicBool,
    counter: &AtomicUsize,
    tx: Option<mpsc::UnboundedSender<usize>>,
) -> WorkerAggregate {
    let players = plan.dists.len();
    let mut agg = WorkerAggregate::new(plan.members.len(), trials);
    let mut eps = vec![0.0; players];
    let mut z = vec![0.0; players];
    let mut scores = vec![0.0; players];

    let mut done = 0;
    while done < trials {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let batch_n = batch.min(trials - done);
        for _ in 0..batch_n {
            draw_scores(plan, rng, &mut eps, &mut z, &mut scores);
            for (li, members) in plan.members.iter().enumerate() {
                let total: f64 = members.iter().map(|&i| scores[i]).sum();
                let accum = &mut agg.lineups[li];
                accum.record(total);
                if let Some(contest) = &plan.contest {
                    score_contest(contest, &plan.std_normal, total, rng, accum);
                }
            }
        }
        done += batch_n;
        agg.trials = done;
        counter.fetch_add(batch_n, Ordering::Relaxed);
        if let Some(tx) = &tx {
            let _ = tx.send(batch_n);
        }
    }

    agg
}

/// Draws one score per ordered player, correlated when a factor is present.
fn draw_scores(
    plan: &SimPlan,
    rng: &mut ChaCha8Rng,
    eps: &mut [f64],
    z: &mut [f64],
    scores: &mut [f64],
) {
    match &plan.cholesky {
        Some(factor) => {
            for e in eps.iter_mut() {
                *e = plan.std_normal.sample(rng);
            }
            factor.correlate(eps, z);
            for (i, zi) in z.iter().enumerate() {
                scores[i] = plan.dists[i].inverse_cdf(plan.std_normal.cdf(*zi));
            }
        }
        None => {
            for (i, slot) in scores.iter_mut().enumerate() {
                *slot = plan.dists[i].sample(rng);
            }
        }
    }
}

/// Ranks one lineup total against the simulated field and credits payouts.
///
/// The number of field entries beating the total is Binomial(size, p); a
/// normal approximation keeps the per-trial cost independent of field size.
fn score_contest(
    contest: &ContestModel,
    std_normal: &Normal,
    total: f64,
    rng: &mut ChaCha8Rng,
    accum: &mut crate::stats::LineupAccum,
) {
    let zscore = (total - contest.field_mean) / contest.field_std;
    let p_beat = 1.0 - std_normal.cdf(zscore);
    let mean = contest.size * p_beat;
    let sd = (contest.size * p_beat * (1.0 - p_beat)).sqrt();
    let noise: f64 = std_normal.sample(rng);
    let beaten_by = (mean + sd * noise).round().clamp(0.0, contest.size);
    let rank = beaten_by as usize + 1;

    let payout = contest.payouts.payout_for_rank(rank);
    if rank == 1 {
        accum.wins += 1;
    }
    let cashed = if contest.entry_fee > 0.0 {
        payout >= contest.entry_fee
    } else {
        payout > 0.0
    };
    if cashed {
        accum.cash_hits += 1;
    }
    accum.payout_sum += payout;
}

/// Accumulates worker batch reports and forwards monotone progress.
async fn forward_progress(
    mut rx: mpsc::UnboundedReceiver<usize>,
    sink: mpsc::Sender<Progress>,
    total: usize,
) {
    let mut completed = 0;
    while let Some(batch) = rx.recv().await {
        completed += batch;
        if sink.send(Progress { completed, total }).await.is_err() {
            break;
        }
        if completed >= total {
            break;
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
