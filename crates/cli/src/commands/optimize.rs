//! Lineup optimization command.

use crate::pool;
use anyhow::{bail, Result};
use clap::Args;
use slate_core::{Lineup, OptimizationConfig, PlayerId, SportConfig};
use slate_optimizer::LineupOptimizer;
use slate_sim::{CorrelationBuilder, CorrelationContext};
use tracing::{info, warn};

/// Arguments for the optimize command.
#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Player pool CSV
    /// (id,name,position,team,game,salary,projection,floor,ceiling,ownership_pct)
    #[arg(long)]
    pub pool: String,

    /// Sport preset: nfl, nba, or golf
    #[arg(long, default_value = "nfl")]
    pub sport: String,

    /// Salary cap per lineup
    #[arg(long, default_value_t = 50_000)]
    pub cap: u32,

    /// Number of lineups to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    pub lineups: usize,

    /// Minimum differing players between any two lineups
    #[arg(long, default_value_t = 1)]
    pub min_unique: usize,

    /// Correlation weight in [0, 1]
    #[arg(long, default_value_t = 0.3)]
    pub alpha: f64,

    /// Ownership fade weight for tournament leverage (0 = off)
    #[arg(long, default_value_t = 0.0)]
    pub fade: f64,

    /// Comma-separated player ids locked into every lineup
    #[arg(long, value_delimiter = ',')]
    pub lock: Vec<u64>,

    /// Comma-separated player ids removed from the pool
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<u64>,

    /// Soft deadline for the whole batch, milliseconds
    #[arg(long)]
    pub max_runtime_ms: Option<u64>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Runs the optimize command.
///
/// # Errors
///
/// Returns an error for unreadable pools, invalid configuration, or an
/// infeasible constraint set. A partial batch is printed with a warning
/// rather than treated as fatal.
pub async fn run_optimize(args: OptimizeArgs) -> Result<()> {
    let players = pool::load_pool(&args.pool)?;
    let sport = sport_preset(&args.sport)?;
    let cfg = optimization_config(&args, &sport);

    let matrix = CorrelationBuilder::build(&players, &CorrelationContext::default());
    info!(
        players = players.len(),
        lineups = args.lineups,
        cap = args.cap,
        "optimizing lineups"
    );

    let lineups = match LineupOptimizer::optimize(&players, &matrix, &cfg) {
        Ok(lineups) => lineups,
        Err(err) => match err.partial_lineups() {
            Some(found) if !found.is_empty() => {
                warn!(%err, "printing the partial batch");
                found.to_vec()
            }
            _ => bail!(err),
        },
    };

    print_lineups(&lineups, args.json)
}

/// Resolves a sport preset and applies file/env overrides.
pub(crate) fn sport_preset(name: &str) -> Result<SportConfig> {
    let preset = match name.to_lowercase().as_str() {
        "nfl" => SportConfig::nfl_classic(),
        "nba" => SportConfig::nba_classic(),
        "golf" => SportConfig::golf_classic(),
        other => bail!("unknown sport preset: {other} (expected nfl, nba, or golf)"),
    };
    Ok(SportConfig::load(preset)?)
}

pub(crate) fn optimization_config(args: &OptimizeArgs, sport: &SportConfig) -> OptimizationConfig {
    let mut cfg = OptimizationConfig::new(args.cap, sport.roster.clone())
        .with_lineup_count(args.lineups)
        .with_min_unique(args.min_unique)
        .with_correlation_weight(args.alpha)
        .with_ownership_fade(args.fade)
        .with_locked(args.lock.iter().copied().map(PlayerId).collect())
        .with_excluded(args.exclude.iter().copied().map(PlayerId).collect());
    if let Some(ms) = args.max_runtime_ms {
        cfg = cfg.with_max_runtime_ms(ms);
    }
    cfg
}

pub(crate) fn print_lineups(lineups: &[Lineup], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(lineups)?);
        return Ok(());
    }
    for (i, lineup) in lineups.iter().enumerate() {
        println!(
            "Lineup {}: ${}  {:.2} pts  correlation {:.2}",
            i + 1,
            lineup.total_salary,
            lineup.projected_points,
            lineup.correlation_score
        );
        for (slot, name, salary, projection) in lineup.to_rows() {
            println!("  {slot:<5} {name:<24} ${salary:<6} {projection:.2}");
        }
        println!();
    }
    Ok(())
}
