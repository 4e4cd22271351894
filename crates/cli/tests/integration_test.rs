//! End-to-end pipeline: player pool in, optimized lineups through the cache,
//! Monte Carlo statistics out.

use slate_cache::{request_fingerprint, ResultCache};
use slate_core::{
    ContestPhase, Lineup, OptimizationConfig, PayoutStructure, Player, PlayerId, Position,
    SimulationConfig, SportConfig,
};
use slate_optimizer::LineupOptimizer;
use slate_sim::{CorrelationBuilder, CorrelationContext, DistributionFactory, MonteCarloSimulator};

fn pool_player(id: u64, position: &str, team_idx: u64, salary: u32, projection: f64) -> Player {
    let opponent = if team_idx % 2 == 0 {
        team_idx + 1
    } else {
        team_idx - 1
    };
    Player {
        id: PlayerId(id),
        name: format!("P{id}"),
        position: Position::new(position),
        team: format!("T{team_idx}"),
        game: format!("T{}@T{}", team_idx.min(opponent), team_idx.max(opponent)),
        salary,
        projection,
        floor: projection * 0.5,
        ceiling: projection * 1.8,
        ownership_pct: (id % 40) as f64,
    }
}

fn nfl_pool() -> Vec<Player> {
    const SHAPE: [&str; 8] = ["QB", "RB", "RB", "WR", "WR", "WR", "TE", "DST"];
    let mut pool = Vec::new();
    let mut id: u64 = 1;
    for team in 0..6u64 {
        for pos in SHAPE {
            let base = match pos {
                "QB" => 6_400,
                "RB" => 5_400,
                "WR" => 4_900,
                "TE" => 3_700,
                _ => 2_900,
            };
            let salary = base + (id % 9) as u32 * 320;
            let projection = f64::from(salary) / 1_000.0 * (2.0 + (id % 5) as f64 * 0.15);
            pool.push(pool_player(id, pos, team, salary, projection));
            id += 1;
        }
    }
    pool
}

#[tokio::test]
async fn full_pipeline_from_pool_to_statistics() {
    let pool = nfl_pool();
    let sport = SportConfig::nfl_classic();
    let matrix = CorrelationBuilder::build(&pool, &CorrelationContext::default());
    let cfg = OptimizationConfig::new(50_000, sport.roster.clone())
        .with_lineup_count(3)
        .with_min_unique(2);

    let cache: ResultCache<Vec<Lineup>> = ResultCache::new();
    let key = request_fingerprint(&pool, &cfg, None).unwrap();
    let lineups = cache
        .get_or_compute(&key, ContestPhase::Scheduled, || {
            LineupOptimizer::optimize(&pool, &matrix, &cfg)
        })
        .unwrap();
    assert_eq!(lineups.len(), 3);

    // Identical request comes back from cache without recomputing.
    let cached = cache
        .get_or_compute(&key, ContestPhase::Scheduled, || {
            panic!("second lookup must not recompute")
        })
        .unwrap();
    assert_eq!(cached, lineups);
    assert_eq!(cache.hits(), 1);

    let distributions = DistributionFactory::for_pool(&pool, &sport).unwrap();
    let sim_cfg = SimulationConfig::new(5_000)
        .with_seed(17)
        .with_workers(2)
        .with_contest(500, PayoutStructure::double_up(500, 5.0), 5.0);

    let results = MonteCarloSimulator::simulate(&lineups, &matrix, &distributions, &sim_cfg, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    for r in &results {
        assert_eq!(r.trials, 5_000);
        assert!(r.min <= r.p25 && r.p25 <= r.p50);
        assert!(r.p50 <= r.p75 && r.p75 <= r.p95 && r.p95 <= r.max);
        assert!(r.std_dev > 0.0);
        assert!(r.cash_probability >= 0.0 && r.cash_probability <= 100.0);
    }
}
