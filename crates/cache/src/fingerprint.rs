//! Stable request fingerprints.
//!
//! A key canonicalizes everything that determines a result — the player pool
//! sorted by id, the optimization rules, the simulation parameters — and
//! hashes the serialized form with xxh3. Wall-clock values never enter the
//! digest, so semantically identical requests map to the same key across
//! process restarts.

use serde::Serialize;
use slate_core::{DfsError, OptimizationConfig, Player, Result, SimulationConfig};
use xxhash_rust::xxh3::xxh3_64;

/// Hashes any serializable value into an opaque 16-hex-digit key.
///
/// # Errors
///
/// `DfsError::Validation` if the value cannot be serialized.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| DfsError::validation(format!("fingerprint serialization: {e}")))?;
    Ok(format!("{:016x}", xxh3_64(&bytes)))
}

/// Fingerprint of a full engine request. The pool is sorted by player id
/// first, so caller-side ordering does not split the cache.
///
/// # Errors
///
/// `DfsError::Validation` if any component cannot be serialized.
pub fn request_fingerprint(
    players: &[Player],
    opt: &OptimizationConfig,
    sim: Option<&SimulationConfig>,
) -> Result<String> {
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by_key(|p| p.id);
    fingerprint(&(sorted, opt, sim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::{PlayerId, Position};

    fn player(id: u64, salary: u32) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("P{id}"),
            position: Position::new("WR"),
            team: "KC".to_string(),
            game: "KC@BUF".to_string(),
            salary,
            projection: 12.0,
            floor: 6.0,
            ceiling: 20.0,
            ownership_pct: 10.0,
        }
    }

    #[test]
    fn pool_order_does_not_change_the_key() {
        let forward = vec![player(1, 5_000), player(2, 6_000), player(3, 7_000)];
        let shuffled = vec![player(3, 7_000), player(1, 5_000), player(2, 6_000)];
        let cfg = OptimizationConfig::default();

        let a = request_fingerprint(&forward, &cfg, None).unwrap();
        let b = request_fingerprint(&shuffled, &cfg, None).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn config_changes_change_the_key() {
        let pool = vec![player(1, 5_000)];
        let base = OptimizationConfig::default();
        let mut raised = OptimizationConfig::default();
        raised.salary_cap += 1;

        let a = request_fingerprint(&pool, &base, None).unwrap();
        let b = request_fingerprint(&pool, &raised, None).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn simulation_seed_changes_the_key() {
        let pool = vec![player(1, 5_000)];
        let cfg = OptimizationConfig::default();
        let sim_a = SimulationConfig::new(1_000).with_seed(1);
        let sim_b = SimulationConfig::new(1_000).with_seed(2);

        let a = request_fingerprint(&pool, &cfg, Some(&sim_a)).unwrap();
        let b = request_fingerprint(&pool, &cfg, Some(&sim_b)).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn key_is_sixteen_hex_digits() {
        let key = fingerprint(&"payload").unwrap();
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
