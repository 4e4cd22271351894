//! Player pool loading.
//!
//! Pools arrive as CSV exported from an external projection service with the
//! header `id,name,position,team,game,salary,projection,floor,ceiling,ownership_pct`.

use anyhow::{ensure, Context, Result};
use slate_core::Player;

/// Reads and validates a pool CSV.
///
/// # Errors
///
/// Returns an error when the file cannot be opened, a row fails to parse,
/// or the pool comes back empty.
pub fn load_pool(path: &str) -> Result<Vec<Player>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening player pool {path}"))?;
    let mut players = Vec::new();
    for row in reader.deserialize() {
        let player: Player = row.with_context(|| format!("parsing player pool {path}"))?;
        players.push(player);
    }
    ensure!(!players.is_empty(), "player pool {path} has no players");
    Ok(players)
}
