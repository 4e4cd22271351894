//! Player pool types.
//!
//! A `Player` is immutable within one optimization/simulation run. The pool
//! itself is supplied by an external projection service; this crate only
//! defines the shape it arrives in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique player identifier.
///
/// Ordering on the raw id is the final deterministic tie-breaker everywhere
/// two candidates are otherwise indistinguishable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Roster position label (e.g. "QB", "RB", "G" for golf).
///
/// Kept as a validated string rather than an enum so one type covers every
/// sport the engine is configured for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Position(String);

// Deserialization funnels through `new` so external data (CSV pools, JSON
// configs) gets the same normalization as in-process construction.
impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl Position {
    /// Creates a position from a label, normalizing to uppercase.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_uppercase())
    }

    /// Returns the normalized label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Position {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// One competitor in the player pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Roster position.
    pub position: Position,
    /// Team abbreviation (e.g. "KC").
    pub team: String,
    /// Game/matchup identifier (e.g. "KC@BUF"); golf slates use wave labels.
    pub game: String,
    /// Salary in whole currency units.
    pub salary: u32,
    /// Projected fantasy points.
    pub projection: f64,
    /// Floor projection (pessimistic outcome).
    pub floor: f64,
    /// Ceiling projection (optimistic outcome).
    pub ceiling: f64,
    /// Projected ownership percentage across the field (0-100).
    pub ownership_pct: f64,
}

impl Player {
    /// Projected points per 1,000 salary units. Zero-salary players
    /// (shouldn't exist in a real pool) rank last rather than dividing by zero.
    #[must_use]
    pub fn value(&self) -> f64 {
        if self.salary == 0 {
            return 0.0;
        }
        self.projection / (f64::from(self.salary) / 1_000.0)
    }

    /// Returns true when both players are rostered on the same team.
    #[must_use]
    pub fn same_team(&self, other: &Player) -> bool {
        self.team == other.team
    }

    /// Returns true when both players appear in the same game.
    #[must_use]
    pub fn same_game(&self, other: &Player) -> bool {
        self.game == other.game
    }
}

/// A single required roster slot and the positions eligible to fill it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlot {
    /// Slot label shown in output (e.g. "FLEX").
    pub label: String,
    /// Positions allowed in this slot.
    pub eligible: Vec<Position>,
}

impl RosterSlot {
    /// Creates a slot restricted to a single position.
    pub fn single(label: &str) -> Self {
        Self {
            label: label.to_string(),
            eligible: vec![Position::new(label)],
        }
    }

    /// Creates a slot that accepts any of the given positions.
    pub fn flex(label: &str, eligible: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            eligible: eligible.iter().map(|p| Position::new(*p)).collect(),
        }
    }

    /// Returns true if a player with `position` may occupy this slot.
    #[must_use]
    pub fn accepts(&self, position: &Position) -> bool {
        self.eligible.contains(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64, salary: u32, projection: f64) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("P{id}"),
            position: Position::new("RB"),
            team: "KC".to_string(),
            game: "KC@BUF".to_string(),
            salary,
            projection,
            floor: projection * 0.5,
            ceiling: projection * 1.5,
            ownership_pct: 10.0,
        }
    }

    #[test]
    fn position_normalizes_case_and_whitespace() {
        assert_eq!(Position::new(" qb "), Position::new("QB"));
        assert_eq!(Position::new("flex").as_str(), "FLEX");
    }

    #[test]
    fn position_deserialization_normalizes_like_new() {
        let position: Position = serde_json::from_str("\"wr\"").unwrap();
        assert_eq!(position, Position::new("WR"));
    }

    #[test]
    fn value_is_points_per_thousand() {
        let p = player(1, 8_000, 20.0);
        assert!((p.value() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn value_handles_zero_salary() {
        let p = player(1, 0, 20.0);
        assert!((p.value() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flex_slot_accepts_all_listed_positions() {
        let slot = RosterSlot::flex("FLEX", &["RB", "WR", "TE"]);
        assert!(slot.accepts(&Position::new("WR")));
        assert!(!slot.accepts(&Position::new("QB")));
    }

    #[test]
    fn player_id_ordering_follows_raw_id() {
        assert!(PlayerId(3) < PlayerId(10));
    }
}
