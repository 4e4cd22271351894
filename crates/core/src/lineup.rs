//! Lineup representation and derived attributes.

use crate::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// One filled roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSlot {
    /// Slot label ("QB", "FLEX", ...).
    pub label: String,
    /// Player occupying the slot.
    pub player_id: PlayerId,
    /// Player display name, carried for reporting.
    pub player_name: String,
    /// Salary charged against the cap.
    pub salary: u32,
    /// Projected points for the player.
    pub projection: f64,
}

/// An ordered assignment of players to required roster slots.
///
/// Invariants (enforced by the optimizer, checked by its tests):
/// total salary within the cap, every slot filled by an eligible player,
/// no duplicate player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    /// Filled slots, in roster order.
    pub slots: Vec<LineupSlot>,
    /// Sum of member salaries.
    pub total_salary: u32,
    /// Sum of member projections.
    pub projected_points: f64,
    /// Pairwise correlation mass of the roster (see the optimizer's scoring).
    pub correlation_score: f64,
}

impl Lineup {
    /// Builds a lineup from (slot label, player) pairs, computing salary and
    /// projection totals. The correlation score is supplied by the caller
    /// since it depends on the matrix in effect.
    #[must_use]
    pub fn from_assignments(assignments: &[(&str, &Player)], correlation_score: f64) -> Self {
        let slots: Vec<LineupSlot> = assignments
            .iter()
            .map(|(label, p)| LineupSlot {
                label: (*label).to_string(),
                player_id: p.id,
                player_name: p.name.clone(),
                salary: p.salary,
                projection: p.projection,
            })
            .collect();
        let total_salary = slots.iter().map(|s| s.salary).sum();
        let projected_points = slots.iter().map(|s| s.projection).sum();
        Self {
            slots,
            total_salary,
            projected_points,
            correlation_score,
        }
    }

    /// Ids of all rostered players, in slot order.
    #[must_use]
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.slots.iter().map(|s| s.player_id).collect()
    }

    /// Returns true if the player appears anywhere in the lineup.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.slots.iter().any(|s| s.player_id == id)
    }

    /// Number of players this lineup shares with another.
    #[must_use]
    pub fn shared_player_count(&self, other: &Lineup) -> usize {
        self.slots
            .iter()
            .filter(|s| other.contains(s.player_id))
            .count()
    }

    /// Number of roster slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true for the degenerate empty lineup.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Plain ordered rows (slot, name, salary, projection) for exporters.
    #[must_use]
    pub fn to_rows(&self) -> Vec<(String, String, u32, f64)> {
        self.slots
            .iter()
            .map(|s| {
                (
                    s.label.clone(),
                    s.player_name.clone(),
                    s.salary,
                    s.projection,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Position;

    fn player(id: u64, salary: u32, projection: f64) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("P{id}"),
            position: Position::new("WR"),
            team: "KC".to_string(),
            game: "KC@BUF".to_string(),
            salary,
            projection,
            floor: 0.0,
            ceiling: 0.0,
            ownership_pct: 0.0,
        }
    }

    #[test]
    fn totals_sum_over_slots() {
        let a = player(1, 5_000, 12.0);
        let b = player(2, 7_000, 18.0);
        let lineup = Lineup::from_assignments(&[("WR", &a), ("WR", &b)], 0.3);

        assert_eq!(lineup.total_salary, 12_000);
        assert!((lineup.projected_points - 30.0).abs() < 1e-12);
        assert!((lineup.correlation_score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn shared_player_count_is_symmetric() {
        let a = player(1, 5_000, 12.0);
        let b = player(2, 7_000, 18.0);
        let c = player(3, 6_000, 15.0);
        let x = Lineup::from_assignments(&[("WR", &a), ("WR", &b)], 0.0);
        let y = Lineup::from_assignments(&[("WR", &b), ("WR", &c)], 0.0);

        assert_eq!(x.shared_player_count(&y), 1);
        assert_eq!(y.shared_player_count(&x), 1);
    }

    #[test]
    fn contains_finds_rostered_player() {
        let a = player(1, 5_000, 12.0);
        let lineup = Lineup::from_assignments(&[("WR", &a)], 0.0);
        assert!(lineup.contains(PlayerId(1)));
        assert!(!lineup.contains(PlayerId(2)));
    }
}
