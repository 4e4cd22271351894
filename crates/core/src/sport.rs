//! Per-sport tuning: roster shapes, score distribution families, and
//! variance ratios.
//!
//! Coded presets cover the common slates; deployments override them through
//! `config/Sport.toml` or `SLATE_`-prefixed environment variables.

use crate::player::{Position, RosterSlot};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Sports the engine ships presets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportKind {
    Nfl,
    Nba,
    Mlb,
    Golf,
}

/// Parametric family used for a position's score distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionFamily {
    /// Symmetric outcomes around the projection.
    Normal,
    /// Heavy right tail for boom/bust roles.
    LogNormal,
    /// Bounded outcomes (cut-probability style scoring).
    Beta,
    /// Skewed positive with a hard floor at zero.
    Gamma,
}

/// Distribution family and spread for one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionProfile {
    /// Position label this profile applies to.
    pub position: Position,
    /// Distribution family.
    pub family: DistributionFamily,
    /// Standard deviation as a fraction of the projection.
    pub variance_ratio: f64,
}

/// Complete per-sport tuning block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportConfig {
    /// Which sport this block describes.
    pub sport: SportKind,
    /// Required roster slots, in output order.
    pub roster: Vec<RosterSlot>,
    /// Per-position distribution profiles.
    pub profiles: Vec<PositionProfile>,
    /// Fallback spread for positions without a profile.
    pub default_variance_ratio: f64,
    /// Mean quality of opposing field entries relative to the slate
    /// average projection (1.0 = field projects like our pool).
    pub field_strength: f64,
}

impl SportConfig {
    /// Classic NFL roster: QB / 2 RB / 3 WR / TE / FLEX / DST under a
    /// $50,000-style cap, with heavier tails at the skill positions.
    #[must_use]
    pub fn nfl_classic() -> Self {
        Self {
            sport: SportKind::Nfl,
            roster: vec![
                RosterSlot::single("QB"),
                RosterSlot::single("RB"),
                RosterSlot::single("RB"),
                RosterSlot::single("WR"),
                RosterSlot::single("WR"),
                RosterSlot::single("WR"),
                RosterSlot::single("TE"),
                RosterSlot::flex("FLEX", &["RB", "WR", "TE"]),
                RosterSlot::single("DST"),
            ],
            profiles: vec![
                PositionProfile {
                    position: Position::new("QB"),
                    family: DistributionFamily::Normal,
                    variance_ratio: 0.22,
                },
                PositionProfile {
                    position: Position::new("RB"),
                    family: DistributionFamily::Gamma,
                    variance_ratio: 0.28,
                },
                PositionProfile {
                    position: Position::new("WR"),
                    family: DistributionFamily::LogNormal,
                    variance_ratio: 0.35,
                },
                PositionProfile {
                    position: Position::new("TE"),
                    family: DistributionFamily::LogNormal,
                    variance_ratio: 0.40,
                },
                PositionProfile {
                    position: Position::new("DST"),
                    family: DistributionFamily::Normal,
                    variance_ratio: 0.45,
                },
            ],
            default_variance_ratio: 0.25,
            field_strength: 0.95,
        }
    }

    /// Golf classic: six interchangeable golfer slots; Beta-shaped scoring
    /// dominated by making or missing the cut.
    #[must_use]
    pub fn golf_classic() -> Self {
        Self {
            sport: SportKind::Golf,
            roster: (0..6).map(|_| RosterSlot::single("G")).collect(),
            profiles: vec![PositionProfile {
                position: Position::new("G"),
                family: DistributionFamily::Beta,
                variance_ratio: 0.30,
            }],
            default_variance_ratio: 0.30,
            field_strength: 0.93,
        }
    }

    /// NBA classic: PG/SG/SF/PF/C plus G/F/UTIL flex slots.
    #[must_use]
    pub fn nba_classic() -> Self {
        Self {
            sport: SportKind::Nba,
            roster: vec![
                RosterSlot::single("PG"),
                RosterSlot::single("SG"),
                RosterSlot::single("SF"),
                RosterSlot::single("PF"),
                RosterSlot::single("C"),
                RosterSlot::flex("G", &["PG", "SG"]),
                RosterSlot::flex("F", &["SF", "PF"]),
                RosterSlot::flex("UTIL", &["PG", "SG", "SF", "PF", "C"]),
            ],
            profiles: vec![],
            default_variance_ratio: 0.20,
            field_strength: 0.96,
        }
    }

    /// Profile for a position, falling back to Normal at the default ratio.
    #[must_use]
    pub fn profile_for(&self, position: &Position) -> (DistributionFamily, f64) {
        self.profiles
            .iter()
            .find(|p| &p.position == position)
            .map_or(
                (DistributionFamily::Normal, self.default_variance_ratio),
                |p| (p.family, p.variance_ratio),
            )
    }

    /// Loads the config for a sport, merging `config/Sport.toml` and
    /// `SLATE_`-prefixed environment variables over the coded preset.
    ///
    /// # Errors
    ///
    /// Returns an error if an override file exists but cannot be parsed.
    pub fn load(preset: SportConfig) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(preset))
            .merge(Toml::file("config/Sport.toml"))
            .merge(Env::prefixed("SLATE_"))
            .extract()
    }
}
