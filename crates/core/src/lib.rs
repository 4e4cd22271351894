pub mod config;
pub mod contest;
pub mod error;
pub mod lineup;
pub mod player;
pub mod sport;

pub use config::{ExposureBound, OptimizationConfig, SimulationConfig, StackRule, StackScope};
pub use contest::{Contest, ContestPhase, ContestType, PayoutStructure, PayoutTier};
pub use error::{DfsError, Result};
pub use lineup::{Lineup, LineupSlot};
pub use player::{Player, PlayerId, Position, RosterSlot};
pub use sport::{DistributionFamily, PositionProfile, SportConfig, SportKind};
