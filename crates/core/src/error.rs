//! Error taxonomy for optimization and simulation requests.
//!
//! Four kinds, with distinct corrective actions: `Validation` (fix the
//! request), `Infeasible` (relax the constraints), `PartialBatch` (accept
//! fewer lineups or relax diversity/exposure), `Timeout` (retry with a
//! larger budget). None of them are retried internally.

use crate::lineup::Lineup;
use thiserror::Error;

/// Errors surfaced by the lineup engine.
#[derive(Debug, Clone, Error)]
pub enum DfsError {
    /// Malformed or self-contradictory request. Raised before any work.
    #[error("validation error: {0}")]
    Validation(String),

    /// Individually valid constraints with no jointly satisfying lineup.
    #[error("infeasible constraints: {0}")]
    Infeasible(String),

    /// Fewer than the requested lineups satisfied diversity/exposure; the
    /// lineups that were found ride along instead of being silently dropped.
    #[error("generated {} of {requested} requested lineups: {reason}", .lineups.len())]
    PartialBatch {
        /// Valid lineups produced before the batch stalled.
        lineups: Vec<Lineup>,
        /// Lineup count originally requested.
        requested: usize,
        /// Why the batch could not be completed.
        reason: String,
    },

    /// Deadline exceeded; `completed`/`total` describe how far the work got
    /// (lineups for optimization, trials for simulation).
    #[error("deadline exceeded after {elapsed_ms}ms ({completed}/{total} units complete)")]
    Timeout {
        /// Wall time consumed before giving up.
        elapsed_ms: u64,
        /// Work units finished when the deadline hit.
        completed: usize,
        /// Work units requested.
        total: usize,
    },
}

impl DfsError {
    /// Creates a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an infeasibility error.
    pub fn infeasible(msg: impl Into<String>) -> Self {
        Self::Infeasible(msg.into())
    }

    /// Returns true for caller errors that must be fixed, not retried.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true when the constraint set admits no lineup at all.
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible(_))
    }

    /// Returns true when a larger time budget could change the outcome.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Lineups recovered from a partial batch, if any.
    #[must_use]
    pub fn partial_lineups(&self) -> Option<&[Lineup]> {
        match self {
            Self::PartialBatch { lineups, .. } => Some(lineups),
            _ => None,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DfsError>;
