//! Error types for the progression engine.

use thiserror::Error;

/// Errors surfaced by the engine entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("week {week} is not part of this program (configured weeks: {configured:?})")]
    InvalidWeek { week: u32, configured: Vec<u32> },

    #[error("unknown lift: {0}")]
    UnknownLift(String),
}
