//! liftplan - Strength-training planner
//!
//! Computes per-week training maxes from a program definition and the
//! logged performance, and turns them into the week's workout plan.
//! Three progression schemes are supported: percentage-based rep-outs,
//! AMRAP-driven structured sets and linear pass/fail progression.

pub mod db;
pub mod error;
pub mod export;
pub mod history;
pub mod percentiles;
pub mod plan;
pub mod program;
pub mod progression;
pub mod rounding;

pub use db::Database;
pub use error::PlanError;
pub use history::{AccessoryLogs, LogHistory};
pub use plan::{week_plan, PlanItem, WeekPlan};
pub use program::ProgramConfig;
pub use progression::{compute_training_maxes, final_training_maxes, WeeklyMaxes};
