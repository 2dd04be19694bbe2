//! Program configuration - static definition of a training cycle
//!
//! A program is immutable once a cycle starts. Week and day numbers are
//! integer keys in memory; nested maps read and write them as string keys
//! in JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Top single is shown at this fraction of the training max unless configured
pub const DEFAULT_SINGLE_AT_8_PERCENT: f64 = 0.9;

/// Accessory prescription when the item does not specify one
pub const DEFAULT_ACCESSORY_SETS: u32 = 4;
pub const DEFAULT_ACCESSORY_REPS: u32 = 10;

fn default_rounding() -> f64 {
    5.0
}

/// Static configuration of a training cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Week numbers included in the cycle, ascending
    pub weeks: Vec<u32>,
    /// Plate increment every displayed weight is quantized to
    #[serde(default = "default_rounding")]
    pub rounding: f64,
    /// Starting training max per lift
    pub initial_maxes: BTreeMap<String, f64>,
    #[serde(default)]
    pub single_at_8_percent: BTreeMap<String, f64>,
    /// Percentage-scheme week descriptors: lift -> week -> descriptor
    #[serde(default)]
    pub lifts: BTreeMap<String, BTreeMap<u32, WeekDescriptor>>,
    /// Day -> ordered exercise items
    #[serde(default)]
    pub days: BTreeMap<u32, Vec<ExerciseItem>>,
    /// Day -> weeks in which the day is shown. Absent means every week.
    #[serde(default)]
    pub day_visibility: Option<BTreeMap<u32, BTreeSet<u32>>>,
    #[serde(default)]
    pub linear_progression_config: Option<LinearProgressionConfig>,
}

/// One week of a percentage-scheme lift
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekDescriptor {
    pub intensity: f64,
    pub reps_per_normal_set: u32,
    pub rep_out_target: u32,
    pub sets: u32,
}

/// A single set of a structured exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuredSet {
    pub intensity: f64,
    pub target_reps: u32,
    #[serde(default)]
    pub is_amrap: bool,
}

/// Exercise item as configured on a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseItem {
    /// Training max display with a top single
    Tm {
        name: String,
        #[serde(default)]
        lift: Option<String>,
    },
    /// Percentage-scheme working sets
    Volume {
        name: String,
        #[serde(default)]
        lift: Option<String>,
    },
    Accessory {
        name: String,
        #[serde(default)]
        sets: Option<u32>,
        #[serde(default)]
        reps: Option<u32>,
    },
    /// Per-set prescription, static or keyed by week
    Structured {
        name: String,
        #[serde(default)]
        lift: Option<String>,
        #[serde(default)]
        sets: Vec<StructuredSet>,
        /// Week number (as a string key) -> set list. Kept string-keyed since
        /// tagged enum content cannot parse integer map keys.
        #[serde(default)]
        sets_by_week: BTreeMap<String, Vec<StructuredSet>>,
    },
    Linear {
        name: String,
        #[serde(default)]
        lift: Option<String>,
        sets: u32,
        reps: u32,
        /// Index of the set that decides pass/fail
        #[serde(default)]
        progression_set: Option<usize>,
    },
}

impl ExerciseItem {
    pub fn name(&self) -> &str {
        match self {
            ExerciseItem::Tm { name, .. }
            | ExerciseItem::Volume { name, .. }
            | ExerciseItem::Accessory { name, .. }
            | ExerciseItem::Structured { name, .. }
            | ExerciseItem::Linear { name, .. } => name.as_str(),
        }
    }

    /// Lift this item tracks. Falls back to the display name when no explicit
    /// reference is configured; accessories never track a lift.
    pub fn lift(&self) -> Option<&str> {
        match self {
            ExerciseItem::Tm { name, lift }
            | ExerciseItem::Volume { name, lift }
            | ExerciseItem::Structured { name, lift, .. }
            | ExerciseItem::Linear { name, lift, .. } => {
                Some(lift.as_deref().unwrap_or(name.as_str()))
            }
            ExerciseItem::Accessory { .. } => None,
        }
    }

    /// Type tag as written in program files
    pub fn kind(&self) -> &'static str {
        match self {
            ExerciseItem::Tm { .. } => "tm",
            ExerciseItem::Volume { .. } => "volume",
            ExerciseItem::Accessory { .. } => "accessory",
            ExerciseItem::Structured { .. } => "structured",
            ExerciseItem::Linear { .. } => "linear",
        }
    }

    /// Set list of a structured item for `week`: the week-specific list if one
    /// is configured for that week, else the static list. Other item kinds
    /// have no set list.
    pub fn sets_for_week(&self, week: u32) -> &[StructuredSet] {
        match self {
            ExerciseItem::Structured {
                sets, sets_by_week, ..
            } => sets_by_week
                .get(&week.to_string())
                .unwrap_or(sets)
                .as_slice(),
            _ => &[],
        }
    }
}

/// Linear progression tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearProgressionConfig {
    /// Weight added after a successful session
    pub increment: f64,
    /// Per-lift overrides of `increment`
    pub increments: BTreeMap<String, f64>,
    pub failures_before_deload: u32,
    /// Fraction removed from the working weight on deload
    pub deload_percentage: f64,
}

impl Default for LinearProgressionConfig {
    fn default() -> Self {
        Self {
            increment: 5.0,
            increments: BTreeMap::new(),
            failures_before_deload: 3,
            deload_percentage: 0.10,
        }
    }
}

impl LinearProgressionConfig {
    pub fn increment_for(&self, lift: &str) -> f64 {
        self.increments.get(lift).copied().unwrap_or(self.increment)
    }
}

impl ProgramConfig {
    /// Parse a program definition
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn contains_week(&self, week: u32) -> bool {
        self.weeks.contains(&week)
    }

    /// Reject weeks outside the configured cycle
    pub fn validate_week(&self, week: u32) -> Result<(), PlanError> {
        if self.contains_week(week) {
            Ok(())
        } else {
            Err(PlanError::InvalidWeek {
                week,
                configured: self.weeks.clone(),
            })
        }
    }

    /// Last configured week (0 for an empty program)
    pub fn final_week(&self) -> u32 {
        self.weeks.iter().copied().max().unwrap_or(0)
    }

    pub fn is_day_visible(&self, day: u32, week: u32) -> bool {
        match &self.day_visibility {
            Some(visibility) => visibility
                .get(&day)
                .is_none_or(|weeks| weeks.contains(&week)),
            None => true,
        }
    }

    pub fn single_at_8(&self, lift: &str) -> f64 {
        self.single_at_8_percent
            .get(lift)
            .copied()
            .unwrap_or(DEFAULT_SINGLE_AT_8_PERCENT)
    }

    pub fn week_descriptor(&self, lift: &str, week: u32) -> Option<&WeekDescriptor> {
        self.lifts.get(lift)?.get(&week)
    }

    pub fn linear_config(&self) -> LinearProgressionConfig {
        self.linear_progression_config.clone().unwrap_or_default()
    }

    /// Strict lookup of a starting max
    pub fn require_initial_max(&self, lift: &str) -> Result<f64, PlanError> {
        self.initial_maxes
            .get(lift)
            .copied()
            .ok_or_else(|| PlanError::UnknownLift(lift.to_string()))
    }

    /// Structured items of every day, in day order, paired with their day
    pub fn structured_items(&self) -> impl Iterator<Item = (u32, &ExerciseItem)> {
        self.days.iter().flat_map(|(day, items)| {
            items
                .iter()
                .filter(|item| matches!(item, ExerciseItem::Structured { .. }))
                .map(move |item| (*day, item))
        })
    }
}
