//! Plan assembler - resolved workout items for one week
//!
//! Merges the training maxes of every scheme, applies day visibility and
//! expands each configured exercise into a renderable item. Items whose
//! data is missing (no training max, no descriptor, empty set list) are
//! skipped on their own; the rest of the plan is still produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::history::{last_accessory_weight, AccessoryLogs, LogHistory};
use crate::program::{ExerciseItem, ProgramConfig, DEFAULT_ACCESSORY_REPS, DEFAULT_ACCESSORY_SETS};
use crate::progression::percentage::week_adjustment;
use crate::progression::{compute_training_maxes, LinearProgression};
use crate::rounding::{round_to, round_to_hundredths};

/// One set of a resolved structured item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSet {
    pub intensity: f64,
    pub target_reps: u32,
    pub is_amrap: bool,
    pub weight: f64,
    /// Reps logged for this set (AMRAP sets only)
    pub logged_reps: Option<u32>,
}

/// Fully resolved exercise item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanItem {
    Tm {
        name: String,
        lift: String,
        training_max: f64,
        top_single_at_8: f64,
    },
    Volume {
        name: String,
        lift: String,
        training_max: f64,
        intensity: f64,
        weight: f64,
        /// Weight came from a manual override for this session
        weight_overridden: bool,
        sets: u32,
        reps_per_set: u32,
        rep_out_target: u32,
        logged_reps: Option<u32>,
        /// Training-max adjustment the logged reps earn for next week
        next_week_adjustment: Option<f64>,
        note: Option<String>,
    },
    Accessory {
        name: String,
        sets: u32,
        reps: u32,
        last_weight: Option<f64>,
    },
    Structured {
        name: String,
        lift: String,
        training_max: f64,
        sets: Vec<PlanSet>,
    },
    Linear {
        name: String,
        lift: String,
        weight: f64,
        sets: u32,
        reps: u32,
        progression_set: Option<usize>,
        increment: f64,
        consecutive_failures: u32,
        deload_pending: bool,
    },
}

/// day -> items in configured order
pub type WeekPlan = BTreeMap<u32, Vec<PlanItem>>;

impl PlanItem {
    pub fn name(&self) -> &str {
        match self {
            PlanItem::Tm { name, .. }
            | PlanItem::Volume { name, .. }
            | PlanItem::Accessory { name, .. }
            | PlanItem::Structured { name, .. }
            | PlanItem::Linear { name, .. } => name.as_str(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanItem::Tm { .. } => "tm",
            PlanItem::Volume { .. } => "volume",
            PlanItem::Accessory { .. } => "accessory",
            PlanItem::Structured { .. } => "structured",
            PlanItem::Linear { .. } => "linear",
        }
    }

    /// One-line description for terminal output
    pub fn summary_line(&self) -> String {
        match self {
            PlanItem::Tm {
                name,
                training_max,
                top_single_at_8,
                ..
            } => format!("{name}: TM {training_max:.2} | top single @8 {top_single_at_8:.2}"),
            PlanItem::Volume {
                name,
                weight,
                sets,
                reps_per_set,
                rep_out_target,
                logged_reps,
                ..
            } => {
                let logged = logged_reps.map(|r| format!(" | logged {r}")).unwrap_or_default();
                format!(
                    "{name}: {sets}x{reps_per_set} @ {weight:.2} (last set {rep_out_target}+){logged}"
                )
            }
            PlanItem::Accessory {
                name,
                sets,
                reps,
                last_weight,
            } => {
                let last = last_weight.map(|w| format!(" | last {w:.2}")).unwrap_or_default();
                format!("{name}: {sets}x{reps}{last}")
            }
            PlanItem::Structured { name, sets, .. } => {
                let sets: Vec<String> = sets
                    .iter()
                    .map(|set| {
                        let plus = if set.is_amrap { "+" } else { "" };
                        format!("{:.2}x{}{}", set.weight, set.target_reps, plus)
                    })
                    .collect();
                format!("{name}: {}", sets.join(", "))
            }
            PlanItem::Linear {
                name,
                weight,
                sets,
                reps,
                consecutive_failures,
                deload_pending,
                ..
            } => {
                let warning = if *deload_pending { " | deload pending" } else { "" };
                format!("{name}: {sets}x{reps} @ {weight:.2} (failures {consecutive_failures}){warning}")
            }
        }
    }
}

/// Resolve the workout plan of `week`.
///
/// Fails with [`PlanError::InvalidWeek`] when `week` is not configured.
pub fn week_plan(
    config: &ProgramConfig,
    history: &LogHistory,
    week: u32,
    accessory_logs: &AccessoryLogs,
) -> Result<WeekPlan, PlanError> {
    config.validate_week(week)?;

    let training_maxes = compute_training_maxes(config, history, week)
        .remove(&week)
        .unwrap_or_default();
    let linear = LinearProgression::new(config, history);

    let mut plan = WeekPlan::new();
    for (day, items) in &config.days {
        if !config.is_day_visible(*day, week) {
            debug!(day, week, "day hidden this week");
            continue;
        }
        let resolved: Vec<PlanItem> = items
            .iter()
            .filter_map(|item| {
                resolve_item(config, history, accessory_logs, &linear, &training_maxes, item, week, *day)
            })
            .collect();
        plan.insert(*day, resolved);
    }

    Ok(plan)
}

#[allow(clippy::too_many_arguments)]
fn resolve_item(
    config: &ProgramConfig,
    history: &LogHistory,
    accessory_logs: &AccessoryLogs,
    linear: &LinearProgression<'_>,
    training_maxes: &BTreeMap<String, f64>,
    item: &ExerciseItem,
    week: u32,
    day: u32,
) -> Option<PlanItem> {
    let rounding = config.rounding;
    let lift = item.lift().map(str::to_string);
    let training_max = || {
        let lift = lift.as_deref()?;
        let max = training_maxes.get(lift).copied();
        if max.is_none() {
            warn!(item = item.name(), lift, week, "no training max, item skipped");
        }
        max
    };

    match item {
        ExerciseItem::Tm { name, .. } => {
            let max = training_max()?;
            let lift = lift?;
            Some(PlanItem::Tm {
                name: name.clone(),
                top_single_at_8: round_to(max * config.single_at_8(&lift), rounding),
                training_max: round_to_hundredths(max),
                lift,
            })
        }

        ExerciseItem::Volume { name, .. } => {
            let max = training_max()?;
            let lift = lift?;
            let Some(descriptor) = config.week_descriptor(&lift, week) else {
                warn!(item = %name, lift = %lift, week, "no week descriptor, item skipped");
                return None;
            };
            let entry = history.volume_entry(&lift, week, day);
            let override_weight = entry.and_then(|e| e.weight);
            let logged_reps = entry.and_then(|e| e.reps);
            Some(PlanItem::Volume {
                name: name.clone(),
                training_max: round_to_hundredths(max),
                intensity: descriptor.intensity,
                weight: override_weight.unwrap_or_else(|| round_to(max * descriptor.intensity, rounding)),
                weight_overridden: override_weight.is_some(),
                sets: descriptor.sets,
                reps_per_set: descriptor.reps_per_normal_set,
                rep_out_target: descriptor.rep_out_target,
                logged_reps,
                next_week_adjustment: logged_reps.map(|reps| week_adjustment(Some(reps), Some(descriptor))),
                note: entry.and_then(|e| e.note.clone()),
                lift,
            })
        }

        ExerciseItem::Accessory { name, sets, reps } => Some(PlanItem::Accessory {
            name: name.clone(),
            sets: sets.unwrap_or(DEFAULT_ACCESSORY_SETS),
            reps: reps.unwrap_or(DEFAULT_ACCESSORY_REPS),
            last_weight: last_accessory_weight(accessory_logs, name, week, day),
        }),

        ExerciseItem::Structured { name, .. } => {
            let set_list = item.sets_for_week(week);
            if set_list.is_empty() {
                debug!(item = %name, week, "no sets this week, item skipped");
                return None;
            }
            let max = training_max()?;
            let lift = lift?;
            let entry = history.structured_entry(&lift, week, day);
            let sets = set_list
                .iter()
                .enumerate()
                .map(|(index, set)| PlanSet {
                    intensity: set.intensity,
                    target_reps: set.target_reps,
                    is_amrap: set.is_amrap,
                    weight: round_to(max * set.intensity, rounding),
                    logged_reps: if set.is_amrap {
                        entry.and_then(|e| e.reps.get(&index).copied())
                    } else {
                        None
                    },
                })
                .collect();
            Some(PlanItem::Structured {
                name: name.clone(),
                training_max: round_to_hundredths(max),
                sets,
                lift,
            })
        }

        ExerciseItem::Linear {
            name,
            sets,
            reps,
            progression_set,
            ..
        } => {
            let lift = lift?;
            let Some(session) = linear.weight_for_session(&lift, week, day) else {
                warn!(item = %name, lift = %lift, "no initial max, linear item skipped");
                return None;
            };
            Some(PlanItem::Linear {
                name: name.clone(),
                weight: round_to(session.weight, rounding),
                sets: *sets,
                reps: *reps,
                progression_set: *progression_set,
                increment: linear.increment_for(&lift),
                consecutive_failures: session.consecutive_failures,
                deload_pending: linear.is_deload_pending(session.consecutive_failures),
                lift,
            })
        }
    }
}
