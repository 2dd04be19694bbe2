//! Progression module - training maxes from configuration and history
//!
//! Schemes:
//! - Percentage-based (rep-out adjustment table, weight overrides)
//! - AMRAP / structured (fixed steps from one AMRAP set)
//! - Linear (per-session replay with deloads)

pub mod linear;
pub mod percentage;
pub mod structured;

pub use linear::{LinearProgression, LinearSession};
pub use percentage::percentage_training_maxes;
pub use structured::{gather_structured_lift_info, structured_training_maxes, BodyRegion, StructuredLiftInfo};

use std::collections::BTreeMap;

use tracing::debug;

use crate::history::LogHistory;
use crate::program::{ExerciseItem, ProgramConfig};
use crate::rounding::round_to_hundredths;

/// week -> lift -> training max
pub type WeeklyMaxes = BTreeMap<u32, BTreeMap<String, f64>>;

/// Training maxes for weeks 1..=up_to_week.
///
/// Percentage-scheme maxes win over structured ones for the same lift; lifts
/// neither scheme produced for a week fall back to their initial max.
pub fn compute_training_maxes(config: &ProgramConfig, history: &LogHistory, up_to_week: u32) -> WeeklyMaxes {
    let percentage = percentage_training_maxes(config, history, up_to_week);
    let structured = structured_training_maxes(config, history, up_to_week);

    (1..=up_to_week)
        .map(|week| {
            let mut merged: BTreeMap<String, f64> = config
                .initial_maxes
                .iter()
                .map(|(lift, max)| (lift.clone(), round_to_hundredths(*max)))
                .collect();
            if let Some(maxes) = structured.get(&week) {
                merged.extend(maxes.iter().map(|(lift, max)| (lift.clone(), *max)));
            }
            if let Some(maxes) = percentage.get(&week) {
                merged.extend(maxes.iter().map(|(lift, max)| (lift.clone(), *max)));
            }
            debug!(week, lifts = merged.len(), "training maxes merged");
            (week, merged)
        })
        .collect()
}

/// Training maxes a finished cycle ends on: the final week's maxes, with
/// every linear lift that has logged sessions at the weight its next session
/// would use.
pub fn final_training_maxes(config: &ProgramConfig, history: &LogHistory) -> BTreeMap<String, f64> {
    let final_week = config.final_week();
    let mut maxes = compute_training_maxes(config, history, final_week)
        .remove(&final_week)
        .unwrap_or_default();

    let linear = LinearProgression::new(config, history);
    for item in config.days.values().flatten() {
        let ExerciseItem::Linear { .. } = item else { continue };
        let Some(lift) = item.lift() else { continue };
        if history.linear_sessions(lift).is_empty() {
            continue;
        }
        if let Some(session) = linear.weight_for_session(lift, u32::MAX, u32::MAX) {
            maxes.insert(lift.to_string(), round_to_hundredths(session.weight));
        }
    }
    maxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::LogEntry;

    fn program() -> ProgramConfig {
        ProgramConfig::from_json(
            r#"{
                "weeks": [1, 2, 3],
                "initial_maxes": {"Squat": 300.0, "Bench": 200.0, "Row": 150.0},
                "lifts": {
                    "Squat": {
                        "1": {"intensity": 0.75, "reps_per_normal_set": 5, "rep_out_target": 10, "sets": 5},
                        "2": {"intensity": 0.8, "reps_per_normal_set": 4, "rep_out_target": 8, "sets": 5}
                    }
                },
                "days": {
                    "1": [
                        {"type": "structured", "name": "Squat 1+", "lift": "Squat",
                         "sets": [{"intensity": 0.9, "target_reps": 1, "is_amrap": true}]},
                        {"type": "structured", "name": "Bench 1+", "lift": "Bench",
                         "sets": [{"intensity": 0.9, "target_reps": 1, "is_amrap": true}]}
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_merge_precedence_and_gap_fill() {
        let config = program();
        let mut history = LogHistory::new();
        history.record_volume(
            "Squat",
            1,
            1,
            LogEntry {
                reps: Some(15),
                ..Default::default()
            },
        );
        history.record_amrap("Squat", 1, 1, 0, 6);
        history.record_amrap("Bench", 1, 1, 0, 6);

        let maxes = compute_training_maxes(&config, &history, 3);
        assert_eq!(maxes.len(), 3);
        // Percentage (+3%) wins over structured (+10)
        assert_eq!(maxes[&2]["Squat"], 309.0);
        assert_eq!(maxes[&2]["Bench"], 210.0);
        // Never progressed: initial max
        assert_eq!(maxes[&3]["Row"], 150.0);
        // No percentage descriptor for week 3: structured value shows through
        assert_eq!(maxes[&3]["Squat"], 310.0);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let config = program();
        let mut history = LogHistory::new();
        history.record_amrap("Bench", 1, 1, 0, 3);
        let first = serde_json::to_string(&compute_training_maxes(&config, &history, 3)).unwrap();
        let second = serde_json::to_string(&compute_training_maxes(&config, &history, 3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_weeks() {
        assert!(compute_training_maxes(&program(), &LogHistory::new(), 0).is_empty());
    }

    #[test]
    fn test_final_maxes_use_replayed_linear_weight() {
        let mut config = program();
        config.days.entry(2).or_default().push(ExerciseItem::Linear {
            name: "Row".into(),
            lift: None,
            sets: 3,
            reps: 8,
            progression_set: None,
        });
        let mut history = LogHistory::new();
        let empty = final_training_maxes(&config, &history);
        assert_eq!(empty["Row"], 150.0);
        assert_eq!(empty["Squat"], 300.0);

        for week in 1..=3 {
            let entry = LinearProgression::new(&config, &history)
                .record_session("Row", week, 2, true)
                .unwrap();
            history.record_linear("Row", week, 2, entry);
        }
        let maxes = final_training_maxes(&config, &history);
        assert_eq!(maxes["Row"], 165.0);
        assert_eq!(maxes["Bench"], 200.0);
    }
}
