//! AMRAP / structured progression
//!
//! One AMRAP set per lift drives the training max. The set is chosen once
//! from the program: a 1+ set when there is one, otherwise the heaviest
//! AMRAP set, and across items sharing a lift the heaviest candidate wins.
//! Each week adds a fixed weight step chosen by how many reps that set got.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::WeeklyMaxes;
use crate::history::LogHistory;
use crate::program::{ExerciseItem, ProgramConfig, StructuredSet};
use crate::rounding::{round_to, round_to_hundredths};

/// Name fragments that mark a lift as lower body
pub const LOWER_BODY_KEYWORDS: &[&str] = &["squat", "deadlift", "leg", "lunge", "hip"];

/// Progression set chosen for a lift
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuredLiftInfo {
    /// Day of the item the set belongs to
    pub day: u32,
    pub set_index: usize,
    pub intensity: f64,
    pub target_reps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyRegion {
    Upper,
    Lower,
}

impl BodyRegion {
    pub fn classify(lift: &str) -> Self {
        let lowered = lift.to_lowercase();
        if LOWER_BODY_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            BodyRegion::Lower
        } else {
            BodyRegion::Upper
        }
    }
}

/// Progression candidate within one set list
fn progression_candidate(sets: &[StructuredSet]) -> Option<(usize, &StructuredSet)> {
    let amrap = move || sets.iter().enumerate().filter(|(_, set)| set.is_amrap);
    amrap()
        .find(|(_, set)| set.target_reps == 1)
        .or_else(|| {
            amrap().fold(None::<(usize, &StructuredSet)>, |best, candidate| match best {
                Some((_, heaviest)) if heaviest.intensity >= candidate.1.intensity => best,
                _ => Some(candidate),
            })
        })
}

/// Choose the progression set of every structured lift.
///
/// Set lists are resolved for week 1. When a lift appears in several items
/// the candidate with the highest intensity wins; ties keep the first one
/// in day order.
pub fn gather_structured_lift_info(config: &ProgramConfig) -> BTreeMap<String, StructuredLiftInfo> {
    let mut info: BTreeMap<String, StructuredLiftInfo> = BTreeMap::new();

    for (day, item) in config.structured_items() {
        let Some(lift) = item.lift() else { continue };
        let Some((set_index, set)) = progression_candidate(item.sets_for_week(1)) else {
            continue;
        };
        let candidate = StructuredLiftInfo {
            day,
            set_index,
            intensity: set.intensity,
            target_reps: set.target_reps,
        };
        let heavier = info
            .get(lift)
            .is_none_or(|existing| candidate.intensity > existing.intensity);
        if heavier {
            info.insert(lift.to_string(), candidate);
        }
    }

    info
}

/// Weight step earned by an AMRAP result, rounded to the plate increment
pub fn structured_adjustment(
    target_reps: u32,
    achieved: u32,
    region: BodyRegion,
    rounding: f64,
) -> f64 {
    let step = if target_reps == 1 {
        match achieved {
            0..=1 => 0.0,
            2..=4 => 5.0,
            _ => 10.0,
        }
    } else {
        let delta = achieved as i64 - target_reps as i64;
        match (region, delta) {
            (BodyRegion::Upper, ..=-1) => -5.0,
            (BodyRegion::Upper, 0) => 0.0,
            (BodyRegion::Upper, 1..=2) => 5.0,
            (BodyRegion::Upper, _) => 10.0,
            // Lower body stalls rather than regresses
            (BodyRegion::Lower, ..=-1) => 0.0,
            (BodyRegion::Lower, 0) => 5.0,
            (BodyRegion::Lower, 1..=2) => 10.0,
            (BodyRegion::Lower, _) => 15.0,
        }
    };
    round_to(step, rounding)
}

/// Reps logged on a lift's progression set in `week`.
///
/// Looks at the set's own day first. Failing that, other days of the week
/// that logged the lift are searched for an AMRAP set with the same target
/// reps; the first one with a logged result wins.
pub fn logged_amrap_reps(
    config: &ProgramConfig,
    history: &LogHistory,
    lift: &str,
    info: &StructuredLiftInfo,
    week: u32,
) -> Option<u32> {
    let days = history.structured.get(lift)?.get(&week)?;

    if let Some(reps) = days
        .get(&info.day)
        .and_then(|entry| entry.reps.get(&info.set_index))
    {
        return Some(*reps);
    }

    for (day, entry) in days {
        if *day == info.day {
            continue;
        }
        let Some(items) = config.days.get(day) else {
            continue;
        };
        let matching = items
            .iter()
            .filter(|item| matches!(item, ExerciseItem::Structured { .. }))
            .filter(|item| item.lift() == Some(lift))
            .filter_map(|item| {
                item.sets_for_week(week)
                    .iter()
                    .position(|set| set.is_amrap && set.target_reps == info.target_reps)
            });
        for index in matching {
            if let Some(reps) = entry.reps.get(&index) {
                debug!(lift, week, day, index, "progression set found on another day");
                return Some(*reps);
            }
        }
    }

    None
}

/// Per-week training maxes of every structured lift, weeks 1..=up_to_week
pub fn structured_training_maxes(
    config: &ProgramConfig,
    history: &LogHistory,
    up_to_week: u32,
) -> WeeklyMaxes {
    let mut maxes = WeeklyMaxes::new();
    if up_to_week == 0 {
        return maxes;
    }

    let info = gather_structured_lift_info(config);
    let mut current: BTreeMap<String, f64> = info
        .keys()
        .filter_map(|lift| {
            let initial = config.initial_maxes.get(lift)?;
            Some((lift.clone(), round_to_hundredths(*initial)))
        })
        .collect();
    maxes.insert(1, current.clone());

    for week in 2..=up_to_week {
        for (lift, training_max) in current.iter_mut() {
            let Some(lift_info) = info.get(lift) else { continue };
            let Some(achieved) = logged_amrap_reps(config, history, lift, lift_info, week - 1)
            else {
                continue;
            };
            let adjustment = structured_adjustment(
                lift_info.target_reps,
                achieved,
                BodyRegion::classify(lift),
                config.rounding,
            );
            debug!(lift = %lift, week, achieved, adjustment, "structured progression");
            *training_max = round_to_hundredths(*training_max + adjustment);
        }
        maxes.insert(week, current.clone());
    }

    maxes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(intensity: f64, target_reps: u32, is_amrap: bool) -> StructuredSet {
        StructuredSet {
            intensity,
            target_reps,
            is_amrap,
        }
    }

    fn structured(name: &str, lift: &str, sets: Vec<StructuredSet>) -> ExerciseItem {
        ExerciseItem::Structured {
            name: name.to_string(),
            lift: Some(lift.to_string()),
            sets,
            sets_by_week: BTreeMap::new(),
        }
    }

    fn program() -> ProgramConfig {
        let mut config = ProgramConfig::from_json(
            r#"{"weeks": [1, 2, 3, 4], "initial_maxes": {"Bench": 200.0, "Squat": 300.0}}"#,
        )
        .unwrap();
        config.days.insert(
            1,
            vec![
                structured(
                    "Bench 1+",
                    "Bench",
                    vec![set(0.75, 5, false), set(0.85, 3, false), set(0.95, 1, true), set(0.7, 8, true)],
                ),
                structured("Squat", "Squat", vec![set(0.7, 5, false), set(0.8, 5, true)]),
            ],
        );
        config.days.insert(
            3,
            vec![structured(
                "Close-grip Bench",
                "Bench",
                vec![set(0.6, 8, false), set(0.65, 8, true)],
            )],
        );
        config
    }

    #[test]
    fn test_body_region() {
        assert_eq!(BodyRegion::classify("Front Squat"), BodyRegion::Lower);
        assert_eq!(BodyRegion::classify("Sumo DEADLIFT"), BodyRegion::Lower);
        assert_eq!(BodyRegion::classify("Hip Thrust"), BodyRegion::Lower);
        assert_eq!(BodyRegion::classify("Bench"), BodyRegion::Upper);
        assert_eq!(BodyRegion::classify("OHP"), BodyRegion::Upper);
    }

    #[test]
    fn test_gather_prefers_one_plus_set() {
        let info = gather_structured_lift_info(&program());
        let bench = info["Bench"];
        assert_eq!(bench.day, 1);
        assert_eq!(bench.set_index, 2);
        assert_eq!(bench.target_reps, 1);
    }

    #[test]
    fn test_gather_falls_back_to_heaviest_amrap() {
        let sets = vec![set(0.65, 8, true), set(0.8, 5, true), set(0.75, 6, true)];
        assert_eq!(progression_candidate(&sets).map(|(i, _)| i), Some(1));
        assert!(progression_candidate(&[set(0.8, 5, false)]).is_none());
    }

    #[test]
    fn test_gather_keeps_heaviest_across_items() {
        let mut config = program();
        // Secondary variant listed first must not win
        config.days.insert(
            0,
            vec![structured("Bench Volume", "Bench", vec![set(0.65, 8, true)])],
        );
        let info = gather_structured_lift_info(&config);
        assert_eq!(info["Bench"].intensity, 0.95);
        assert_eq!(info["Squat"].set_index, 1);
    }

    #[test]
    fn test_one_plus_adjustments() {
        assert_eq!(structured_adjustment(1, 0, BodyRegion::Upper, 5.0), 0.0);
        assert_eq!(structured_adjustment(1, 1, BodyRegion::Lower, 5.0), 0.0);
        assert_eq!(structured_adjustment(1, 3, BodyRegion::Upper, 5.0), 5.0);
        assert_eq!(structured_adjustment(1, 6, BodyRegion::Upper, 5.0), 10.0);
    }

    #[test]
    fn test_upper_body_adjustments() {
        assert_eq!(structured_adjustment(5, 4, BodyRegion::Upper, 5.0), -5.0);
        assert_eq!(structured_adjustment(5, 5, BodyRegion::Upper, 5.0), 0.0);
        assert_eq!(structured_adjustment(5, 7, BodyRegion::Upper, 5.0), 5.0);
        assert_eq!(structured_adjustment(5, 8, BodyRegion::Upper, 5.0), 10.0);
    }

    #[test]
    fn test_lower_body_adjustments() {
        assert_eq!(structured_adjustment(5, 2, BodyRegion::Lower, 5.0), 0.0);
        assert_eq!(structured_adjustment(5, 5, BodyRegion::Lower, 5.0), 5.0);
        assert_eq!(structured_adjustment(5, 6, BodyRegion::Lower, 5.0), 10.0);
        assert_eq!(structured_adjustment(5, 9, BodyRegion::Lower, 5.0), 15.0);
    }

    #[test]
    fn test_adjustment_rounded_to_increment() {
        assert_eq!(structured_adjustment(1, 3, BodyRegion::Upper, 10.0), 10.0);
        assert_eq!(structured_adjustment(1, 3, BodyRegion::Upper, 2.5), 5.0);
    }

    #[test]
    fn test_weekly_compounding() {
        let config = program();
        let mut history = LogHistory::new();
        history.record_amrap("Bench", 1, 1, 2, 6); // +10
        history.record_amrap("Bench", 2, 1, 2, 3); // +5
        history.record_amrap("Squat", 1, 1, 1, 7); // +10
        let maxes = structured_training_maxes(&config, &history, 4);
        assert_eq!(maxes[&1]["Bench"], 200.0);
        assert_eq!(maxes[&2]["Bench"], 210.0);
        assert_eq!(maxes[&3]["Bench"], 215.0);
        // Week 3 not logged: unchanged
        assert_eq!(maxes[&4]["Bench"], 215.0);
        assert_eq!(maxes[&2]["Squat"], 310.0);
    }

    #[test]
    fn test_lower_body_never_decreases() {
        let config = program();
        let mut history = LogHistory::new();
        for (week, reps) in [(1, 0), (2, 3), (3, 5)] {
            history.record_amrap("Squat", week, 1, 1, reps);
        }
        let maxes = structured_training_maxes(&config, &history, 4);
        for week in 2..=4 {
            assert!(maxes[&week]["Squat"] >= maxes[&(week - 1)]["Squat"]);
        }
        assert_eq!(maxes[&4]["Squat"], 305.0);
    }

    #[test]
    fn test_fallback_search_on_other_day() {
        let mut config = program();
        config.days.insert(
            5,
            vec![structured(
                "Bench Heavy",
                "Bench",
                vec![set(0.8, 3, false), set(0.9, 1, true)],
            )],
        );
        let mut history = LogHistory::new();
        // Logged on day 5 where the 1+ set sits at index 1
        history.record_amrap("Bench", 1, 5, 1, 4);
        let info = gather_structured_lift_info(&config);
        assert_eq!(logged_amrap_reps(&config, &history, "Bench", &info["Bench"], 1), Some(4));
        let maxes = structured_training_maxes(&config, &history, 2);
        assert_eq!(maxes[&2]["Bench"], 205.0);
    }

    #[test]
    fn test_fallback_without_match_gives_no_adjustment() {
        let config = program();
        let mut history = LogHistory::new();
        // Day 3 has no 1-rep AMRAP set
        history.record_amrap("Bench", 1, 3, 1, 12);
        let maxes = structured_training_maxes(&config, &history, 2);
        assert_eq!(maxes[&2]["Bench"], 200.0);
    }
}
