//! Percentage-based progression
//!
//! Each week's training max compounds the previous week's by the adjustment
//! table entry for the rep-out result. A manual weight override pins the
//! week's max to `override / intensity`, and later weeks compound from it.

use std::collections::BTreeMap;

use tracing::debug;

use super::WeeklyMaxes;
use crate::history::LogHistory;
use crate::program::{ProgramConfig, WeekDescriptor};
use crate::rounding::{adjustment_for_delta, round_to_hundredths};

/// Training max implied by a manual working weight
fn back_calculate(weight: f64, descriptor: Option<&WeekDescriptor>) -> Option<f64> {
    let intensity = descriptor?.intensity;
    (intensity > 0.0).then(|| weight / intensity)
}

/// Adjustment earned by a week's rep-out set. No log (or no descriptor to
/// compare against) counts as hitting the target.
pub fn week_adjustment(reps: Option<u32>, descriptor: Option<&WeekDescriptor>) -> f64 {
    match (reps, descriptor) {
        (Some(reps), Some(descriptor)) => {
            adjustment_for_delta(reps as i32 - descriptor.rep_out_target as i32)
        }
        _ => 0.0,
    }
}

/// Per-week training maxes of every percentage-scheme lift, weeks 1..=up_to_week.
///
/// Only lifts configured under `lifts` are produced. A lift without a
/// descriptor for a week is left out of that week's map, but its running max
/// still carries into the following weeks.
pub fn percentage_training_maxes(
    config: &ProgramConfig,
    history: &LogHistory,
    up_to_week: u32,
) -> WeeklyMaxes {
    let mut maxes = WeeklyMaxes::new();
    if up_to_week == 0 {
        return maxes;
    }

    let mut running: BTreeMap<String, f64> = BTreeMap::new();
    for (lift, weeks) in &config.lifts {
        let Some(&initial) = config.initial_maxes.get(lift) else {
            debug!(lift = %lift, "no initial max, lift skipped");
            continue;
        };
        let training_max = history
            .weight_override_in_week(lift, 1)
            .and_then(|weight| back_calculate(weight, weeks.get(&1)))
            .unwrap_or(initial);
        running.insert(lift.clone(), round_to_hundredths(training_max));
    }
    let first_week = running
        .iter()
        .filter(|(lift, _)| config.lifts.get(*lift).is_some_and(|weeks| weeks.contains_key(&1)))
        .map(|(lift, max)| (lift.clone(), *max))
        .collect();
    maxes.insert(1, first_week);

    for week in 2..=up_to_week {
        let mut current = BTreeMap::new();
        // BTreeMap iteration keeps lift updates in name order
        for (lift, weeks) in &config.lifts {
            let Some(previous) = running.get(lift).copied() else {
                continue;
            };
            let adjustment = week_adjustment(
                history.logged_reps_in_week(lift, week - 1),
                weeks.get(&(week - 1)),
            );
            let mut training_max = round_to_hundredths(previous * (1.0 + adjustment));

            if let Some(pinned) = history
                .weight_override_in_week(lift, week)
                .and_then(|weight| back_calculate(weight, weeks.get(&week)))
            {
                debug!(lift = %lift, week, pinned, "weight override pins training max");
                training_max = round_to_hundredths(pinned);
            }

            debug!(lift = %lift, week, previous, adjustment, training_max, "percentage progression");
            running.insert(lift.clone(), training_max);
            if weeks.contains_key(&week) {
                current.insert(lift.clone(), training_max);
            }
        }
        maxes.insert(week, current);
    }

    maxes
}
