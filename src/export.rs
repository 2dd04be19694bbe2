//! CSV export of resolved week plans
//!
//! One row per plan item. The header is the sorted set of every field any
//! item kind fills in; fields an item does not use stay blank.

use std::collections::BTreeMap;
use std::io;

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};

use crate::plan::{PlanItem, WeekPlan};

/// Every exported column, sorted
pub const FIELDS: [&str; 12] = [
    "Day",
    "Failures",
    "Increment",
    "LoggedReps",
    "Name",
    "Reps",
    "Sets",
    "TM",
    "TopSingleAt8",
    "Type",
    "Week",
    "Weight",
];

fn number(value: f64) -> String {
    format!("{value:.2}")
}

/// Named fields of one item
pub fn item_fields(week: u32, day: u32, item: &PlanItem) -> BTreeMap<&'static str, String> {
    let mut row = BTreeMap::new();
    row.insert("Week", week.to_string());
    row.insert("Day", day.to_string());
    row.insert("Name", item.name().to_string());
    row.insert("Type", item.kind().to_string());

    match item {
        PlanItem::Tm {
            training_max,
            top_single_at_8,
            ..
        } => {
            row.insert("TM", number(*training_max));
            row.insert("TopSingleAt8", number(*top_single_at_8));
        }
        PlanItem::Volume {
            training_max,
            weight,
            sets,
            reps_per_set,
            logged_reps,
            ..
        } => {
            row.insert("TM", number(*training_max));
            row.insert("Weight", number(*weight));
            row.insert("Sets", sets.to_string());
            row.insert("Reps", reps_per_set.to_string());
            if let Some(reps) = logged_reps {
                row.insert("LoggedReps", reps.to_string());
            }
        }
        PlanItem::Accessory {
            sets,
            reps,
            last_weight,
            ..
        } => {
            row.insert("Sets", sets.to_string());
            row.insert("Reps", reps.to_string());
            if let Some(weight) = last_weight {
                row.insert("Weight", number(*weight));
            }
        }
        PlanItem::Structured {
            training_max, sets, ..
        } => {
            row.insert("TM", number(*training_max));
            row.insert("Sets", sets.len().to_string());
            let reps: Vec<String> = sets
                .iter()
                .map(|set| format!("{}{}", set.target_reps, if set.is_amrap { "+" } else { "" }))
                .collect();
            row.insert("Reps", reps.join(","));
            let weights: Vec<String> = sets.iter().map(|set| number(set.weight)).collect();
            row.insert("Weight", weights.join(","));
            let logged: Vec<String> = sets
                .iter()
                .filter_map(|set| set.logged_reps)
                .map(|reps| reps.to_string())
                .collect();
            if !logged.is_empty() {
                row.insert("LoggedReps", logged.join(","));
            }
        }
        PlanItem::Linear {
            weight,
            sets,
            reps,
            increment,
            consecutive_failures,
            ..
        } => {
            row.insert("Weight", number(*weight));
            row.insert("Sets", sets.to_string());
            row.insert("Reps", reps.to_string());
            row.insert("Increment", number(*increment));
            row.insert("Failures", consecutive_failures.to_string());
        }
    }

    row
}

/// Write plans of one or more weeks as CSV: header plus one record per item.
/// Values holding a comma, quote or line break are quoted.
pub fn write_csv<W: io::Write>(plans: &[(u32, WeekPlan)], out: W) -> csv::Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(out);
    writer.write_record(FIELDS)?;

    for (week, plan) in plans {
        for (day, items) in plan {
            for item in items {
                let row = item_fields(*week, *day, item);
                writer.write_record(
                    FIELDS
                        .iter()
                        .map(|field| row.get(field).map(String::as_str).unwrap_or("")),
                )?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Render plans as CSV text
pub fn export_csv(plans: &[(u32, WeekPlan)]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(plans, &mut buf).context("writing CSV")?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}
