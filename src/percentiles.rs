//! Strength percentiles from competition results
//!
//! Builds lookup tables by sex, IPF weight class and age bracket, and ranks a
//! lifter's best against them. Results are expected in kilograms.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MALE_WEIGHT_CLASSES: [u32; 8] = [59, 66, 74, 83, 93, 105, 120, 140];
pub const FEMALE_WEIGHT_CLASSES: [u32; 8] = [47, 52, 57, 63, 69, 76, 84, 100];

/// (min age, max age, bracket), both ends inclusive
pub const AGE_BRACKETS: [(u32, u32, &str); 6] = [
    (0, 23, "junior"),
    (24, 39, "open"),
    (40, 49, "masters_40"),
    (50, 59, "masters_50"),
    (60, 69, "masters_60"),
    (70, 999, "masters_70"),
];

pub const PERCENTILES: [u32; 12] = [5, 10, 20, 30, 40, 50, 60, 70, 80, 90, 95, 99];

/// Smallest sample a class gets all-ages percentiles for
pub const MIN_SAMPLE_ALL_AGES: usize = 50;
/// Smallest sample an age bracket gets percentiles for
pub const MIN_SAMPLE_AGE_BRACKET: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "male" => Ok(Sex::Male),
            "f" | "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lift {
    Squat,
    Bench,
    Deadlift,
}

impl Lift {
    pub const ALL: [Lift; 3] = [Lift::Squat, Lift::Bench, Lift::Deadlift];
}

impl fmt::Display for Lift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lift::Squat => "squat",
            Lift::Bench => "bench",
            Lift::Deadlift => "deadlift",
        };
        f.write_str(name)
    }
}

impl FromStr for Lift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "squat" => Ok(Lift::Squat),
            "bench" | "bench press" => Ok(Lift::Bench),
            "deadlift" => Ok(Lift::Deadlift),
            other => Err(format!("unknown lift: {other}")),
        }
    }
}

/// One lifter's entry at a meet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionResult {
    pub sex: Sex,
    pub bodyweight_kg: f64,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub squat_kg: Option<f64>,
    #[serde(default)]
    pub bench_kg: Option<f64>,
    #[serde(default)]
    pub deadlift_kg: Option<f64>,
}

impl CompetitionResult {
    /// Successful best of a lift; missing, failed (negative) and zero
    /// attempts yield `None`
    pub fn best(&self, lift: Lift) -> Option<f64> {
        let value = match lift {
            Lift::Squat => self.squat_kg,
            Lift::Bench => self.bench_kg,
            Lift::Deadlift => self.deadlift_kg,
        }?;
        (value > 0.0).then_some(value)
    }

    /// Read an OpenPowerlifting results CSV. Extra columns are ignored.
    /// Rows without a parseable bodyweight or with a sex other than M/F are
    /// skipped, as are unreadable rows; I/O errors are returned.
    pub fn read_csv<R: io::Read>(reader: R) -> csv::Result<Vec<CompetitionResult>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut results = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<OplRow>() {
            let row = match row {
                Ok(row) => row,
                Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err),
                Err(err) => {
                    debug!(%err, "unreadable results row");
                    skipped += 1;
                    continue;
                }
            };
            match row.into_result() {
                Some(result) => results.push(result),
                None => skipped += 1,
            }
        }

        debug!(read = results.len(), skipped, "competition results loaded");
        Ok(results)
    }
}

/// The OpenPowerlifting columns a table is built from
#[derive(Debug, Deserialize)]
struct OplRow {
    #[serde(rename = "Sex", default)]
    sex: String,
    #[serde(rename = "BodyweightKg", default)]
    bodyweight: String,
    #[serde(rename = "Age", default)]
    age: String,
    #[serde(rename = "Best3SquatKg", default)]
    squat: String,
    #[serde(rename = "Best3BenchKg", default)]
    bench: String,
    #[serde(rename = "Best3DeadliftKg", default)]
    deadlift: String,
}

impl OplRow {
    fn into_result(self) -> Option<CompetitionResult> {
        let sex = match self.sex.trim().to_lowercase().as_str() {
            "m" => Sex::Male,
            "f" => Sex::Female,
            _ => return None,
        };
        let bodyweight_kg = self.bodyweight.trim().parse().ok()?;
        Some(CompetitionResult {
            sex,
            bodyweight_kg,
            age: self.age.trim().parse().ok(),
            squat_kg: parse_lift(&self.squat),
            bench_kg: parse_lift(&self.bench),
            deadlift_kg: parse_lift(&self.deadlift),
        })
    }
}

/// Best successful attempt; blank, failed (`-` prefixed) and zero are `None`
fn parse_lift(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('-') {
        return None;
    }
    value.parse().ok().filter(|kg: &f64| *kg > 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftPercentiles {
    pub count: usize,
    /// percentile -> value
    pub percentiles: BTreeMap<u32, f64>,
}

impl LiftPercentiles {
    fn from_values(values: &mut [f64]) -> Self {
        values.sort_by(f64::total_cmp);
        let percentiles = PERCENTILES
            .iter()
            .map(|p| (*p, round_to_tenth(interpolate_percentile(values, *p))))
            .collect();
        Self {
            count: values.len(),
            percentiles,
        }
    }

    /// Percentile a value falls at, interpolated between table points.
    ///
    /// Below the lowest point the curve runs linearly from zero; at or above
    /// the highest point the highest percentile is returned.
    pub fn rank(&self, value: f64) -> f64 {
        let points: Vec<(f64, f64)> = self
            .percentiles
            .iter()
            .map(|(p, v)| (f64::from(*p), *v))
            .collect();
        let Some(&(first_p, first_v)) = points.first() else {
            return 0.0;
        };
        if value <= first_v {
            let fraction = if first_v > 0.0 { value.max(0.0) / first_v } else { 0.0 };
            return round_to_tenth(first_p * fraction);
        }
        for pair in points.windows(2) {
            let (lower_p, lower_v) = pair[0];
            let (upper_p, upper_v) = pair[1];
            if value < upper_v {
                let span = upper_v - lower_v;
                let fraction = if span > 0.0 { (value - lower_v) / span } else { 0.0 };
                return round_to_tenth(lower_p + (upper_p - lower_p) * fraction);
            }
        }
        points.last().map_or(0.0, |(p, _)| *p)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightClassPercentiles {
    pub all_ages: BTreeMap<Lift, LiftPercentiles>,
    /// age bracket -> lift -> percentiles
    #[serde(default)]
    pub by_age: BTreeMap<String, BTreeMap<Lift, LiftPercentiles>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub source: String,
    pub lifter_count: usize,
    pub units: String,
    pub percentiles: Vec<u32>,
}

/// Percentile tables of both sexes, keyed by weight class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileTable {
    pub metadata: TableMetadata,
    pub male: BTreeMap<String, WeightClassPercentiles>,
    pub female: BTreeMap<String, WeightClassPercentiles>,
}

/// Halves go to the even tenth
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// IPF weight class of a bodyweight: the first class at or above it, or
/// `"<heaviest>+"` past the last one
pub fn weight_class(sex: Sex, bodyweight: f64) -> String {
    let classes = match sex {
        Sex::Male => &MALE_WEIGHT_CLASSES,
        Sex::Female => &FEMALE_WEIGHT_CLASSES,
    };
    classes
        .iter()
        .find(|class| bodyweight <= f64::from(**class))
        .map(|class| class.to_string())
        .unwrap_or_else(|| format!("{}+", classes[classes.len() - 1]))
}

/// Age bracket of an age. Fractional ages between two brackets (23.5) fall
/// in neither.
pub fn age_bracket(age: f64) -> Option<&'static str> {
    AGE_BRACKETS
        .iter()
        .find(|(min, max, _)| f64::from(*min) <= age && age <= f64::from(*max))
        .map(|(_, _, bracket)| *bracket)
}

/// Value at `percentile` of ascending `sorted`, interpolating linearly
/// between the two nearest ranks
pub fn interpolate_percentile(sorted: &[f64], percentile: u32) -> f64 {
    let Some(last) = sorted.last() else {
        return 0.0;
    };
    let index = (sorted.len() - 1) as f64 * f64::from(percentile) / 100.0;
    let lower = index.floor() as usize;
    let upper = lower + 1;
    if upper >= sorted.len() {
        return *last;
    }
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

type Samples = BTreeMap<Lift, Vec<f64>>;

fn summarize(samples: Samples, minimum: usize) -> BTreeMap<Lift, LiftPercentiles> {
    samples
        .into_iter()
        .filter(|(_, values)| values.len() >= minimum)
        .map(|(lift, mut values)| (lift, LiftPercentiles::from_values(&mut values)))
        .collect()
}

impl PercentileTable {
    /// Build tables from raw results. Entries without a positive bodyweight
    /// or without any successful lift are ignored.
    pub fn build(results: &[CompetitionResult]) -> Self {
        let mut all_ages: BTreeMap<(Sex, String), Samples> = BTreeMap::new();
        let mut by_age: BTreeMap<(Sex, String), BTreeMap<&'static str, Samples>> = BTreeMap::new();
        let mut lifter_count = 0;

        for result in results {
            if result.bodyweight_kg.is_nan() || result.bodyweight_kg <= 0.0 {
                continue;
            }
            let class = weight_class(result.sex, result.bodyweight_kg);
            let bracket = result.age.and_then(age_bracket);
            let key = (result.sex, class);

            let mut counted = false;
            for lift in Lift::ALL {
                let Some(value) = result.best(lift) else { continue };
                all_ages.entry(key.clone()).or_default().entry(lift).or_default().push(value);
                if let Some(bracket) = bracket {
                    by_age
                        .entry(key.clone())
                        .or_default()
                        .entry(bracket)
                        .or_default()
                        .entry(lift)
                        .or_default()
                        .push(value);
                }
                counted = true;
            }
            if counted {
                lifter_count += 1;
            }
        }

        let mut table = PercentileTable {
            metadata: TableMetadata {
                source: "OpenPowerlifting".to_string(),
                lifter_count,
                units: "kg".to_string(),
                percentiles: PERCENTILES.to_vec(),
            },
            male: BTreeMap::new(),
            female: BTreeMap::new(),
        };

        for ((sex, class), samples) in all_ages {
            let all_ages = summarize(samples, MIN_SAMPLE_ALL_AGES);
            if all_ages.is_empty() {
                debug!(?sex, class = %class, "sample too small, class skipped");
                continue;
            }
            let by_age = by_age
                .remove(&(sex, class.clone()))
                .unwrap_or_default()
                .into_iter()
                .map(|(bracket, samples)| (bracket.to_string(), summarize(samples, MIN_SAMPLE_AGE_BRACKET)))
                .filter(|(_, lifts)| !lifts.is_empty())
                .collect();
            let classes = match sex {
                Sex::Male => &mut table.male,
                Sex::Female => &mut table.female,
            };
            classes.insert(class, WeightClassPercentiles { all_ages, by_age });
        }

        info!(
            lifters = lifter_count,
            male_classes = table.male.len(),
            female_classes = table.female.len(),
            "percentile table built"
        );
        table
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Percentiles matching a lifter: their age bracket when it has data for
    /// the lift, else all ages of the weight class
    pub fn lookup(&self, sex: Sex, bodyweight: f64, age: Option<f64>, lift: Lift) -> Option<&LiftPercentiles> {
        let classes = match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        };
        let class = classes.get(&weight_class(sex, bodyweight))?;
        age.and_then(age_bracket)
            .and_then(|bracket| class.by_age.get(bracket))
            .and_then(|lifts| lifts.get(&lift))
            .or_else(|| class.all_ages.get(&lift))
    }

    /// Percentile of `value` among comparable lifters, `None` when the table
    /// has no data for them
    pub fn rank(&self, sex: Sex, bodyweight: f64, age: Option<f64>, lift: Lift, value: f64) -> Option<f64> {
        self.lookup(sex, bodyweight, age, lift).map(|p| p.rank(value))
    }
}
