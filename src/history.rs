//! Log history - performance recorded per lift, week and day
//!
//! Entries are keyed lift -> week -> day. Recording an entry for a session
//! that already has one overwrites it; every computation downstream is a
//! pure replay of this history, so edits cascade on the next call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// lift (or accessory name) -> week -> day -> entry
pub type SessionLog<T> = BTreeMap<String, BTreeMap<u32, BTreeMap<u32, T>>>;

/// Percentage-scheme session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Reps achieved on the final (rep-out) set
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
    /// Manual working weight for this session
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Structured-scheme session: set index -> reps achieved. Only AMRAP sets
/// are ever recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredLogEntry {
    #[serde(default)]
    pub reps: BTreeMap<usize, u32>,
}

/// Linear-scheme session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearLogEntry {
    /// All prescribed sets and reps completed
    pub success: bool,
    /// Consecutive failures after this session
    pub consecutive_failures: u32,
    /// This session's failure triggered a deload
    pub deload: bool,
    /// Weight used in the session
    pub weight: f64,
}

/// Accessory session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessoryLogEntry {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Accessory logs keyed by exercise name
pub type AccessoryLogs = SessionLog<AccessoryLogEntry>;

/// Full log history of a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogHistory {
    #[serde(default)]
    pub volume: SessionLog<LogEntry>,
    #[serde(default)]
    pub structured: SessionLog<StructuredLogEntry>,
    #[serde(default)]
    pub linear: SessionLog<LinearLogEntry>,
}

fn insert<T>(log: &mut SessionLog<T>, lift: &str, week: u32, day: u32, entry: T) {
    log.entry(lift.to_string())
        .or_default()
        .entry(week)
        .or_default()
        .insert(day, entry);
}

fn lookup<'a, T>(log: &'a SessionLog<T>, lift: &str, week: u32, day: u32) -> Option<&'a T> {
    log.get(lift)?.get(&week)?.get(&day)
}

/// Entries of one lift in one week, in day order
fn week_entries<'a, T>(
    log: &'a SessionLog<T>,
    lift: &str,
    week: u32,
) -> impl Iterator<Item = &'a T> + 'a {
    log.get(lift)
        .and_then(|weeks| weeks.get(&week))
        .into_iter()
        .flat_map(|days| days.values())
}

impl LogHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn record_volume(&mut self, lift: &str, week: u32, day: u32, entry: LogEntry) {
        insert(&mut self.volume, lift, week, day, entry);
    }

    /// Record one AMRAP set, keeping other sets of the same session
    pub fn record_amrap(&mut self, lift: &str, week: u32, day: u32, set_index: usize, reps: u32) {
        self.structured
            .entry(lift.to_string())
            .or_default()
            .entry(week)
            .or_default()
            .entry(day)
            .or_default()
            .reps
            .insert(set_index, reps);
    }

    pub fn record_structured(
        &mut self,
        lift: &str,
        week: u32,
        day: u32,
        entry: StructuredLogEntry,
    ) {
        insert(&mut self.structured, lift, week, day, entry);
    }

    pub fn record_linear(&mut self, lift: &str, week: u32, day: u32, entry: LinearLogEntry) {
        insert(&mut self.linear, lift, week, day, entry);
    }

    pub fn volume_entry(&self, lift: &str, week: u32, day: u32) -> Option<&LogEntry> {
        lookup(&self.volume, lift, week, day)
    }

    pub fn structured_entry(&self, lift: &str, week: u32, day: u32) -> Option<&StructuredLogEntry> {
        lookup(&self.structured, lift, week, day)
    }

    /// Rep-out result of a lift's week (first day that logged reps)
    pub fn logged_reps_in_week(&self, lift: &str, week: u32) -> Option<u32> {
        week_entries(&self.volume, lift, week).find_map(|entry| entry.reps)
    }

    /// Manual weight override of a lift's week (first day that set one)
    pub fn weight_override_in_week(&self, lift: &str, week: u32) -> Option<f64> {
        week_entries(&self.volume, lift, week).find_map(|entry| entry.weight)
    }

    /// Every linear session of a lift as (week, day, entry), in log order
    pub fn linear_sessions(&self, lift: &str) -> Vec<(u32, u32, &LinearLogEntry)> {
        self.linear
            .get(lift)
            .into_iter()
            .flat_map(|weeks| {
                weeks.iter().flat_map(|(week, days)| {
                    days.iter().map(move |(day, entry)| (*week, *day, entry))
                })
            })
            .collect()
    }
}

/// Most recent accessory weight at or before (week, day)
pub fn last_accessory_weight(logs: &AccessoryLogs, name: &str, week: u32, day: u32) -> Option<f64> {
    logs.get(name)?
        .iter()
        .flat_map(|(w, days)| days.iter().map(move |(d, entry)| ((*w, *d), entry)))
        .filter(|(session, _)| *session <= (week, day))
        .filter_map(|(_, entry)| entry.weight)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(reps: Option<u32>, weight: Option<f64>) -> LogEntry {
        LogEntry {
            reps,
            note: None,
            weight,
        }
    }

    #[test]
    fn test_record_overwrites_session() {
        let mut history = LogHistory::new();
        history.record_volume("Squat", 1, 1, volume(Some(8), None));
        history.record_volume("Squat", 1, 1, volume(Some(12), None));
        assert_eq!(history.volume_entry("Squat", 1, 1).unwrap().reps, Some(12));
        assert_eq!(history.volume["Squat"][&1].len(), 1);
    }

    #[test]
    fn test_week_lookups_take_first_day_with_value() {
        let mut history = LogHistory::new();
        history.record_volume("Bench", 2, 1, volume(None, None));
        history.record_volume("Bench", 2, 3, volume(Some(9), Some(185.0)));
        history.record_volume("Bench", 2, 5, volume(Some(4), Some(175.0)));
        assert_eq!(history.logged_reps_in_week("Bench", 2), Some(9));
        assert_eq!(history.weight_override_in_week("Bench", 2), Some(185.0));
        assert_eq!(history.logged_reps_in_week("Bench", 3), None);
        assert_eq!(history.logged_reps_in_week("Squat", 2), None);
    }

    #[test]
    fn test_record_amrap_merges_sets() {
        let mut history = LogHistory::new();
        history.record_amrap("Bench", 1, 2, 3, 6);
        history.record_amrap("Bench", 1, 2, 8, 11);
        let entry = history.structured_entry("Bench", 1, 2).unwrap();
        assert_eq!(entry.reps.get(&3), Some(&6));
        assert_eq!(entry.reps.get(&8), Some(&11));
    }

    #[test]
    fn test_linear_sessions_flattened() {
        let mut history = LogHistory::new();
        let entry = LinearLogEntry {
            success: true,
            consecutive_failures: 0,
            deload: false,
            weight: 135.0,
        };
        history.record_linear("Squat", 2, 1, entry);
        history.record_linear("Squat", 1, 3, entry);
        let sessions = history.linear_sessions("Squat");
        assert_eq!(sessions.len(), 2);
        assert_eq!((sessions[0].0, sessions[0].1), (1, 3));
        assert!(history.linear_sessions("Bench").is_empty());
    }

    #[test]
    fn test_history_json_uses_string_keys() {
        let mut history = LogHistory::new();
        history.record_volume("Squat", 1, 2, volume(Some(10), None));
        history.record_amrap("Bench", 1, 1, 0, 5);
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains(r#""Squat":{"1":{"2":"#));
        assert_eq!(LogHistory::from_json(&json).unwrap(), history);
    }

    #[test]
    fn test_last_accessory_weight() {
        let mut logs = AccessoryLogs::new();
        let entry = |weight| AccessoryLogEntry {
            weight,
            ..Default::default()
        };
        logs.entry("Curls".into()).or_default().entry(1).or_default().insert(2, entry(Some(25.0)));
        logs.entry("Curls".into()).or_default().entry(2).or_default().insert(2, entry(Some(30.0)));
        logs.entry("Curls".into()).or_default().entry(2).or_default().insert(4, entry(None));
        logs.entry("Curls".into()).or_default().entry(3).or_default().insert(2, entry(Some(35.0)));

        assert_eq!(last_accessory_weight(&logs, "Curls", 2, 4), Some(30.0));
        assert_eq!(last_accessory_weight(&logs, "Curls", 1, 1), None);
        assert_eq!(last_accessory_weight(&logs, "Curls", 5, 1), Some(35.0));
        assert_eq!(last_accessory_weight(&logs, "Rows", 5, 1), None);
    }
}
