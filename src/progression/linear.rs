//! Linear progression
//!
//! Working weight is computed per session by replaying every earlier
//! pass/fail outcome of the lift in (week, day) order: a pass adds the
//! increment, and a run of failures triggers a deload.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::{LinearLogEntry, LogHistory};
use crate::program::{LinearProgressionConfig, ProgramConfig};
use crate::rounding::round_to;

/// Working weight of a session and the failure streak leading into it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearSession {
    pub weight: f64,
    pub consecutive_failures: u32,
}

/// Replay rules for one lift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayRules {
    pub increment: f64,
    pub failures_before_deload: u32,
    pub deload_percentage: f64,
    pub rounding: f64,
}

impl ReplayRules {
    /// Apply one session outcome, returning the state after it and whether a
    /// deload fired
    pub fn apply(&self, state: LinearSession, success: bool) -> (LinearSession, bool) {
        if success {
            let next = LinearSession {
                weight: round_to(state.weight + self.increment, self.rounding),
                consecutive_failures: 0,
            };
            return (next, false);
        }

        let failures = state.consecutive_failures + 1;
        if failures >= self.failures_before_deload.max(1) {
            let next = LinearSession {
                weight: round_to(state.weight * (1.0 - self.deload_percentage), self.rounding),
                consecutive_failures: 0,
            };
            (next, true)
        } else {
            let next = LinearSession {
                weight: state.weight,
                consecutive_failures: failures,
            };
            (next, false)
        }
    }
}

/// Replay outcomes keyed by (week, day). Input order does not matter.
pub fn replay(initial: f64, mut outcomes: Vec<((u32, u32), bool)>, rules: &ReplayRules) -> LinearSession {
    outcomes.sort_by_key(|(session, _)| *session);
    outcomes.into_iter().fold(
        LinearSession {
            weight: initial,
            consecutive_failures: 0,
        },
        |state, (_, success)| rules.apply(state, success).0,
    )
}

/// Linear progression over one program and its history
pub struct LinearProgression<'a> {
    config: &'a ProgramConfig,
    history: &'a LogHistory,
    settings: LinearProgressionConfig,
}

impl<'a> LinearProgression<'a> {
    pub fn new(config: &'a ProgramConfig, history: &'a LogHistory) -> Self {
        Self {
            config,
            history,
            settings: config.linear_config(),
        }
    }

    pub fn increment_for(&self, lift: &str) -> f64 {
        self.settings.increment_for(lift)
    }

    fn rules(&self, lift: &str) -> ReplayRules {
        ReplayRules {
            increment: self.increment_for(lift),
            failures_before_deload: self.settings.failures_before_deload,
            deload_percentage: self.settings.deload_percentage,
            rounding: self.config.rounding,
        }
    }

    /// Working weight for (lift, week, day) from every session logged before
    /// it. `None` when the lift has no starting max.
    pub fn weight_for_session(&self, lift: &str, week: u32, day: u32) -> Option<LinearSession> {
        let initial = *self.config.initial_maxes.get(lift)?;
        let earlier: Vec<_> = self
            .history
            .linear_sessions(lift)
            .into_iter()
            .filter(|(w, d, _)| (*w, *d) < (week, day))
            .map(|(w, d, entry)| ((w, d), entry.success))
            .collect();
        let session = replay(initial, earlier, &self.rules(lift));
        debug!(lift, week, day, weight = session.weight, failures = session.consecutive_failures, "linear session");
        Some(session)
    }

    /// One more failure would trigger a deload
    pub fn is_deload_pending(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.settings.failures_before_deload.saturating_sub(1)
    }

    /// Log record for a newly completed session at (lift, week, day)
    pub fn record_session(&self, lift: &str, week: u32, day: u32, success: bool) -> Option<LinearLogEntry> {
        let before = self.weight_for_session(lift, week, day)?;
        let (after, deload) = self.rules(lift).apply(before, success);
        Some(LinearLogEntry {
            success,
            consecutive_failures: after.consecutive_failures,
            deload,
            weight: before.weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> ProgramConfig {
        ProgramConfig::from_json(
            r#"{
                "weeks": [1, 2, 3, 4],
                "initial_maxes": {"Squat": 135.0, "Deadlift": 185.0},
                "linear_progression_config": {
                    "increment": 5.0,
                    "increments": {"Deadlift": 10.0},
                    "failures_before_deload": 3,
                    "deload_percentage": 0.10
                }
            }"#,
        )
        .unwrap()
    }

    fn log(history: &mut LogHistory, lift: &str, week: u32, day: u32, success: bool) {
        history.record_linear(
            lift,
            week,
            day,
            LinearLogEntry {
                success,
                consecutive_failures: 0,
                deload: false,
                weight: 0.0,
            },
        );
    }

    #[test]
    fn test_first_session_uses_initial_max() {
        let config = program();
        let history = LogHistory::new();
        let linear = LinearProgression::new(&config, &history);
        let session = linear.weight_for_session("Squat", 1, 1).unwrap();
        assert_eq!(session.weight, 135.0);
        assert_eq!(session.consecutive_failures, 0);
        assert!(linear.weight_for_session("Bench", 1, 1).is_none());
    }

    #[test]
    fn test_success_adds_increment() {
        let config = program();
        let mut history = LogHistory::new();
        log(&mut history, "Squat", 1, 1, true);
        log(&mut history, "Squat", 1, 3, true);
        log(&mut history, "Deadlift", 1, 2, true);
        let linear = LinearProgression::new(&config, &history);
        assert_eq!(linear.weight_for_session("Squat", 1, 3).unwrap().weight, 140.0);
        assert_eq!(linear.weight_for_session("Squat", 2, 1).unwrap().weight, 145.0);
        assert_eq!(linear.weight_for_session("Deadlift", 2, 2).unwrap().weight, 195.0);
    }

    #[test]
    fn test_three_failures_deload() {
        let config = program();
        let mut history = LogHistory::new();
        log(&mut history, "Squat", 1, 1, false);
        log(&mut history, "Squat", 1, 3, false);
        log(&mut history, "Squat", 1, 5, false);
        let linear = LinearProgression::new(&config, &history);

        let before_third = linear.weight_for_session("Squat", 1, 5).unwrap();
        assert_eq!(before_third.weight, 135.0);
        assert_eq!(before_third.consecutive_failures, 2);
        assert!(linear.is_deload_pending(before_third.consecutive_failures));

        let after = linear.weight_for_session("Squat", 2, 1).unwrap();
        assert_eq!(after.weight, 120.0);
        assert_eq!(after.consecutive_failures, 0);
        assert!(!linear.is_deload_pending(after.consecutive_failures));
    }

    #[test]
    fn test_success_resets_failures() {
        let config = program();
        let mut history = LogHistory::new();
        log(&mut history, "Squat", 1, 1, false);
        log(&mut history, "Squat", 1, 3, false);
        log(&mut history, "Squat", 2, 1, true);
        log(&mut history, "Squat", 2, 3, false);
        let linear = LinearProgression::new(&config, &history);
        let session = linear.weight_for_session("Squat", 3, 1).unwrap();
        assert_eq!(session.weight, 140.0);
        assert_eq!(session.consecutive_failures, 1);
    }

    #[test]
    fn test_replay_ignores_input_order() {
        let rules = ReplayRules {
            increment: 5.0,
            failures_before_deload: 2,
            deload_percentage: 0.1,
            rounding: 5.0,
        };
        let ordered = vec![((1, 1), true), ((1, 3), false), ((2, 1), false), ((2, 3), true)];
        let mut shuffled = ordered.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);
        assert_eq!(replay(100.0, ordered, &rules), replay(100.0, shuffled, &rules));
    }

    #[test]
    fn test_later_sessions_do_not_affect_earlier() {
        let config = program();
        let mut history = LogHistory::new();
        log(&mut history, "Squat", 1, 1, true);
        let linear = LinearProgression::new(&config, &history);
        let before = linear.weight_for_session("Squat", 2, 1).unwrap();

        log(&mut history, "Squat", 3, 1, false);
        let linear = LinearProgression::new(&config, &history);
        assert_eq!(linear.weight_for_session("Squat", 2, 1).unwrap(), before);
    }

    #[test]
    fn test_record_session() {
        let config = program();
        let mut history = LogHistory::new();
        log(&mut history, "Squat", 1, 1, false);
        log(&mut history, "Squat", 1, 3, false);
        let linear = LinearProgression::new(&config, &history);

        let entry = linear.record_session("Squat", 1, 5, false).unwrap();
        assert!(entry.deload);
        assert_eq!(entry.consecutive_failures, 0);
        assert_eq!(entry.weight, 135.0);

        let entry = linear.record_session("Squat", 1, 5, true).unwrap();
        assert!(!entry.deload);
        assert_eq!(entry.weight, 135.0);
    }

    #[test]
    fn test_deload_pending_threshold() {
        let mut config = program();
        let history = LogHistory::new();
        let linear = LinearProgression::new(&config, &history);
        assert!(!linear.is_deload_pending(1));
        assert!(linear.is_deload_pending(2));

        config.linear_progression_config = None;
        config.initial_maxes.insert("Bench".into(), 100.0);
        let linear = LinearProgression::new(&config, &history);
        assert_eq!(linear.increment_for("Bench"), 5.0);
    }
}
