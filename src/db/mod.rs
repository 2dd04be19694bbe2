//! Database module - SQLite storage for the active program and its logs
//!
//! Every log table is keyed by (lift, week, day) and written with
//! INSERT OR REPLACE, so logging a session again edits it in place.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::history::{
    AccessoryLogEntry, AccessoryLogs, LinearLogEntry, LogEntry, LogHistory, StructuredLogEntry,
};
use crate::program::ProgramConfig;
use crate::progression::final_training_maxes;

/// Record of a finished cycle, kept across new cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub final_week: u32,
    /// Training max per lift at the final week
    pub training_maxes: BTreeMap<String, f64>,
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS program (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config TEXT NOT NULL,
                started_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS volume_logs (
                lift TEXT NOT NULL,
                week INTEGER NOT NULL,
                day INTEGER NOT NULL,
                reps INTEGER,
                note TEXT,
                weight REAL,
                PRIMARY KEY (lift, week, day)
            );
            CREATE TABLE IF NOT EXISTS structured_logs (
                lift TEXT NOT NULL,
                week INTEGER NOT NULL,
                day INTEGER NOT NULL,
                set_index INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                PRIMARY KEY (lift, week, day, set_index)
            );
            CREATE TABLE IF NOT EXISTS linear_logs (
                lift TEXT NOT NULL,
                week INTEGER NOT NULL,
                day INTEGER NOT NULL,
                success INTEGER NOT NULL,
                consecutive_failures INTEGER NOT NULL,
                deload INTEGER NOT NULL,
                weight REAL NOT NULL,
                PRIMARY KEY (lift, week, day)
            );
            CREATE TABLE IF NOT EXISTS accessory_logs (
                name TEXT NOT NULL,
                week INTEGER NOT NULL,
                day INTEGER NOT NULL,
                weight REAL,
                sets INTEGER,
                reps INTEGER,
                note TEXT,
                PRIMARY KEY (name, week, day)
            );
            CREATE TABLE IF NOT EXISTS cycle_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                final_week INTEGER NOT NULL,
                training_maxes TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Start a new cycle with `config`.
    ///
    /// A running cycle is archived to `cycle_summaries` first, with its
    /// final-week training maxes and the current weight of every linear lift.
    /// Its logs are then cleared.
    pub fn start_cycle(&self, config: &ProgramConfig) -> Result<()> {
        let now = Utc::now();
        let previous = self.active_cycle()?;
        let history = self.load_history()?;

        let tx = self.conn.unchecked_transaction()?;
        if let Some((previous, started_at)) = previous {
            let final_week = previous.final_week();
            let training_maxes = final_training_maxes(&previous, &history);
            tx.execute(
                "INSERT INTO cycle_summaries (started_at, ended_at, final_week, training_maxes) VALUES (?1, ?2, ?3, ?4)",
                params![
                    started_at.to_rfc3339(),
                    now.to_rfc3339(),
                    final_week,
                    serde_json::to_string(&training_maxes)?,
                ],
            )?;
            info!(final_week, lifts = training_maxes.len(), "previous cycle archived");
        }

        tx.execute_batch(
            "DELETE FROM volume_logs;
             DELETE FROM structured_logs;
             DELETE FROM linear_logs;
             DELETE FROM accessory_logs;",
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO program (id, config, started_at) VALUES (1, ?1, ?2)",
            params![serde_json::to_string(config)?, now.to_rfc3339()],
        )?;
        tx.commit()?;

        info!(weeks = config.weeks.len(), "cycle started");
        Ok(())
    }

    /// Active program with its start time
    pub fn active_cycle(&self) -> Result<Option<(ProgramConfig, DateTime<Utc>)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row("SELECT config, started_at FROM program WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((config, started_at)) = row else {
            return Ok(None);
        };
        let config = ProgramConfig::from_json(&config).context("stored program is not valid")?;
        Ok(Some((config, parse_timestamp(&started_at))))
    }

    pub fn load_program(&self) -> Result<Option<ProgramConfig>> {
        Ok(self.active_cycle()?.map(|(config, _)| config))
    }

    pub fn record_volume(&self, lift: &str, week: u32, day: u32, entry: &LogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO volume_logs (lift, week, day, reps, note, weight) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![lift, week, day, entry.reps, entry.note, entry.weight],
        )?;
        Ok(())
    }

    /// Record reps of one AMRAP set
    pub fn record_amrap(&self, lift: &str, week: u32, day: u32, set_index: usize, reps: u32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO structured_logs (lift, week, day, set_index, reps) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![lift, week, day, set_index as i64, reps],
        )?;
        Ok(())
    }

    pub fn record_linear(&self, lift: &str, week: u32, day: u32, entry: &LinearLogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO linear_logs (lift, week, day, success, consecutive_failures, deload, weight) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                lift,
                week,
                day,
                entry.success,
                entry.consecutive_failures,
                entry.deload,
                entry.weight,
            ],
        )?;
        Ok(())
    }

    pub fn record_accessory(&self, name: &str, week: u32, day: u32, entry: &AccessoryLogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO accessory_logs (name, week, day, weight, sets, reps, note) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![name, week, day, entry.weight, entry.sets, entry.reps, entry.note],
        )?;
        Ok(())
    }

    /// Full log history of the active cycle
    pub fn load_history(&self) -> Result<LogHistory> {
        let mut history = LogHistory::new();

        let mut stmt = self
            .conn
            .prepare("SELECT lift, week, day, reps, note, weight FROM volume_logs")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                LogEntry {
                    reps: row.get(3)?,
                    note: row.get(4)?,
                    weight: row.get(5)?,
                },
            ))
        })?;
        for row in rows {
            let (lift, week, day, entry) = row?;
            history.record_volume(&lift, week, day, entry);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT lift, week, day, set_index, reps FROM structured_logs")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;
        let mut structured: BTreeMap<(String, u32, u32), StructuredLogEntry> = BTreeMap::new();
        for row in rows {
            let (lift, week, day, set_index, reps) = row?;
            structured
                .entry((lift, week, day))
                .or_default()
                .reps
                .insert(set_index as usize, reps);
        }
        for ((lift, week, day), entry) in structured {
            history.record_structured(&lift, week, day, entry);
        }

        let mut stmt = self.conn.prepare(
            "SELECT lift, week, day, success, consecutive_failures, deload, weight FROM linear_logs",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                LinearLogEntry {
                    success: row.get(3)?,
                    consecutive_failures: row.get(4)?,
                    deload: row.get(5)?,
                    weight: row.get(6)?,
                },
            ))
        })?;
        for row in rows {
            let (lift, week, day, entry) = row?;
            history.record_linear(&lift, week, day, entry);
        }

        Ok(history)
    }

    pub fn load_accessory_logs(&self) -> Result<AccessoryLogs> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, week, day, weight, sets, reps, note FROM accessory_logs")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                AccessoryLogEntry {
                    weight: row.get(3)?,
                    sets: row.get(4)?,
                    reps: row.get(5)?,
                    note: row.get(6)?,
                },
            ))
        })?;

        let mut logs = AccessoryLogs::new();
        for row in rows {
            let (name, week, day, entry) = row?;
            logs.entry(name).or_default().entry(week).or_default().insert(day, entry);
        }
        Ok(logs)
    }

    /// Archived cycles, newest first
    pub fn cycle_summaries(&self) -> Result<Vec<CycleSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, final_week, training_maxes FROM cycle_summaries ORDER BY id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (id, started_at, ended_at, final_week, maxes) in rows {
            summaries.push(CycleSummary {
                id: Some(id),
                started_at: parse_timestamp(&started_at),
                ended_at: parse_timestamp(&ended_at),
                final_week,
                training_maxes: serde_json::from_str(&maxes)
                    .with_context(|| format!("cycle summary {id} has invalid training maxes"))?,
            });
        }
        Ok(summaries)
    }
}
