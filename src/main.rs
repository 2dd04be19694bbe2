//! liftplan - Strength-training planner
//!
//! Keeps the active program and its logs in SQLite and prints training
//! maxes, week plans and CSV exports.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use liftplan::history::{AccessoryLogEntry, LogEntry};
use liftplan::percentiles::{CompetitionResult, Lift, PercentileTable, Sex};
use liftplan::progression::LinearProgression;
use liftplan::{Database, ProgramConfig, compute_training_maxes, export, week_plan};

#[derive(Parser)]
#[command(name = "liftplan")]
#[command(author, version, about = "Strength-training planner")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "LIFTPLAN_DB", default_value = "liftplan.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new cycle from a program file (archives the current one)
    Start {
        /// Program definition (JSON)
        program: PathBuf,
    },

    /// Show training maxes up to a week
    Maxes {
        #[arg(short, long)]
        week: u32,

        #[arg(long)]
        json: bool,
    },

    /// Show the workout plan of a week
    Plan {
        #[arg(short, long)]
        week: u32,

        #[arg(long)]
        json: bool,
    },

    /// Export week plans as CSV
    Export {
        #[arg(short, long, required_unless_present = "all")]
        week: Option<u32>,

        /// Export every week of the program
        #[arg(long)]
        all: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Log a percentage-scheme session
    LogVolume {
        lift: String,
        #[arg(short, long)]
        week: u32,
        #[arg(short, long)]
        day: u32,

        /// Reps achieved on the rep-out set
        #[arg(short, long)]
        reps: Option<u32>,

        /// Working weight actually used
        #[arg(long)]
        weight: Option<f64>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Log reps of an AMRAP set
    LogAmrap {
        lift: String,
        #[arg(short, long)]
        week: u32,
        #[arg(short, long)]
        day: u32,

        /// Index of the set within the item
        #[arg(short, long)]
        set: usize,

        #[arg(short, long)]
        reps: u32,
    },

    /// Log a linear-progression session
    LogLinear {
        lift: String,
        #[arg(short, long)]
        week: u32,
        #[arg(short, long)]
        day: u32,

        /// Not every prescribed rep was completed
        #[arg(long)]
        failed: bool,
    },

    /// Log an accessory session
    LogAccessory {
        name: String,
        #[arg(short, long)]
        week: u32,
        #[arg(short, long)]
        day: u32,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        sets: Option<u32>,
        #[arg(long)]
        reps: Option<u32>,
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List archived cycles
    Summaries,

    /// Build a percentile table from an OpenPowerlifting results CSV
    PercentileTable {
        results: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Rank a lift against a percentile table
    Percentile {
        #[arg(short, long)]
        table: PathBuf,

        #[arg(long)]
        sex: Sex,

        /// Bodyweight in kg
        #[arg(long)]
        bodyweight: f64,

        #[arg(long)]
        age: Option<f64>,

        #[arg(long)]
        lift: Lift,

        /// Lifted weight in kg
        value: f64,
    },
}

fn active_program(db: &Database) -> Result<ProgramConfig> {
    match db.load_program()? {
        Some(config) => Ok(config),
        None => bail!("no active program, run `liftplan start <program.json>` first"),
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { program } => {
            let json = fs::read_to_string(&program)
                .with_context(|| format!("reading {}", program.display()))?;
            let config = ProgramConfig::from_json(&json).context("invalid program definition")?;
            let db = Database::open(&cli.db)?;
            db.start_cycle(&config)?;
            println!("Cycle started: {} weeks, {} days", config.weeks.len(), config.days.len());
        }

        Commands::Maxes { week, json } => {
            let db = Database::open(&cli.db)?;
            let config = active_program(&db)?;
            config.validate_week(week)?;
            let maxes = compute_training_maxes(&config, &db.load_history()?, week);

            if json {
                println!("{}", serde_json::to_string_pretty(&maxes)?);
            } else {
                for (week, lifts) in &maxes {
                    println!("Week {week}");
                    println!("{:-<40}", "");
                    for (lift, max) in lifts {
                        println!("  {lift:24} {max:>10.2}");
                    }
                }
            }
        }

        Commands::Plan { week, json } => {
            let db = Database::open(&cli.db)?;
            let config = active_program(&db)?;
            let plan = week_plan(&config, &db.load_history()?, week, &db.load_accessory_logs()?)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("Week {week}");
                for (day, items) in &plan {
                    println!("{:-<60}", "");
                    println!("Day {day}");
                    for item in items {
                        println!("  {}", item.summary_line());
                    }
                }
            }
        }

        Commands::Export { week, all, out } => {
            let db = Database::open(&cli.db)?;
            let config = active_program(&db)?;
            let history = db.load_history()?;
            let accessory_logs = db.load_accessory_logs()?;

            let weeks = match (all, week) {
                (true, _) => config.weeks.clone(),
                (false, Some(week)) => vec![week],
                (false, None) => bail!("either --week or --all is required"),
            };
            let plans = weeks
                .into_iter()
                .map(|week| -> Result<_> { Ok((week, week_plan(&config, &history, week, &accessory_logs)?)) })
                .collect::<Result<Vec<_>>>()?;

            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    export::write_csv(&plans, file)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), weeks = plans.len(), "export written");
                    println!("Exported to {}", path.display());
                }
                None => export::write_csv(&plans, io::stdout().lock())?,
            }
        }

        Commands::LogVolume { lift, week, day, reps, weight, note } => {
            let db = Database::open(&cli.db)?;
            active_program(&db)?.validate_week(week)?;
            db.record_volume(&lift, week, day, &LogEntry { reps, note, weight })?;
            println!("Logged: {lift} week {week} day {day}");
        }

        Commands::LogAmrap { lift, week, day, set, reps } => {
            let db = Database::open(&cli.db)?;
            active_program(&db)?.validate_week(week)?;
            db.record_amrap(&lift, week, day, set, reps)?;
            println!("Logged: {lift} week {week} day {day} set {set} - {reps} reps");
        }

        Commands::LogLinear { lift, week, day, failed } => {
            let db = Database::open(&cli.db)?;
            let config = active_program(&db)?;
            config.validate_week(week)?;
            let history = db.load_history()?;

            let Some(entry) = LinearProgression::new(&config, &history).record_session(&lift, week, day, !failed)
            else {
                bail!("{lift} has no initial max in the active program");
            };
            db.record_linear(&lift, week, day, &entry)?;

            let outcome = if failed { "failed" } else { "completed" };
            println!("Logged: {lift} @ {:.2} {outcome}", entry.weight);
            if entry.deload {
                println!("Deload: weight drops next session");
            }
        }

        Commands::LogAccessory { name, week, day, weight, sets, reps, note } => {
            let db = Database::open(&cli.db)?;
            active_program(&db)?.validate_week(week)?;
            db.record_accessory(&name, week, day, &AccessoryLogEntry { weight, sets, reps, note })?;
            println!("Logged: {name} week {week} day {day}");
        }

        Commands::Summaries => {
            let db = Database::open(&cli.db)?;
            let summaries = db.cycle_summaries()?;
            if summaries.is_empty() {
                println!("No archived cycles");
            }
            for summary in summaries {
                println!(
                    "{} - {} | {} weeks",
                    summary.started_at.format("%Y-%m-%d"),
                    summary.ended_at.format("%Y-%m-%d"),
                    summary.final_week
                );
                for (lift, max) in &summary.training_maxes {
                    println!("  {lift:24} {max:>10.2}");
                }
            }
        }

        Commands::PercentileTable { results, out } => {
            let file = File::open(&results)
                .with_context(|| format!("opening {}", results.display()))?;
            let results = CompetitionResult::read_csv(file)
                .with_context(|| format!("reading {}", results.display()))?;
            let table = PercentileTable::build(&results);
            fs::write(&out, table.to_json()?).with_context(|| format!("writing {}", out.display()))?;
            println!(
                "Percentile table: {} lifters, {} male / {} female classes",
                table.metadata.lifter_count,
                table.male.len(),
                table.female.len()
            );
        }

        Commands::Percentile { table, sex, bodyweight, age, lift, value } => {
            let json = fs::read_to_string(&table)
                .with_context(|| format!("reading {}", table.display()))?;
            let table = PercentileTable::from_json(&json).context("invalid percentile table")?;
            match table.rank(sex, bodyweight, age, lift, value) {
                Some(percentile) => println!("{lift} {value:.1} kg: percentile {percentile:.1}"),
                None => println!("No {lift} data for this weight class"),
            }
        }
    }

    Ok(())
}
