use chrono::Local;
use clap::{Parser, ValueEnum};
use repkit::config::{FileProfileStore, Profile, ProfileStore};
use repkit::history::HistoryDb;
use repkit::runtime::{ChannelSource, FrameEvent, Observation, SessionRunner, StepOutcome};
use repkit::session::{Session, SessionConfig, SessionSummary};
use repkit::signal::Dialect;
use repkit::trace;
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use time_humanize::HumanTime;

/// signal-driven exercise repetition counter
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Counts exercise repetitions from a recorded per-frame signal trace: \
joint angles from a pose model, or mean-brightness levels as a degraded fallback. \
Live capture and pose estimation are upstream concerns; this tool replays their output."
)]
pub struct Cli {
    /// CSV trace to replay (timestamp,value rows)
    #[clap(short = 'i', long)]
    input: Option<PathBuf>,

    /// replay an embedded demo trace instead of reading a file
    #[clap(long)]
    demo: bool,

    /// signal dialect of the trace
    #[clap(short = 'd', long, value_enum, default_value_t = DialectArg::Angle)]
    dialect: DialectArg,

    /// threshold profile to load, saved or built-in (pushup, brightness); overrides --dialect
    #[clap(short = 'p', long)]
    profile: Option<String>,

    /// low threshold override
    #[clap(long)]
    low: Option<f64>,

    /// high threshold override
    #[clap(long)]
    high: Option<f64>,

    /// cooldown override, in seconds
    #[clap(long)]
    cooldown: Option<f64>,

    /// rows are absolute brightness levels; difference them before counting
    #[clap(long)]
    levels: bool,

    /// print every counter update
    #[clap(short = 'v', long)]
    verbose: bool,

    /// frames in flight between the producer and the counter
    #[clap(long, default_value_t = 32)]
    queue: usize,

    /// show recent sessions and exit
    #[clap(long)]
    history: bool,

    /// do not record this session in history
    #[clap(long)]
    no_record: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DialectArg {
    Angle,
    BrightnessDelta,
}

impl DialectArg {
    fn as_dialect(&self) -> Dialect {
        match self {
            DialectArg::Angle => Dialect::Angle,
            DialectArg::BrightnessDelta => Dialect::BrightnessDelta,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.history {
        return show_history();
    }

    let profile = resolve_profile(&cli)?;
    let observations = load_observations(&cli, profile.dialect)?;

    let started_at = Local::now();
    let summary = run_session(&cli, &profile, observations);

    print_summary(&summary);

    if !cli.no_record {
        if let Err(err) = summary.append_log() {
            eprintln!("could not append session log: {err}");
        }
        match HistoryDb::new() {
            Ok(db) => {
                if let Err(err) = db.record(started_at, &summary) {
                    eprintln!("could not record session history: {err}");
                }
            }
            Err(err) => eprintln!("could not open session history: {err}"),
        }
    }

    Ok(())
}

fn resolve_profile(cli: &Cli) -> Result<Profile, Box<dyn Error>> {
    let mut profile = match &cli.profile {
        Some(name) => {
            let store = FileProfileStore::new();
            store
                .load(name)
                .or_else(|| Profile::builtin(name))
                .ok_or_else(|| format!("unknown profile `{name}`"))?
        }
        None => Profile::for_dialect(cli.dialect.as_dialect()),
    };

    if let Some(low) = cli.low {
        profile.counter.low_threshold = low;
    }
    if let Some(high) = cli.high {
        profile.counter.high_threshold = high;
    }
    if let Some(cooldown) = cli.cooldown {
        profile.counter.cooldown_secs = cooldown;
    }

    Ok(profile)
}

fn load_observations(cli: &Cli, dialect: Dialect) -> Result<Vec<Observation>, Box<dyn Error>> {
    let raw = if cli.demo {
        let name = match dialect {
            Dialect::Angle => trace::DEMO_PUSHUP_ANGLE,
            Dialect::BrightnessDelta => trace::DEMO_BRIGHTNESS_LEVELS,
        };
        trace::demo_trace(name)?
    } else if let Some(path) = &cli.input {
        trace::read_trace_file(path)?
    } else {
        return Err("nothing to replay: pass --input <trace.csv> or --demo".into());
    };

    // The brightness demo trace records absolute levels.
    let wants_levels = cli.levels || (cli.demo && dialect == Dialect::BrightnessDelta);
    if wants_levels {
        Ok(trace::differentiate(&raw))
    } else {
        Ok(raw)
    }
}

fn run_session(cli: &Cli, profile: &Profile, observations: Vec<Observation>) -> SessionSummary {
    let session = Session::new(SessionConfig {
        dialect: profile.dialect,
        counter: profile.counter,
    });

    let (tx, source) = ChannelSource::bounded(cli.queue.max(1));

    // Producer thread stands in for the frame pipeline; the bounded channel
    // keeps it from racing ahead of the counter.
    let producer = thread::spawn(move || {
        for obs in observations {
            if tx.send(FrameEvent::Observation(obs)).is_err() {
                return;
            }
        }
        let _ = tx.send(FrameEvent::Stop);
    });

    let verbose = cli.verbose;
    let summary = SessionRunner::new(source, session).run(|outcome| match outcome {
        StepOutcome::Updated(update) => {
            if update.counted {
                println!("rep {:>3}  phase {}", update.count, update.phase);
            } else if verbose {
                println!("         phase {}  count {}", update.phase, update.count);
            }
        }
        StepOutcome::Rejected(err) => eprintln!("skipping malformed observation: {err}"),
        StepOutcome::Skipped | StepOutcome::Idle | StepOutcome::Stopped => {}
    });

    let _ = producer.join();
    summary
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Total reps: {}", summary.reps);
    println!(
        "Duration: {:.1}s over {} frames ({} skipped)",
        summary.duration_secs, summary.frames_observed, summary.frames_skipped
    );
    if let (Some(mean), Some(sd)) = (summary.interval_mean, summary.interval_std_dev) {
        println!("Rep interval: {:.2}s (sd {:.2}s)", mean, sd);
    }
    if summary.reliability.is_degraded() {
        println!("Reliability: degraded (brightness fallback, counts are an estimate)");
    }
}

fn show_history() -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;
    let records = db.recent(10)?;

    if records.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    println!("Recent sessions:");
    for record in &records {
        let age_secs = (Local::now() - record.started_at).num_seconds();
        let marker = if record.degraded { " (degraded)" } else { "" };
        println!(
            "  {:>4} reps  {:>7.1}s  {:<16} {}{}",
            record.reps,
            record.duration_secs,
            record.dialect.to_string(),
            HumanTime::from(-age_secs),
            marker
        );
    }

    println!("Total reps recorded: {}", db.total_reps()?);
    if let Some(best) = db.best_session()? {
        println!(
            "Best session: {} reps {}",
            best.reps,
            HumanTime::from(-(Local::now() - best.started_at).num_seconds())
        );
    }

    Ok(())
}
