//! Host entry point wiring real collaborators around `bumpsnap_core`.
//!
//! # Responsibility
//! - Resolve the data directory and start file logging.
//! - Open the SQLite and file backing stores (SQLite first).
//! - Print the home summary or run the reminder loop.
//!
//! # Invariants
//! - Never panics on bad input or unavailable storage; failures map to exit codes.

use bumpsnap_core::db::open_db;
use bumpsnap_core::reminder::REMINDER_TONE;
use bumpsnap_core::{
    core_version, default_log_level, init_logging, ping, Clock, FileStore, NotificationSink,
    ReminderScheduler, SqliteKvStore, StateStore, SystemClock, ThreadTickSource,
    TrackerConfig, TrackerService,
};
use log::{error, info, warn};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const ENV_DATA_DIR: &str = "BUMPSNAP_DATA_DIR";
const ENV_LOG_LEVEL: &str = "BUMPSNAP_LOG_LEVEL";
const DB_FILE_NAME: &str = "bumpsnap.sqlite3";
const USAGE: &str = "usage: bumpsnap [ping | status | watch [max_polls]]";

enum Command {
    Ping,
    Status,
    Watch { max_polls: Option<u64> },
}

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = parse_command(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    if let Command::Ping = command {
        println!("bumpsnap_core ping={}", ping());
        println!("bumpsnap_core version={}", core_version());
        return ExitCode::SUCCESS;
    }

    let data_dir = data_dir();
    start_logging(&data_dir);

    let conn = match open_db(data_dir.join(DB_FILE_NAME)) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("bumpsnap: {err}");
            return ExitCode::FAILURE;
        }
    };
    let config = TrackerConfig::from_env();
    let store = StateStore::new(config.state_key.clone())
        .with_backend(SqliteKvStore::new(&conn))
        .with_backend(FileStore::new(data_dir.join("state")));
    let mut tracker = TrackerService::open(store, config, SystemClock);

    match command {
        Command::Status => print_status(&tracker),
        Command::Watch { max_polls } => return watch(&mut tracker, max_polls),
        Command::Ping => {}
    }
    ExitCode::SUCCESS
}

fn parse_command(args: &[String]) -> Option<Command> {
    match args {
        [] => Some(Command::Ping),
        [command] if command == "ping" => Some(Command::Ping),
        [command] if command == "status" => Some(Command::Status),
        [command] if command == "watch" => Some(Command::Watch { max_polls: None }),
        [command, polls] if command == "watch" => polls
            .parse::<u64>()
            .ok()
            .map(|max_polls| Command::Watch {
                max_polls: Some(max_polls),
            }),
        _ => None,
    }
}

fn data_dir() -> PathBuf {
    env::var_os(ENV_DATA_DIR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("bumpsnap"))
}

fn start_logging(data_dir: &std::path::Path) {
    let level = env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| default_log_level().to_string());
    let log_dir = data_dir.join("logs");
    if let Err(err) = init_logging(&level, &log_dir.to_string_lossy()) {
        eprintln!("logging disabled: {err}");
    }
}

fn print_status<C: Clock>(tracker: &TrackerService<'_, C>) {
    let summary = tracker.home_summary();
    println!("{}", summary.headline);
    println!("{}", summary.subtitle);
    println!("{}", summary.detail);

    if tracker.state().baby_born {
        return;
    }
    println!("{}", tracker.trimester());
    if let Some(days) = tracker.days_left() {
        println!("{days} days to go");
    }
    println!("{} photos", tracker.state().photos.len());
    if let Some(week) = tracker.reminder_banner_week() {
        println!("Time for your week {week} photo!");
    }
}

fn watch<C: Clock>(tracker: &mut TrackerService<'_, C>, max_polls: Option<u64>) -> ExitCode {
    let mut scheduler = ReminderScheduler::new(tracker.config(), ConsoleSink, ThreadTickSource);
    let timeout = tracker.config().reminder_interval.saturating_mul(2);

    if scheduler
        .sync(tracker.state(), tracker.clock().local_now())
        .is_none()
    {
        warn!("event=watch_start module=cli status=skip reason=not_eligible");
        println!("Reminders start after setup and stop once the baby is born.");
        return ExitCode::SUCCESS;
    }
    info!("event=watch_start module=cli status=ok");

    let mut status = ExitCode::SUCCESS;
    let mut polls = 1_u64;
    while max_polls.map_or(true, |max| polls < max) {
        // Photos or a birth recorded elsewhere land in the shared stores.
        tracker.reload();
        if let Some(outcome) = scheduler.sync(tracker.state(), tracker.clock().local_now()) {
            info!("event=watch_rearm module=cli status=ok outcome={outcome:?}");
            polls += 1;
        }
        if !scheduler.is_armed() {
            info!("event=watch_stop module=cli status=ok reason=not_eligible");
            println!("Reminders stopped.");
            break;
        }
        if !scheduler.is_ticking() {
            error!("event=watch_stop module=cli status=error reason=ticker_inactive");
            eprintln!("reminder timer is not running");
            status = ExitCode::FAILURE;
            break;
        }
        if scheduler
            .wait_and_pump(tracker.state(), tracker.clock(), timeout)
            .is_some()
        {
            polls += 1;
        }
    }
    scheduler.disarm();
    status
}

/// Prints reminders to the terminal; the bell stands in for the tone.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn show_reminder(&self, week: u8) {
        println!("Time for your week {week} photo!");
    }

    fn play_tone(&self) {
        print!("\x07");
        info!(
            "event=reminder_tone module=cli status=ok blips={}",
            REMINDER_TONE.len()
        );
    }

    fn vibrate(&self, _pattern_ms: &[u32]) {}
}
