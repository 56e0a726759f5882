//! Core domain logic for BumpSnap.
//! This crate is the single source of truth for pregnancy state invariants.

pub mod clock;
pub mod config;
pub mod dates;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod service;
pub mod store;
pub mod timeline;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{TrackerConfig, WeekMode};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::state::{PhotoRecord, PregnancyState};
pub use reminder::{
    LogSink, ManualTickSource, NotificationSink, PollOutcome, ReminderPhase, ReminderScheduler,
    ThreadTickSource,
};
pub use service::setup_flow::{DatePart, SetupFlow, SetupProgress, SetupStep};
pub use service::tracker::{
    GallerySection, HomeSummary, TrackerError, TrackerResult, TrackerService,
};
pub use store::{
    BackingStore, FileStore, LoadedState, MemoryStore, SaveReport, SqliteKvStore, StateFormat,
    StateStore, StoreError,
};
pub use timeline::Trimester;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
