//! Tracker configuration and fixed behavioral constants.
//!
//! # Responsibility
//! - Hold the knobs the core reads: week mode, reminder poll interval and the
//!   storage key of the state document.
//! - Resolve optional environment overrides without ever failing.
//!
//! # Invariants
//! - `reminder_interval` is never zero.
//! - `state_key` is never empty.

use log::warn;
use std::time::Duration;

pub const MIN_PREGNANCY_WEEK: u8 = 1;
pub const MAX_PREGNANCY_WEEK: u8 = 42;
/// Gestation length used to derive the pregnancy start date from a due date.
pub const GESTATION_DAYS: i64 = 280;
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_STATE_KEY: &str = "bumpsnap_state";

pub const ENV_WEEK_MODE: &str = "BUMPSNAP_WEEK_MODE";
pub const ENV_REMINDER_INTERVAL_SECS: &str = "BUMPSNAP_REMINDER_INTERVAL_SECS";
pub const ENV_STATE_KEY: &str = "BUMPSNAP_STATE_KEY";

/// How the current gestational week is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekMode {
    /// The user sets and advances `currentWeek` explicitly.
    #[default]
    Manual,
    /// The week follows the calendar from `startDate` (due date - 280 days).
    DateDerived,
}

impl WeekMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "date" | "date_derived" | "date-derived" => Some(Self::DateDerived),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::DateDerived => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub week_mode: WeekMode,
    pub reminder_interval: Duration,
    pub state_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            week_mode: WeekMode::Manual,
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            state_key: DEFAULT_STATE_KEY.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Builds a config from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// Invalid values are ignored with a `warn` event; defaults stay in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_WEEK_MODE) {
            match WeekMode::parse(&raw) {
                Some(mode) => config.week_mode = mode,
                None => warn!(
                    "event=config_override module=config status=skip var={} reason=unknown_week_mode",
                    ENV_WEEK_MODE
                ),
            }
        }

        if let Some(raw) = lookup(ENV_REMINDER_INTERVAL_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.reminder_interval = Duration::from_secs(secs),
                _ => warn!(
                    "event=config_override module=config status=skip var={} reason=invalid_interval",
                    ENV_REMINDER_INTERVAL_SECS
                ),
            }
        }

        if let Some(raw) = lookup(ENV_STATE_KEY) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!(
                    "event=config_override module=config status=skip var={} reason=empty",
                    ENV_STATE_KEY
                );
            } else {
                config.state_key = trimmed.to_string();
            }
        }

        config
    }

    pub fn with_week_mode(mut self, week_mode: WeekMode) -> Self {
        self.week_mode = week_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{TrackerConfig, WeekMode, DEFAULT_REMINDER_INTERVAL, DEFAULT_STATE_KEY};
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_poll_every_minute_in_manual_mode() {
        let config = TrackerConfig::default();
        assert_eq!(config.week_mode, WeekMode::Manual);
        assert_eq!(config.reminder_interval, DEFAULT_REMINDER_INTERVAL);
        assert_eq!(config.state_key, DEFAULT_STATE_KEY);
    }

    #[test]
    fn overrides_are_applied() {
        let config = TrackerConfig::from_lookup(lookup_from(&[
            ("BUMPSNAP_WEEK_MODE", " Date "),
            ("BUMPSNAP_REMINDER_INTERVAL_SECS", "5"),
            ("BUMPSNAP_STATE_KEY", "custom_key"),
        ]));
        assert_eq!(config.week_mode, WeekMode::DateDerived);
        assert_eq!(config.reminder_interval, Duration::from_secs(5));
        assert_eq!(config.state_key, "custom_key");
    }

    #[test]
    fn invalid_overrides_fall_back_to_defaults() {
        let config = TrackerConfig::from_lookup(lookup_from(&[
            ("BUMPSNAP_WEEK_MODE", "lunar"),
            ("BUMPSNAP_REMINDER_INTERVAL_SECS", "0"),
            ("BUMPSNAP_STATE_KEY", "   "),
        ]));
        assert_eq!(config, TrackerConfig::default());
    }
}
