//! Tracker use-case service.
//!
//! # Responsibility
//! - Own the in-memory state document and persist it after every mutation.
//! - Expose setup, capture, week, born and reset use cases.
//! - Answer derived view queries (week, trimester, countdown, home summary).
//!
//! # Invariants
//! - Every mutation goes through this service and is followed by a save.
//! - Rejected input leaves state untouched.
//! - In date-derived mode the stored week is never edited manually.

use crate::clock::Clock;
use crate::config::{TrackerConfig, WeekMode};
use crate::dates::{
    clamp_week, format_display_date, month_year_label, parse_iso_date, step_week,
};
use crate::model::state::{PhotoRecord, PregnancyState};
use crate::store::{SaveReport, StateStore};
use crate::timeline::{days_left, pregnancy_week, Trimester};
use chrono::NaiveDate;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    InvalidDate(String),
    EmptyImage,
    ManualWeekDisabled,
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(value) => {
                write!(f, "invalid calendar date `{value}`; expected YYYY-MM-DD")
            }
            Self::EmptyImage => write!(f, "photo has no image data"),
            Self::ManualWeekDisabled => {
                write!(f, "week follows the due date and cannot be changed manually")
            }
        }
    }
}

impl Error for TrackerError {}

/// Text shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSummary {
    /// Week number, or a celebration marker once born.
    pub headline: String,
    pub subtitle: String,
    /// Due date or birth date line.
    pub detail: String,
}

/// Consecutive photos sharing one month heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySection {
    pub label: String,
    /// Indices into `PregnancyState::photos`.
    pub photo_indices: Vec<usize>,
}

pub struct TrackerService<'a, C: Clock> {
    store: StateStore<'a>,
    config: TrackerConfig,
    clock: C,
    state: PregnancyState,
    restored: bool,
}

impl<'a, C: Clock> TrackerService<'a, C> {
    /// Loads the persisted state, or starts from a fresh default document.
    pub fn open(store: StateStore<'a>, config: TrackerConfig, clock: C) -> Self {
        let loaded = store.load(clock.now());
        let restored = loaded.is_some();
        let state = loaded.map(|loaded| loaded.state).unwrap_or_default();
        info!(
            "event=tracker_open module=service status=ok restored={} setup_complete={} week_mode={}",
            restored,
            state.setup_complete,
            config.week_mode.as_str()
        );
        Self {
            store,
            config,
            clock,
            state,
            restored,
        }
    }

    /// Re-reads persisted state written by another owner of the same stores.
    ///
    /// Keeps the in-memory document when no store has one. Returns whether state changed.
    pub fn reload(&mut self) -> bool {
        let Some(loaded) = self.store.load(self.clock.now()) else {
            debug!("event=tracker_reload module=service status=skip reason=no_document");
            return false;
        };
        let changed = loaded.state != self.state;
        if changed {
            info!(
                "event=tracker_reload module=service status=ok source={} photos={}",
                loaded.source,
                loaded.state.photos.len()
            );
        }
        self.state = loaded.state;
        self.restored = true;
        changed
    }

    pub fn state(&self) -> &PregnancyState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether `open` found a prior document.
    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn current_week(&self) -> u8 {
        pregnancy_week(&self.state, self.config.week_mode, self.clock.local_now())
    }

    pub fn trimester(&self) -> Trimester {
        Trimester::for_week(self.current_week())
    }

    /// Days until the due date, or `None` before a due date is known.
    pub fn days_left(&self) -> Option<i64> {
        self.state
            .due_date
            .map(|due_date| days_left(due_date, self.clock.local_now()))
    }

    pub fn has_photo_for_week(&self, week: u8) -> bool {
        self.state.has_photo_for_week(week)
    }

    pub fn photo_for_week(&self, week: u8) -> Option<&PhotoRecord> {
        self.state.photo_for_week(week)
    }

    /// Week to show in the reminder banner, if the banner is visible.
    pub fn reminder_banner_week(&self) -> Option<u8> {
        if !self.state.is_reminder_eligible() {
            return None;
        }
        let week = self.current_week();
        (!self.state.has_photo_for_week(week)).then_some(week)
    }

    pub fn set_due_date(&mut self, due_date: NaiveDate) -> SaveReport {
        self.state.set_due_date(due_date);
        self.persist("set_due_date")
    }

    /// Parses and applies a `YYYY-MM-DD` due date; bad input changes nothing.
    pub fn set_due_date_str(&mut self, value: &str) -> TrackerResult<SaveReport> {
        let due_date = parse_iso_date(value.trim())
            .ok_or_else(|| TrackerError::InvalidDate(value.to_string()))?;
        Ok(self.set_due_date(due_date))
    }

    /// Finishes first-run setup.
    pub fn complete_setup(&mut self, due_date: NaiveDate, week: u8) -> SaveReport {
        self.state.set_due_date(due_date);
        self.state.current_week = clamp_week(f64::from(week));
        self.state.setup_complete = true;
        self.persist("complete_setup")
    }

    /// Sets the manual week. Persists only when the clamped value changes.
    pub fn set_current_week(&mut self, week: u8) -> TrackerResult<u8> {
        if self.config.week_mode == WeekMode::DateDerived {
            return Err(TrackerError::ManualWeekDisabled);
        }
        let next = clamp_week(f64::from(week));
        if next != self.state.current_week {
            self.state.current_week = next;
            self.persist("set_current_week");
        }
        Ok(next)
    }

    /// Moves the manual week by `delta`, clamped.
    pub fn change_week(&mut self, delta: i32) -> TrackerResult<u8> {
        let current = clamp_week(f64::from(self.state.current_week));
        self.set_current_week(step_week(current, delta))
    }

    /// Saves a photo for the current week, replacing any earlier one.
    pub fn save_photo(
        &mut self,
        image_data: &str,
        label: Option<&str>,
    ) -> TrackerResult<PhotoRecord> {
        if image_data.trim().is_empty() {
            return Err(TrackerError::EmptyImage);
        }
        let week = self.current_week();
        let record = PhotoRecord::new(week, self.clock.now(), label, image_data);
        let stored = self.state.upsert_photo(record).clone();
        self.persist("save_photo");
        Ok(stored)
    }

    /// One-way transition to born. Returns `false` if already born.
    pub fn mark_born(&mut self) -> bool {
        let changed = self.state.mark_born(self.clock.now());
        if changed {
            self.persist("mark_born");
        }
        changed
    }

    /// Replaces everything with a fresh default document.
    pub fn reset(&mut self) -> SaveReport {
        self.state = PregnancyState::default();
        self.persist("reset")
    }

    pub fn home_summary(&self) -> HomeSummary {
        if self.state.baby_born {
            let born_text = self.state.born_date.map_or_else(
                || "--".to_string(),
                |born| format_display_date(self.clock.to_local(born).date()),
            );
            return HomeSummary {
                headline: "🎉".to_string(),
                subtitle: "Baby is here!".to_string(),
                detail: format!("Born {born_text}"),
            };
        }

        let week = self.current_week();
        let due_text = self
            .state
            .due_date
            .map_or_else(|| "--".to_string(), format_display_date);
        HomeSummary {
            headline: week.to_string(),
            subtitle: format!("Week {week}"),
            detail: format!("Due: {due_text}"),
        }
    }

    /// Groups photos into runs sharing the same local capture month.
    pub fn gallery_sections(&self) -> Vec<GallerySection> {
        let mut sections: Vec<GallerySection> = Vec::new();
        for (index, photo) in self.state.photos.iter().enumerate() {
            let label = month_year_label(self.clock.to_local(photo.date).date());
            match sections.last_mut() {
                Some(section) if section.label == label => section.photo_indices.push(index),
                _ => sections.push(GallerySection {
                    label,
                    photo_indices: vec![index],
                }),
            }
        }
        sections
    }

    fn persist(&self, operation: &str) -> SaveReport {
        let report = self.store.save(&self.state);
        info!(
            "event=state_mutate module=service status=ok op={} written={} failed={}",
            operation, report.written, report.failed
        );
        report
    }
}
