//! Weekly "photo needed" reminder scheduler.
//!
//! # Responsibility
//! - Own the recurring poll timer and its lifecycle (Idle / Armed / Fired).
//! - Fire one reminder per photo-less week through a `NotificationSink`.
//!
//! # Invariants
//! - At most one timer is alive per scheduler; re-arming replaces it.
//! - Disarming is synchronous and idempotent.
//! - The fired flag clears when the current week has a photo and whenever the
//!   polled week differs from the previous poll, so each new photo-less week
//!   can fire exactly once.

use crate::clock::Clock;
use crate::config::{TrackerConfig, WeekMode};
use crate::model::state::PregnancyState;
use crate::timeline::pregnancy_week;
use chrono::NaiveDateTime;
use log::{debug, info};
use std::time::Duration;

pub mod sink;
pub mod ticker;

pub use sink::{LogSink, NotificationSink, REMINDER_TONE, REMINDER_VIBRATION_PATTERN_MS};
pub use ticker::{ManualTickSource, ThreadTickSource, TickHandle, TickSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderPhase {
    /// No timer running.
    Idle,
    /// Polling; no reminder outstanding.
    Armed,
    /// A reminder was emitted for the current episode.
    Fired,
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Scheduler idle, setup incomplete or baby born.
    Skipped,
    /// Reminder emitted for this week.
    Fired(u8),
    /// Week still lacks a photo; already reminded this episode.
    AlreadyFired(u8),
    /// Week has its photo.
    Satisfied(u8),
}

pub struct ReminderScheduler<S: NotificationSink, T: TickSource> {
    week_mode: WeekMode,
    interval: Duration,
    sink: S,
    ticks: T,
    handle: Option<Box<dyn TickHandle>>,
    fired: bool,
    last_week: Option<u8>,
}

impl<S: NotificationSink, T: TickSource> ReminderScheduler<S, T> {
    pub fn new(config: &TrackerConfig, sink: S, ticks: T) -> Self {
        Self {
            week_mode: config.week_mode,
            interval: config.reminder_interval,
            sink,
            ticks,
            handle: None,
            fired: false,
            last_week: None,
        }
    }

    pub fn phase(&self) -> ReminderPhase {
        match (&self.handle, self.fired) {
            (None, _) => ReminderPhase::Idle,
            (Some(_), false) => ReminderPhase::Armed,
            (Some(_), true) => ReminderPhase::Fired,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether the armed timer is actually delivering ticks.
    pub fn is_ticking(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_active())
    }

    /// Starts (or restarts) the recurring poll and polls once immediately.
    ///
    /// Stays idle, with no timer, while setup is incomplete or the baby is born.
    pub fn arm(&mut self, state: &PregnancyState, now: NaiveDateTime) -> PollOutcome {
        if !state.is_reminder_eligible() {
            self.disarm();
            debug!("event=reminder_arm module=reminder status=skip reason=not_eligible");
            return PollOutcome::Skipped;
        }
        if let Some(mut previous) = self.handle.take() {
            previous.cancel();
        }
        self.handle = Some(self.ticks.start(self.interval));
        info!(
            "event=reminder_arm module=reminder status=ok interval_ms={} week_mode={}",
            self.interval.as_millis(),
            self.week_mode.as_str()
        );
        self.poll(state, now)
    }

    /// Cancels the poll timer and forgets the current episode.
    pub fn disarm(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
            info!("event=reminder_disarm module=reminder status=ok");
        }
        self.fired = false;
        self.last_week = None;
    }

    /// Arms or disarms to match what `state` allows.
    ///
    /// Returns the immediate poll outcome when this call armed the scheduler.
    pub fn sync(&mut self, state: &PregnancyState, now: NaiveDateTime) -> Option<PollOutcome> {
        match (state.is_reminder_eligible(), self.is_armed()) {
            (true, false) => Some(self.arm(state, now)),
            (false, true) => {
                self.disarm();
                None
            }
            _ => None,
        }
    }

    /// Runs the poll action once.
    pub fn poll(&mut self, state: &PregnancyState, now: NaiveDateTime) -> PollOutcome {
        if !self.is_armed() || !state.is_reminder_eligible() {
            return PollOutcome::Skipped;
        }

        let week = pregnancy_week(state, self.week_mode, now);
        if self.last_week != Some(week) {
            self.fired = false;
            self.last_week = Some(week);
        }

        if state.has_photo_for_week(week) {
            if self.fired {
                debug!("event=reminder_clear module=reminder status=ok week={week}");
            }
            self.fired = false;
            return PollOutcome::Satisfied(week);
        }

        if self.fired {
            return PollOutcome::AlreadyFired(week);
        }

        self.fire(week);
        PollOutcome::Fired(week)
    }

    /// Polls once if any tick elapsed since the last pump.
    pub fn pump(&mut self, state: &PregnancyState, now: NaiveDateTime) -> Option<PollOutcome> {
        let elapsed = self.handle.as_mut().map_or(0, |handle| handle.take_ticks());
        (elapsed > 0).then(|| self.poll(state, now))
    }

    /// Blocks up to `timeout` for the next tick, then polls. Host loop entry.
    pub fn wait_and_pump(
        &mut self,
        state: &PregnancyState,
        clock: &impl Clock,
        timeout: Duration,
    ) -> Option<PollOutcome> {
        let elapsed = self
            .handle
            .as_mut()
            .map_or(0, |handle| handle.wait_ticks(timeout));
        (elapsed > 0).then(|| self.poll(state, clock.local_now()))
    }

    fn fire(&mut self, week: u8) {
        self.fired = true;
        info!("event=reminder_fire module=reminder status=ok week={week}");
        self.sink.show_reminder(week);
        self.sink.play_tone();
        self.sink.vibrate(&REMINDER_VIBRATION_PATTERN_MS);
    }
}
