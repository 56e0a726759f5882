//! First-run setup wizard.
//!
//! Two steps: pick the due date one part at a time (day, month, year), then
//! pick the current week. Date edits only apply in the date step, week edits
//! only in the week step.

use crate::clock::Clock;
use crate::config::WeekMode;
use crate::dates::{add_days, build_safe_date, clamp_week, month_abbreviation, step_week};
use crate::model::state::PregnancyState;
use crate::service::tracker::TrackerService;
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Date,
    Week,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Day,
    Month,
    Year,
}

impl DatePart {
    fn next(self) -> Option<Self> {
        match self {
            Self::Day => Some(Self::Month),
            Self::Month => Some(Self::Year),
            Self::Year => None,
        }
    }
}

/// What a `confirm` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupProgress {
    /// Moved focus to the next date part.
    PartSelected(DatePart),
    /// Due date saved; now picking the week.
    WeekStep,
    /// Setup finished and persisted; the host should arm reminders.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFlow {
    step: SetupStep,
    part: DatePart,
    draft_date: NaiveDate,
    draft_week: u8,
}

impl SetupFlow {
    /// Seeds drafts from the stored due date (or tomorrow) and stored week.
    pub fn from_state(state: &PregnancyState, today: NaiveDate) -> Self {
        let draft_date = state
            .due_date
            .or_else(|| add_days(today, 1))
            .unwrap_or(today);
        Self {
            step: SetupStep::Date,
            part: DatePart::Day,
            draft_date,
            draft_week: clamp_week(f64::from(state.current_week)),
        }
    }

    pub fn start<C: Clock>(tracker: &TrackerService<'_, C>) -> Self {
        Self::from_state(tracker.state(), tracker.clock().local_now().date())
    }

    pub fn step(&self) -> SetupStep {
        self.step
    }

    pub fn part(&self) -> DatePart {
        self.part
    }

    pub fn draft_date(&self) -> NaiveDate {
        self.draft_date
    }

    pub fn draft_week(&self) -> u8 {
        self.draft_week
    }

    /// Display text of the day, month and year slots, e.g. `["05", "Jan", "2025"]`.
    pub fn date_slots(&self) -> [String; 3] {
        [
            format!("{:02}", self.draft_date.day()),
            month_abbreviation(self.draft_date.month0()).to_string(),
            self.draft_date.year().to_string(),
        ]
    }

    pub fn select_part(&mut self, part: DatePart) -> bool {
        if self.step != SetupStep::Date {
            return false;
        }
        self.part = part;
        true
    }

    /// Steps the focused date part by `delta`.
    pub fn change_date_part(&mut self, delta: i32) -> bool {
        if self.step != SetupStep::Date {
            return false;
        }
        let current = self.draft_date;
        let next = match self.part {
            DatePart::Day => add_days(current, i64::from(delta)),
            DatePart::Month => build_safe_date(
                current.year(),
                (current.month0() as i32).saturating_add(delta),
                current.day(),
            ),
            DatePart::Year => build_safe_date(
                current.year().saturating_add(delta),
                current.month0() as i32,
                current.day(),
            ),
        };
        if let Some(next) = next {
            self.draft_date = next;
        }
        true
    }

    pub fn change_week(&mut self, delta: i32) -> bool {
        if self.step != SetupStep::Week {
            return false;
        }
        self.draft_week = step_week(self.draft_week, delta);
        true
    }

    /// Advances the wizard, persisting through `tracker` where a step ends.
    pub fn confirm<C: Clock>(&mut self, tracker: &mut TrackerService<'_, C>) -> SetupProgress {
        match self.step {
            SetupStep::Date => {
                if let Some(next) = self.part.next() {
                    self.part = next;
                    return SetupProgress::PartSelected(next);
                }
                tracker.set_due_date(self.draft_date);
                if tracker.config().week_mode == WeekMode::DateDerived {
                    self.draft_week = tracker.current_week();
                }
                self.step = SetupStep::Week;
                SetupProgress::WeekStep
            }
            SetupStep::Week => {
                tracker.complete_setup(self.draft_date, self.draft_week);
                SetupProgress::Completed
            }
        }
    }
}
