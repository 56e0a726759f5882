//! Derived pregnancy views.
//!
//! # Responsibility
//! - Compute the gestational week in manual or date-derived mode.
//! - Bucket weeks into trimesters and count days to the due date.
//!
//! # Invariants
//! - Returned weeks are always inside `[1, 42]`.
//! - Day counts never go negative.

use crate::config::{WeekMode, GESTATION_DAYS};
use crate::dates::{add_days, clamp_week};
use crate::model::state::PregnancyState;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::{Display, Formatter};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Coarse three-way bucket of the gestational week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trimester {
    First,
    Second,
    Third,
}

impl Trimester {
    pub fn for_week(week: u8) -> Self {
        if week <= 13 {
            Self::First
        } else if week <= 26 {
            Self::Second
        } else {
            Self::Third
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "1st Trimester",
            Self::Second => "2nd Trimester",
            Self::Third => "3rd Trimester",
        }
    }
}

impl Display for Trimester {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Start of pregnancy for a due date (`due - 280 days`).
pub fn start_date_for_due(due_date: NaiveDate) -> Option<NaiveDate> {
    add_days(due_date, -GESTATION_DAYS)
}

/// Current gestational week for `state` at local wall-clock time `now`.
///
/// Date-derived mode falls back to the stored week while no due date exists.
pub fn pregnancy_week(state: &PregnancyState, mode: WeekMode, now: NaiveDateTime) -> u8 {
    match mode {
        WeekMode::Manual => clamp_week(f64::from(state.current_week)),
        WeekMode::DateDerived => match effective_start_date(state) {
            Some(start_date) => week_since_start(start_date, now),
            None => clamp_week(f64::from(state.current_week)),
        },
    }
}

/// `floor((now - start) / 1 week) + 1`, clamped.
pub fn week_since_start(start_date: NaiveDate, now: NaiveDateTime) -> u8 {
    let elapsed_ms = (now - start_date.and_time(NaiveTime::MIN)).num_milliseconds();
    let weeks = elapsed_ms.div_euclid(WEEK_MS).saturating_add(1);
    clamp_week(weeks as f64)
}

/// Whole days until local midnight of `due_date`, rounded up and floored at 0.
pub fn days_left(due_date: NaiveDate, now: NaiveDateTime) -> i64 {
    let remaining_ms = (due_date.and_time(NaiveTime::MIN) - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    -(-remaining_ms).div_euclid(DAY_MS)
}

fn effective_start_date(state: &PregnancyState) -> Option<NaiveDate> {
    state
        .start_date
        .or_else(|| state.due_date.and_then(start_date_for_due))
}
