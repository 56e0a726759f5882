//! Calendar and gestational-week helpers.
//!
//! # Responsibility
//! - Parse and format strict `YYYY-MM-DD` calendar dates.
//! - Clamp gestational weeks into the supported range.
//! - Provide month arithmetic that never spills into the following month.
//!
//! # Invariants
//! - Every function here is total: bad input yields `None` or a clamped value.
//! - `parse_iso_date(&to_iso_date_string(d)) == Some(d)` for every date with a
//!   four-digit year.

use crate::config::{MAX_PREGNANCY_WEEK, MIN_PREGNANCY_WEEK};
use chrono::{Datelike, NaiveDate, TimeDelta};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// Returns `None` unless the input names a real calendar day and formats back
/// to exactly the same text. `2023-02-30` is rejected rather than rolled over.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }
    if ![year, month, day]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let candidate =
        NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    if to_iso_date_string(candidate) != value {
        return None;
    }
    Some(candidate)
}

/// Formats a calendar date as zero-padded `YYYY-MM-DD`.
pub fn to_iso_date_string(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Coerces any numeric week into `[MIN_PREGNANCY_WEEK, MAX_PREGNANCY_WEEK]`.
///
/// Non-finite input maps to the minimum week; fractional weeks are truncated.
pub fn clamp_week(value: f64) -> u8 {
    if !value.is_finite() {
        return MIN_PREGNANCY_WEEK;
    }
    value.trunc().clamp(
        f64::from(MIN_PREGNANCY_WEEK),
        f64::from(MAX_PREGNANCY_WEEK),
    ) as u8
}

/// Applies a signed step to a week and clamps the result.
pub fn step_week(week: u8, delta: i32) -> u8 {
    clamp_week(f64::from(week) + f64::from(delta))
}

/// Returns the number of days in `month_index` (0-based, may be out of range)
/// of `year`. Out-of-range indices roll over into neighbouring years.
pub fn days_in_month(year: i32, month_index: i32) -> u32 {
    // Day zero of the following month is the last day of this one.
    let (next_year, next_month) = normalize_month(year, month_index.saturating_add(1));
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

/// Builds a date for an arbitrary month index, clamping `day` into the
/// resulting month (Jan 31 + 1 month -> Feb 28/29).
///
/// Returns `None` only when the year falls outside the representable range.
pub fn build_safe_date(year: i32, month_index: i32, day: u32) -> Option<NaiveDate> {
    let (target_year, target_month) = normalize_month(year, month_index);
    let safe_day = day.clamp(1, days_in_month(year, month_index));
    NaiveDate::from_ymd_opt(target_year, target_month, safe_day)
}

/// Shifts a date by whole days without panicking on overflow.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Short display form used by home and settings views, e.g. `Jan 5, 2025`.
pub fn format_display_date(date: NaiveDate) -> String {
    format!(
        "{} {}, {}",
        MONTH_ABBREVIATIONS[date.month0() as usize],
        date.day(),
        date.year()
    )
}

/// Month heading used by the gallery, e.g. `January 2025`.
pub fn month_year_label(date: NaiveDate) -> String {
    format!("{} {}", MONTH_NAMES[date.month0() as usize], date.year())
}

/// Short month name for a 0-based month index.
pub fn month_abbreviation(month0: u32) -> &'static str {
    MONTH_ABBREVIATIONS[(month0 % 12) as usize]
}

fn normalize_month(year: i32, month_index: i32) -> (i32, u32) {
    let year = year.saturating_add(month_index.div_euclid(12));
    let month = month_index.rem_euclid(12) as u32 + 1;
    (year, month)
}
