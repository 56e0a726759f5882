//! Pregnancy state document.
//!
//! # Responsibility
//! - Define the canonical persisted document and its JSON wire names.
//! - Decode legacy documents leniently (loose week numbers, bad dates).
//! - Provide photo upsert, born transition and load-time normalization.
//!
//! # Invariants
//! - Wire names are camelCase and stable across releases.
//! - `photos` stays sorted ascending by week after every mutation here.
//! - `born_date.is_some() == baby_born` after `normalize` and `mark_born`.

use crate::config::MIN_PREGNANCY_WEEK;
use crate::dates::{clamp_week, parse_iso_date};
use crate::timeline::start_date_for_due;
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One captured bump photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    #[serde(deserialize_with = "deserialize_week")]
    pub week: u8,
    /// Capture instant. Undated legacy photos are stamped on load.
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub label: String,
    /// Opaque encoded image payload (typically a `data:` URL).
    #[serde(default, deserialize_with = "deserialize_text")]
    pub image_data: String,
}

impl PhotoRecord {
    /// Creates a record, defaulting a blank label to `Week N`.
    pub fn new(
        week: u8,
        date: DateTime<Utc>,
        label: Option<&str>,
        image_data: impl Into<String>,
    ) -> Self {
        let label = label
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map_or_else(|| default_photo_label(week), str::to_string);
        Self {
            week,
            date,
            label,
            image_data: image_data.into(),
        }
    }
}

pub fn default_photo_label(week: u8) -> String {
    format!("Week {week}")
}

/// The single process-wide state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PregnancyState {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    /// Due date minus the gestation length; anchors date-derived weeks.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "default_week", deserialize_with = "deserialize_week")]
    pub current_week: u8,
    #[serde(default, deserialize_with = "deserialize_photos")]
    pub photos: Vec<PhotoRecord>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub baby_born: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub born_date: Option<DateTime<Utc>>,
    /// Reserved: per-week dismissal flags, carried but not interpreted.
    #[serde(default, deserialize_with = "deserialize_dismissed")]
    pub reminder_dismissed: BTreeMap<u8, bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub setup_complete: bool,
}

impl Default for PregnancyState {
    fn default() -> Self {
        Self {
            due_date: None,
            start_date: None,
            current_week: MIN_PREGNANCY_WEEK,
            photos: Vec::new(),
            baby_born: false,
            born_date: None,
            reminder_dismissed: BTreeMap::new(),
            setup_complete: false,
        }
    }
}

impl PregnancyState {
    pub fn has_photo_for_week(&self, week: u8) -> bool {
        self.photos.iter().any(|photo| photo.week == week)
    }

    pub fn photo_for_week(&self, week: u8) -> Option<&PhotoRecord> {
        self.photos.iter().find(|photo| photo.week == week)
    }

    /// Inserts `record`, replacing every existing photo for the same week.
    ///
    /// Returns the stored record.
    pub fn upsert_photo(&mut self, record: PhotoRecord) -> &PhotoRecord {
        let week = record.week;
        self.photos.retain(|photo| photo.week != week);
        self.photos.push(record);
        self.photos.sort_by_key(|photo| photo.week);
        let index = self
            .photos
            .iter()
            .position(|photo| photo.week == week)
            .unwrap_or(self.photos.len() - 1);
        &self.photos[index]
    }

    /// Sets the due date and the derived start date together.
    pub fn set_due_date(&mut self, due_date: NaiveDate) {
        self.due_date = Some(due_date);
        self.start_date = start_date_for_due(due_date);
    }

    /// One-way born transition. Returns `false` when already born.
    pub fn mark_born(&mut self, at: DateTime<Utc>) -> bool {
        if self.baby_born {
            return false;
        }
        self.baby_born = true;
        self.born_date = Some(at);
        true
    }

    /// Whether the reminder scheduler should be polling for this state.
    pub fn is_reminder_eligible(&self) -> bool {
        self.setup_complete && !self.baby_born
    }

    /// Repairs a freshly decoded document so the model invariants hold.
    pub fn normalize(&mut self, now: DateTime<Utc>) {
        self.current_week = clamp_week(f64::from(self.current_week));
        self.photos.sort_by_key(|photo| photo.week);
        for photo in &mut self.photos {
            if photo.label.trim().is_empty() {
                photo.label = default_photo_label(photo.week);
            }
        }

        if self.baby_born && self.born_date.is_none() {
            self.born_date = Some(now);
        }
        if !self.baby_born {
            self.born_date = None;
        }

        if self.start_date.is_none() {
            if let Some(due_date) = self.due_date {
                self.start_date = start_date_for_due(due_date);
            }
        }
    }
}

fn default_week() -> u8 {
    MIN_PREGNANCY_WEEK
}

/// Reads a week from any JSON value the legacy app could have written.
pub(crate) fn week_from_value(value: &Value) -> u8 {
    match value {
        Value::Number(number) => number.as_f64().map_or(MIN_PREGNANCY_WEEK, clamp_week),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_or(MIN_PREGNANCY_WEEK, clamp_week),
        _ => MIN_PREGNANCY_WEEK,
    }
}

/// Reads a boolean flag; `"true"`/`"false"` strings are accepted, anything
/// else is `false`.
pub(crate) fn flag_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flag_from_value(&value))
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        _ => Ok(String::new()),
    }
}

/// Keeps every photo entry that decodes; malformed entries are dropped alone.
fn deserialize_photos<'de, D>(deserializer: D) -> Result<Vec<PhotoRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    let total = items.len();
    let photos = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<PhotoRecord>(item).ok())
        .collect::<Vec<_>>();
    if photos.len() < total {
        warn!(
            "event=state_decode module=model status=skip field=photos dropped={}",
            total - photos.len()
        );
    }
    Ok(photos)
}

fn deserialize_dismissed<'de, D>(deserializer: D) -> Result<BTreeMap<u8, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .iter()
        .filter_map(|(week, flag)| Some((week.trim().parse::<u8>().ok()?, flag_from_value(flag))))
        .collect())
}

fn deserialize_week<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(week_from_value(&value))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => {
            let parsed = parse_iso_date(&text);
            if parsed.is_none() {
                warn!("event=state_decode module=model status=skip field=date reason=invalid_date");
            }
            parsed
        }
        _ => None,
    })
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => match DateTime::parse_from_rfc3339(&text) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => {
                warn!(
                    "event=state_decode module=model status=skip field=timestamp reason=invalid_timestamp"
                );
                None
            }
        },
        _ => None,
    })
}
