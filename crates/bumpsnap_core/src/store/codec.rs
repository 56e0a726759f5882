//! Versioned decoder chain for the persisted state document.
//!
//! # Responsibility
//! - Recognize the canonical plain-JSON encoding and both legacy encodings.
//! - Shallow-merge a decoded document over a full set of defaults.
//! - Encode the canonical plain-JSON form.
//!
//! # Invariants
//! - Decoders are tried newest-first and never panic on arbitrary input.
//! - A decoder only accepts documents whose top-level JSON value is an object.
//! - Legacy base64 accepts single-byte (Latin-1) payloads; multi-byte UTF-8
//!   payloads belong to the UTF-8 base64 decoder so non-ASCII text survives.

use crate::model::state::PregnancyState;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Standard alphabet with optional padding.
const LEGACY_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub type DecodedFields = Map<String, Value>;

/// Known on-store encodings, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    PlainJson,
    LegacyBase64,
    LegacyUtf8Base64,
}

impl StateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlainJson => "plain_json",
            Self::LegacyBase64 => "legacy_base64",
            Self::LegacyUtf8Base64 => "legacy_utf8_base64",
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    Empty,
    Json(serde_json::Error),
    Base64(base64::DecodeError),
    Utf8(std::string::FromUtf8Error),
    /// Legacy base64 payload that is really multi-byte UTF-8.
    MultiByteText,
    NotAnObject,
    NoMatchingFormat,
    Schema(serde_json::Error),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "stored state is empty"),
            Self::Json(err) => write!(f, "invalid JSON: {err}"),
            Self::Base64(err) => write!(f, "invalid base64: {err}"),
            Self::Utf8(err) => write!(f, "invalid UTF-8 payload: {err}"),
            Self::MultiByteText => write!(f, "payload contains multi-byte UTF-8 text"),
            Self::NotAnObject => write!(f, "stored state is not a JSON object"),
            Self::NoMatchingFormat => write!(f, "stored state matches no known format"),
            Self::Schema(err) => write!(f, "stored state has an invalid shape: {err}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) | Self::Schema(err) => Some(err),
            Self::Base64(err) => Some(err),
            Self::Utf8(err) => Some(err),
            Self::Empty | Self::MultiByteText | Self::NotAnObject | Self::NoMatchingFormat => None,
        }
    }
}

/// One isolated decoder in the fallback chain.
pub trait StateDecoder {
    fn format(&self) -> StateFormat;
    fn decode(&self, raw: &str) -> Result<DecodedFields, DecodeError>;
}

/// Current format: the document is stored as JSON text.
pub struct PlainJsonDecoder;

/// First legacy format: base64 of single-byte JSON text.
pub struct LegacyBase64Decoder;

/// Second legacy format: base64 of UTF-8 encoded JSON text.
pub struct LegacyUtf8Base64Decoder;

impl StateDecoder for PlainJsonDecoder {
    fn format(&self) -> StateFormat {
        StateFormat::PlainJson
    }

    fn decode(&self, raw: &str) -> Result<DecodedFields, DecodeError> {
        parse_object(raw)
    }
}

impl StateDecoder for LegacyBase64Decoder {
    fn format(&self) -> StateFormat {
        StateFormat::LegacyBase64
    }

    fn decode(&self, raw: &str) -> Result<DecodedFields, DecodeError> {
        let bytes = decode_base64(raw)?;
        if !bytes.is_ascii() && std::str::from_utf8(&bytes).is_ok() {
            return Err(DecodeError::MultiByteText);
        }
        // Each byte is one Latin-1 character, like the legacy writer produced.
        let text = bytes.iter().map(|&b| char::from(b)).collect::<String>();
        parse_object(&text)
    }
}

impl StateDecoder for LegacyUtf8Base64Decoder {
    fn format(&self) -> StateFormat {
        StateFormat::LegacyUtf8Base64
    }

    fn decode(&self, raw: &str) -> Result<DecodedFields, DecodeError> {
        let bytes = decode_base64(raw)?;
        let text = String::from_utf8(bytes).map_err(DecodeError::Utf8)?;
        parse_object(&text)
    }
}

/// Fallback order used by `decode_document`.
pub const DECODER_CHAIN: &[&dyn StateDecoder] = &[
    &PlainJsonDecoder,
    &LegacyBase64Decoder,
    &LegacyUtf8Base64Decoder,
];

/// Runs the decoder chain and returns the first object-valued result.
pub fn decode_document(raw: &str) -> Result<(StateFormat, DecodedFields), DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    for decoder in DECODER_CHAIN {
        match decoder.decode(raw) {
            Ok(fields) => return Ok((decoder.format(), fields)),
            Err(err) => debug!(
                "event=state_decode module=store status=skip format={} reason={}",
                decoder.format().as_str(),
                err
            ),
        }
    }

    Err(DecodeError::NoMatchingFormat)
}

/// Shallow-merges `fields` over the default document.
///
/// Explicit `null`s never erase a non-null default, so fields added by schema
/// evolution (or nulled by old writers) backfill instead of going missing.
/// Fields of the wrong type fall back to their defaults; photos without a
/// readable capture date are stamped with `loaded_at`.
pub fn merge_over_defaults(
    mut fields: DecodedFields,
    loaded_at: DateTime<Utc>,
) -> Result<PregnancyState, DecodeError> {
    stamp_undated_photos(&mut fields, loaded_at);
    let mut merged = match serde_json::to_value(PregnancyState::default()) {
        Ok(Value::Object(defaults)) => defaults,
        Ok(_) => Map::new(),
        Err(err) => return Err(DecodeError::Schema(err)),
    };

    for (key, value) in fields {
        let keeps_default = value.is_null() && merged.get(&key).is_some_and(|d| !d.is_null());
        if !keeps_default {
            merged.insert(key, value);
        }
    }

    serde_json::from_value(Value::Object(merged)).map_err(DecodeError::Schema)
}

/// Canonical plain-JSON encoding.
pub fn encode_plain(state: &PregnancyState) -> Result<String, serde_json::Error> {
    serde_json::to_string(state)
}

fn stamp_undated_photos(fields: &mut DecodedFields, loaded_at: DateTime<Utc>) {
    let Some(Value::Array(photos)) = fields.get_mut("photos") else {
        return;
    };
    let stamp = loaded_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut stamped = 0_usize;
    for photo in photos.iter_mut().filter_map(Value::as_object_mut) {
        let dated = photo
            .get("date")
            .and_then(Value::as_str)
            .is_some_and(|text| DateTime::parse_from_rfc3339(text).is_ok());
        if !dated {
            photo.insert("date".to_string(), Value::String(stamp.clone()));
            stamped += 1;
        }
    }
    if stamped > 0 {
        debug!("event=state_decode module=store status=ok field=photo_date stamped={stamped}");
    }
}

fn decode_base64(raw: &str) -> Result<Vec<u8>, DecodeError> {
    let compact = raw
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    LEGACY_BASE64.decode(compact).map_err(DecodeError::Base64)
}

fn parse_object(text: &str) -> Result<DecodedFields, DecodeError> {
    match serde_json::from_str::<Value>(text).map_err(DecodeError::Json)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(DecodeError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_document, merge_over_defaults, DecodeError, LegacyBase64Decoder,
        LegacyUtf8Base64Decoder, PlainJsonDecoder, StateDecoder, StateFormat,
    };
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn loaded_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 7, 30, 0).unwrap()
    }

    #[test]
    fn plain_decoder_rejects_non_objects() {
        assert!(matches!(
            PlainJsonDecoder.decode("[1, 2]"),
            Err(DecodeError::NotAnObject)
        ));
        assert!(matches!(
            PlainJsonDecoder.decode("null"),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn legacy_base64_reads_latin1_bytes() {
        let raw = STANDARD.encode(b"{\"label\":\"caf\xe9\"}");
        let fields = LegacyBase64Decoder.decode(&raw).unwrap();
        assert_eq!(fields["label"], "café");
    }

    #[test]
    fn legacy_base64_leaves_utf8_payloads_to_utf8_decoder() {
        let raw = STANDARD.encode("{\"label\":\"café\"}".as_bytes());
        assert!(matches!(
            LegacyBase64Decoder.decode(&raw),
            Err(DecodeError::MultiByteText)
        ));
        let fields = LegacyUtf8Base64Decoder.decode(&raw).unwrap();
        assert_eq!(fields["label"], "café");
    }

    #[test]
    fn base64_decoding_tolerates_missing_padding_and_whitespace() {
        let encoded = STANDARD.encode("{\"a\":1}");
        let unpadded = encoded.trim_end_matches('=');
        let wrapped = format!("{}\n{}", &unpadded[..4], &unpadded[4..]);
        let (format, fields) = decode_document(&wrapped).unwrap();
        assert_eq!(format, StateFormat::LegacyBase64);
        assert_eq!(fields["a"], 1);
    }

    #[test]
    fn decode_document_reports_unknown_formats() {
        assert!(matches!(decode_document("   "), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_document("definitely not state"),
            Err(DecodeError::NoMatchingFormat)
        ));
    }

    #[test]
    fn merge_keeps_defaults_for_missing_and_null_fields() {
        let fields = json!({ "dueDate": "2025-06-01", "photos": null, "futureField": true });
        let state = merge_over_defaults(fields.as_object().unwrap().clone(), loaded_at()).unwrap();
        assert_eq!(state.current_week, 1);
        assert!(state.photos.is_empty());
        assert!(!state.setup_complete);
        assert_eq!(
            state.due_date.map(|d| d.to_string()).as_deref(),
            Some("2025-06-01")
        );
    }

    #[test]
    fn merge_falls_back_per_field_on_wrong_types() {
        let fields = json!({
            "currentWeek": 20,
            "setupComplete": "true",
            "babyBorn": 0,
            "reminderDismissed": { "12": true, "soon": true },
            "photos": [
                { "week": 10, "date": "2025-01-05T09:00:00.000Z", "label": null, "imageData": 7 },
                { "week": 11, "label": "undated", "imageData": "data:b" },
                "not a photo",
                { "label": "no week" }
            ]
        });
        let state = merge_over_defaults(fields.as_object().unwrap().clone(), loaded_at()).unwrap();

        assert_eq!(state.current_week, 20);
        assert!(state.setup_complete);
        assert!(!state.baby_born);
        assert_eq!(state.reminder_dismissed.len(), 1);
        assert_eq!(state.photos.len(), 2);
        assert_eq!(state.photos[0].label, "");
        assert_eq!(state.photos[0].image_data, "");
        assert_eq!(state.photos[1].date, loaded_at());
    }
}
