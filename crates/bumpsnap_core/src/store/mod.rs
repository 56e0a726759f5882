//! State persistence across one or more backing stores.
//!
//! # Responsibility
//! - Define the key/value backing store contract and its implementations.
//! - Load the most recent valid state document through the decoder chain.
//! - Save the canonical plain-JSON document to every available store.
//!
//! # Invariants
//! - Stores are queried in registration order; the first decodable document wins.
//! - A failing or unavailable store never prevents reading or writing others.
//! - An accepted document is immediately written back in plain-JSON form.
//! - Nothing in this module returns an error to the caller for store failures;
//!   they are logged and absorbed.

use crate::db::DbError;
use crate::model::state::PregnancyState;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod codec;
mod file;
mod memory;
mod sqlite;

pub use codec::{DecodeError, StateFormat};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteKvStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
    Io {
        store: String,
        source: std::io::Error,
    },
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(store) => write!(f, "store `{store}` is unavailable"),
            Self::Io { store, source } => write!(f, "store `{store}` I/O failure: {source}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String key/value store holding the serialized state document.
pub trait BackingStore {
    /// Stable short name used in diagnostics.
    fn name(&self) -> &str;

    /// Whether the store exists on this platform. Unavailable stores are
    /// skipped silently.
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

impl<T: BackingStore + ?Sized> BackingStore for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }
}

/// A document accepted by `StateStore::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub state: PregnancyState,
    /// Name of the store the document came from.
    pub source: String,
    pub format: StateFormat,
}

/// Per-save outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SaveReport {
    /// True when every available store accepted the write.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.written > 0
    }
}

/// Multi-store persistence front for the single state document.
pub struct StateStore<'a> {
    key: String,
    backends: Vec<Box<dyn BackingStore + 'a>>,
}

impl<'a> StateStore<'a> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            backends: Vec::new(),
        }
    }

    /// Appends a backing store at the lowest priority so far.
    pub fn with_backend(mut self, backend: impl BackingStore + 'a) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    /// Returns the first valid document found, or `None` when no store holds
    /// a decodable state.
    ///
    /// # Side effects
    /// - Rewrites the accepted document to every store in plain-JSON form.
    pub fn load(&self, now: DateTime<Utc>) -> Option<LoadedState> {
        for backend in &self.backends {
            let Some(raw) = self.read_candidate(backend.as_ref()) else {
                continue;
            };

            let decoded = codec::decode_document(&raw)
                .and_then(|(format, fields)| {
                    Ok((format, codec::merge_over_defaults(fields, now)?))
                });
            let (format, mut state) = match decoded {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(
                        "event=state_load module=store status=skip store={} reason={}",
                        backend.name(),
                        err
                    );
                    continue;
                }
            };

            state.normalize(now);
            info!(
                "event=state_load module=store status=ok store={} format={} photos={}",
                backend.name(),
                format.as_str(),
                state.photos.len()
            );

            self.save(&state);
            return Some(LoadedState {
                state,
                source: backend.name().to_string(),
                format,
            });
        }

        info!("event=state_load module=store status=empty");
        None
    }

    /// Writes `state` to every available store, best-effort.
    pub fn save(&self, state: &PregnancyState) -> SaveReport {
        let mut report = SaveReport::default();
        let json = match codec::encode_plain(state) {
            Ok(json) => json,
            Err(err) => {
                error!("event=state_save module=store status=error reason=encode error={err}");
                report.failed = self.backends.len();
                return report;
            }
        };

        for backend in &self.backends {
            if !backend.is_available() {
                report.skipped += 1;
                continue;
            }
            match backend.set(&self.key, &json) {
                Ok(()) => report.written += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(
                        "event=state_save module=store status=error store={} error={}",
                        backend.name(),
                        err
                    );
                }
            }
        }

        debug!(
            "event=state_save module=store status=ok written={} failed={} skipped={} bytes={}",
            report.written,
            report.failed,
            report.skipped,
            json.len()
        );
        report
    }

    fn read_candidate(&self, backend: &dyn BackingStore) -> Option<String> {
        if !backend.is_available() {
            debug!(
                "event=state_load module=store status=skip store={} reason=unavailable",
                backend.name()
            );
            return None;
        }

        match backend.get(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => Some(raw),
            Ok(_) => None,
            Err(err) => {
                error!(
                    "event=state_load module=store status=error store={} error={}",
                    backend.name(),
                    err
                );
                None
            }
        }
    }
}
