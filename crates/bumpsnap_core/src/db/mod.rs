//! Local SQLite database holding the persisted tracker state.
//!
//! The schema is a single `kv_entries(key, value, updated_at)` table. The state
//! document lives under the configured state key as one JSON text row, and
//! `store::sqlite::SqliteKvStore` is its only reader and writer. The database is
//! the first backing store consulted on load; the JSON file store follows it.
//!
//! # Responsibility
//! - Create the database file, set the busy timeout, and bring `kv_entries` up
//!   to the latest schema.
//! - Refuse files written by a newer build instead of guessing at their layout.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - A connection handed out by `open_db*` already has `kv_entries`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Opening, configuring or migrating the file failed.
    Sqlite(rusqlite::Error),
    /// The file's `user_version` is ahead of every migration this build ships.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "state database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "state database is at schema v{db_version}, written by a newer bumpsnap; this build reads up to v{latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
