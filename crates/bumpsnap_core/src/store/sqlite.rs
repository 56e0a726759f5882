//! SQLite key/value backing store.
//!
//! Expects a connection returned by `db::open_db*`, i.e. with the
//! `kv_entries` table migrated in.

use super::{BackingStore, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BackingStore for SqliteKvStore<'_> {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}
