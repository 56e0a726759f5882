use bumpsnap_core::db::migrations::latest_version;
use bumpsnap_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bumpsnap.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO kv_entries (key, value) VALUES ('bumpsnap_state', '{}');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM kv_entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn kv_entries_stamps_updated_at_by_default() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_entries (key, value) VALUES ('k', 'v');",
        [],
    )
    .unwrap();

    let updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM kv_entries WHERE key = 'k';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated_at > 0);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("schema v999"), "{message}");
    assert!(message.contains("newer bumpsnap"), "{message}");
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
