use super::{open_connection, open_in_memory, CURRENT_SCHEMA_VERSION};
use rusqlite::params;
use std::path::{Path, PathBuf};

fn unique_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("trench-db-{}.sqlite", uuid::Uuid::now_v7()))
}

fn cleanup_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let candidate = format!("{}{}", path.display(), suffix);
        let _ = std::fs::remove_file(candidate);
    }
}

fn table_exists(conn: &rusqlite::Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
            params![table_name],
            |row| row.get(0),
        )
        .expect("table existence query should be readable");
    exists == 1
}

#[test]
fn configures_connection_pragmas() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("journal_mode pragma should be readable");
    assert_eq!(journal_mode.to_uppercase(), "WAL");

    let synchronous: i64 = conn
        .query_row("PRAGMA synchronous;", [], |row| row.get(0))
        .expect("synchronous pragma should be readable");
    assert_eq!(synchronous, 1);

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("foreign_keys pragma should be readable");
    assert_eq!(foreign_keys, 1);

    let busy_timeout: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .expect("busy_timeout pragma should be readable");
    assert_eq!(busy_timeout, 5000);

    cleanup_db_files(&path);
}

#[test]
fn initializes_required_tables() {
    let conn = open_in_memory().expect("connection should open");

    let tables = [
        "schema_migrations",
        "repos",
        "worktrees",
        "events",
        "logs",
        "tags",
        "session",
    ];
    for table in tables {
        assert!(table_exists(&conn, table), "table '{}' should exist", table);
    }
}

#[test]
fn records_applied_migrations() {
    let conn = open_in_memory().expect("connection should open");

    let latest: i64 = conn
        .query_row(
            "SELECT MAX(version) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .expect("migration version should be readable");
    assert_eq!(latest, CURRENT_SCHEMA_VERSION);
}

#[test]
fn reopening_does_not_reapply_migrations() {
    let path = unique_db_path();

    let conn = open_connection(&path).expect("first open should succeed");
    drop(conn);
    let conn = open_connection(&path).expect("second open should succeed");

    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .expect("migration count should be readable");
    assert_eq!(applied, 1);

    cleanup_db_files(&path);
}

#[test]
fn enforces_declared_uniqueness() {
    let conn = open_in_memory().expect("connection should open");

    conn.execute(
        "INSERT INTO repos (name, path, created_at) VALUES ('a', '/repos/a', 't')",
        [],
    )
    .expect("first insert should succeed");

    let err = conn
        .execute(
            "INSERT INTO repos (name, path, created_at) VALUES ('b', '/repos/a', 't')",
            [],
        )
        .expect_err("duplicate repo path should violate UNIQUE");
    assert!(err.to_string().contains("UNIQUE"));
}
