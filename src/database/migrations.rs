use super::DatabaseError;
use log::debug;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        debug!("Schema already at version {}", current);
        return Ok(());
    }

    // group_files.hash has no foreign key to files: groups may be confirmed
    // for hashes that were never imported as file records.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS files (
            hash      TEXT PRIMARY KEY,
            path      TEXT NOT NULL,
            file_size INTEGER NOT NULL DEFAULT 0,
            mtime     INTEGER,
            bpm       REAL
        );

        CREATE TABLE IF NOT EXISTS song_groups (
            group_id       TEXT PRIMARY KEY,
            canonical_name TEXT NOT NULL,
            confirmed_at   INTEGER NOT NULL,
            is_ignored     INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS group_files (
            hash        TEXT NOT NULL,
            group_id    TEXT NOT NULL,
            is_ignored  INTEGER NOT NULL DEFAULT 0,
            assigned_at INTEGER NOT NULL,
            PRIMARY KEY (hash, group_id),
            FOREIGN KEY (group_id) REFERENCES song_groups(group_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_group_files_hash ON group_files(hash);
        ",
    )?;
    conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;

    debug!("Migrated schema from version {} to {}", current, SCHEMA_VERSION);
    Ok(())
}
