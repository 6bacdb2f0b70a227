use super::migrations::run_migrations;
use super::DatabaseError;
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the single SQLite connection.
pub type DbHandle = Arc<Mutex<Connection>>;

/// Create `data_dir` if needed, open `data_dir/file_name` and bring the
/// schema up to date.
pub fn init_db(data_dir: &Path, file_name: &str) -> Result<DbHandle, DatabaseError> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = data_dir.join(file_name);
    let conn = Connection::open(&db_path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;
        PRAGMA synchronous=NORMAL;
        ",
    )?;
    run_migrations(&conn)?;

    info!("Opened database at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn open_in_memory() -> Result<DbHandle, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn lock(db: &DbHandle) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
    db.lock().map_err(|e| DatabaseError::Lock(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table_names(db: &DbHandle) -> Vec<String> {
        let conn = lock(db).unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_init_db_creates_directory_and_tables() {
        let temp_dir = tempdir().unwrap();
        let data_dir = temp_dir.path().join("nested").join("Regroup");

        let db = init_db(&data_dir, "regroup.db").unwrap();

        assert!(data_dir.join("regroup.db").exists());
        let tables = table_names(&db);
        for expected in ["files", "group_files", "song_groups"] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_init_db_is_reentrant() {
        let temp_dir = tempdir().unwrap();
        init_db(temp_dir.path(), "regroup.db").unwrap();
        let db = init_db(temp_dir.path(), "regroup.db").unwrap();

        let conn = lock(&db).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, super::super::migrations::SCHEMA_VERSION);
    }
}
