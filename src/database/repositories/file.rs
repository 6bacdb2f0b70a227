use super::{DatabaseError, DbHandle, Repository};
use crate::core::proposal::FileDetail;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A scanned file as stored in the `files` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    pub path: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mtime: Option<i64>,
    #[serde(default)]
    pub bpm: Option<f64>,
}

impl FileRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            hash: row.get(0)?,
            path: row.get(1)?,
            file_size: row.get(2)?,
            mtime: row.get(3)?,
            bpm: row.get(4)?,
        })
    }
}

impl From<FileRecord> for FileDetail {
    fn from(record: FileRecord) -> Self {
        FileDetail {
            hash: record.hash,
            path: record.path,
            bpm: record.bpm,
            mtime: record.mtime,
        }
    }
}

pub struct FileRepository {
    db: DbHandle,
}

impl Repository for FileRepository {
    fn db(&self) -> &DbHandle {
        &self.db
    }
}

impl FileRepository {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn upsert(&self, record: &FileRecord) -> Result<(), DatabaseError> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO files (hash, path, file_size, mtime, bpm) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(hash) DO UPDATE SET
                path = excluded.path,
                file_size = excluded.file_size,
                mtime = excluded.mtime,
                bpm = excluded.bpm",
            params![
                record.hash,
                record.path,
                record.file_size,
                record.mtime,
                record.bpm
            ],
        )?;
        Ok(())
    }

    /// Upsert every record in one transaction. Returns how many were written.
    pub fn upsert_many(&self, records: &[FileRecord]) -> Result<usize, DatabaseError> {
        let conn = self.get_connection()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO files (hash, path, file_size, mtime, bpm) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(hash) DO UPDATE SET
                    path = excluded.path,
                    file_size = excluded.file_size,
                    mtime = excluded.mtime,
                    bpm = excluded.bpm",
            )?;
            for record in records {
                stmt.execute(params![
                    record.hash,
                    record.path,
                    record.file_size,
                    record.mtime,
                    record.bpm
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn find(&self, hash: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let conn = self.get_connection()?;
        let record = conn
            .query_row(
                "SELECT hash, path, file_size, mtime, bpm FROM files WHERE hash = ?1",
                [hash],
                FileRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_all(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let conn = self.get_connection()?;
        let mut stmt =
            conn.prepare("SELECT hash, path, file_size, mtime, bpm FROM files ORDER BY path ASC")?;
        let records = stmt
            .query_map([], FileRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
