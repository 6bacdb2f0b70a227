use super::{DatabaseError, DbHandle, Repository};
use crate::core::proposal::ConfirmationRecord;
use chrono::Utc;
use log::info;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedFile {
    pub hash: String,
    pub is_ignored: bool,
}

/// A group persisted by a confirmation, with its member files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedGroup {
    pub group_id: String,
    pub canonical_name: String,
    pub confirmed_at: i64,
    pub files: Vec<ConfirmedFile>,
}

impl ConfirmedGroup {
    pub fn active_count(&self) -> usize {
        self.files.iter().filter(|f| !f.is_ignored).count()
    }
}

pub struct GroupRepository {
    db: DbHandle,
}

impl Repository for GroupRepository {
    fn db(&self) -> &DbHandle {
        &self.db
    }
}

impl GroupRepository {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Persist a confirmation batch atomically, one new group per record.
    /// Returns the generated group ids in record order.
    pub fn confirm(&self, records: &[ConfirmationRecord]) -> Result<Vec<String>, DatabaseError> {
        let conn = self.get_connection()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().timestamp();
        let mut group_ids = Vec::with_capacity(records.len());

        for record in records {
            let group_id = format!("grp_{}", Uuid::new_v4().simple());
            let all_ignored = record.file_hashes.is_empty();

            tx.execute(
                "INSERT INTO song_groups (group_id, canonical_name, confirmed_at, is_ignored)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group_id, record.canonical_name, now, all_ignored],
            )?;

            for hash in &record.file_hashes {
                tx.execute(
                    "INSERT OR IGNORE INTO group_files (hash, group_id, is_ignored, assigned_at)
                     VALUES (?1, ?2, 0, ?3)",
                    params![hash, group_id, now],
                )?;
            }
            for hash in &record.ignored_hashes {
                tx.execute(
                    "INSERT OR IGNORE INTO group_files (hash, group_id, is_ignored, assigned_at)
                     VALUES (?1, ?2, 1, ?3)",
                    params![hash, group_id, now],
                )?;
            }

            group_ids.push(group_id);
        }

        tx.commit()?;
        info!("Persisted {} confirmed groups", group_ids.len());
        Ok(group_ids)
    }

    pub fn list_confirmed(&self) -> Result<Vec<ConfirmedGroup>, DatabaseError> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT sg.group_id, sg.canonical_name, sg.confirmed_at, gf.hash, gf.is_ignored
             FROM song_groups sg
             LEFT JOIN group_files gf ON sg.group_id = gf.group_id
             ORDER BY sg.canonical_name, sg.group_id, gf.hash",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<ConfirmedGroup> = Vec::new();
        for (group_id, canonical_name, confirmed_at, hash, is_ignored) in rows {
            let same_group = groups.last().is_some_and(|g| g.group_id == group_id);
            if !same_group {
                groups.push(ConfirmedGroup {
                    group_id,
                    canonical_name,
                    confirmed_at,
                    files: Vec::new(),
                });
            }
            if let (Some(hash), Some(group)) = (hash, groups.last_mut()) {
                group.files.push(ConfirmedFile {
                    hash,
                    is_ignored: is_ignored.unwrap_or(false),
                });
            }
        }

        Ok(groups)
    }

    pub fn has_confirmed(&self) -> Result<bool, DatabaseError> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM song_groups", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Group the hash was confirmed into as an active member, if any.
    pub fn group_for_file(&self, hash: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.get_connection()?;
        let group_id = conn
            .query_row(
                "SELECT group_id FROM group_files WHERE hash = ?1 AND is_ignored = 0 LIMIT 1",
                [hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(group_id)
    }

    /// Delete every confirmed group. Returns how many groups were removed.
    pub fn clear_all(&self) -> Result<usize, DatabaseError> {
        let conn = self.get_connection()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM group_files", [])?;
        let removed = tx.execute("DELETE FROM song_groups", [])?;
        tx.commit()?;
        info!("Cleared {} confirmed groups", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_db;
    use tempfile::{tempdir, TempDir};

    fn repo() -> (TempDir, GroupRepository) {
        let temp_dir = tempdir().unwrap();
        let db = init_db(temp_dir.path(), "test.db").unwrap();
        (temp_dir, GroupRepository::new(db))
    }

    fn record(name: &str, active: &[&str], ignored: &[&str]) -> ConfirmationRecord {
        ConfirmationRecord {
            canonical_name: name.to_string(),
            file_hashes: active.iter().map(|s| s.to_string()).collect(),
            ignored_hashes: ignored.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_confirm_and_list_groups() {
        let (_dir, repo) = repo();

        let ids = repo
            .confirm(&[
                record("Sunrise", &["h3"], &[]),
                record("Night Drive", &["h1", "h2"], &["h4"]),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids[0].starts_with("grp_"));

        let groups = repo.list_confirmed().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].canonical_name, "Night Drive");
        assert_eq!(groups[0].files.len(), 3);
        assert_eq!(groups[0].active_count(), 2);
        assert!(groups[0].files.iter().any(|f| f.hash == "h4" && f.is_ignored));
        assert_eq!(groups[1].canonical_name, "Sunrise");
    }

    #[test]
    fn test_hashes_need_no_file_record() {
        let (_dir, repo) = repo();
        repo.confirm(&[record("Orphan", &["never-imported"], &[])]).unwrap();
        assert!(repo.group_for_file("never-imported").unwrap().is_some());
        assert!(repo.group_for_file("other").unwrap().is_none());
    }

    #[test]
    fn test_group_for_file_skips_ignored_membership() {
        let (_dir, repo) = repo();
        let ids = repo
            .confirm(&[record("Night Drive", &["h1"], &["h2"])])
            .unwrap();

        assert_eq!(repo.group_for_file("h1").unwrap(), Some(ids[0].clone()));
        assert!(repo.group_for_file("h2").unwrap().is_none());
    }

    #[test]
    fn test_has_confirmed_and_clear_all() {
        let (_dir, repo) = repo();
        assert!(!repo.has_confirmed().unwrap());

        repo.confirm(&[record("A", &["h1"], &[]), record("B", &["h2"], &[])])
            .unwrap();
        assert!(repo.has_confirmed().unwrap());

        assert_eq!(repo.clear_all().unwrap(), 2);
        assert!(!repo.has_confirmed().unwrap());
        assert!(repo.list_confirmed().unwrap().is_empty());
    }

    #[test]
    fn test_same_name_confirmed_twice_stays_distinct() {
        let (_dir, repo) = repo();
        repo.confirm(&[record("Loop", &["h1"], &[])]).unwrap();
        repo.confirm(&[record("Loop", &["h2"], &[])]).unwrap();

        let groups = repo.list_confirmed().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.files.len() == 1));
    }
}
