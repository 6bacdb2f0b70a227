//! Entry points the CLI calls into. Each one opens what it needs from an
//! [`AppContext`] and reports plain data back.

use crate::config::AppConfig;
use crate::core::session::ReviewSession;
use crate::database::repositories::{ConfirmedGroup, FileRecord, FileRepository, GroupRepository};
use crate::database::{init_db, DbHandle};
use crate::services::{JsonProposalSource, SqliteConfirmationSink};
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

pub struct AppContext {
    db: DbHandle,
}

/// Result of a one-shot high-confidence approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproveOutcome {
    pub confirmed: usize,
    pub remaining: usize,
}

impl AppContext {
    pub fn open(config: AppConfig) -> Result<Self> {
        let db = init_db(&config.data_dir, &config.database_file).with_context(|| {
            format!("Failed to open database {}", config.database_path().display())
        })?;
        Ok(Self { db })
    }

    /// Load file records from a JSON array and upsert them.
    pub fn import_files(&self, json_path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(json_path)
            .with_context(|| format!("Failed to read {}", json_path.display()))?;
        let records: Vec<FileRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed file records in {}", json_path.display()))?;

        let written = FileRepository::new(self.db.clone()).upsert_many(&records)?;
        info!("Imported {} file records from {}", written, json_path.display());
        Ok(written)
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        Ok(FileRepository::new(self.db.clone()).list_all()?)
    }

    pub fn list_groups(&self) -> Result<Vec<ConfirmedGroup>> {
        Ok(GroupRepository::new(self.db.clone()).list_confirmed()?)
    }

    pub fn reset_groups(&self) -> Result<usize> {
        Ok(GroupRepository::new(self.db.clone()).clear_all()?)
    }

    pub fn has_confirmed_groups(&self) -> Result<bool> {
        Ok(GroupRepository::new(self.db.clone()).has_confirmed()?)
    }

    pub fn sink(&self) -> SqliteConfirmationSink {
        SqliteConfirmationSink::new(self.db.clone())
    }

    /// Start a review over the proposals exported to `proposals_path`.
    pub async fn open_session(&self, proposals_path: &Path) -> ReviewSession {
        let source = JsonProposalSource::new(proposals_path, self.db.clone());
        ReviewSession::start(&source).await
    }

    /// Open a session, approve its high-confidence groups and report what
    /// is left for manual review.
    pub async fn approve_high_once(&self, proposals_path: &Path) -> Result<ApproveOutcome> {
        let mut session = self.open_session(proposals_path).await;
        let confirmed = session
            .approve_high_confidence(&self.sink())
            .await
            .context("Approving high-confidence groups failed")?;

        Ok(ApproveOutcome {
            confirmed,
            remaining: session.store().len(),
        })
    }
}

/// Decide whether a review may be left. `confirm_discard` is only asked
/// when there are unsaved edits.
pub fn exit_guard<F>(session: &ReviewSession, confirm_discard: F) -> Result<bool>
where
    F: FnOnce() -> Result<bool>,
{
    if session.can_close() {
        return Ok(true);
    }
    confirm_discard()
}
