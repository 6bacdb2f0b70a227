use crate::core::ports::{ProposalSource, SourceError};
use crate::core::proposal::{FileDetail, Proposal};
use crate::database::repositories::FileRepository;
use crate::database::DbHandle;
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

/// Proposals from the grouping backend's JSON export; file details from
/// the local `files` table.
pub struct JsonProposalSource {
    proposals_path: PathBuf,
    files: FileRepository,
}

impl JsonProposalSource {
    pub fn new(proposals_path: impl Into<PathBuf>, db: DbHandle) -> Self {
        Self {
            proposals_path: proposals_path.into(),
            files: FileRepository::new(db),
        }
    }
}

#[async_trait]
impl ProposalSource for JsonProposalSource {
    async fn fetch_proposals(&self) -> Result<Vec<Proposal>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.proposals_path).await?;
        let proposals: Vec<Proposal> = serde_json::from_str(&raw)?;
        debug!(
            "Read {} proposals from {}",
            proposals.len(),
            self.proposals_path.display()
        );
        Ok(proposals)
    }

    async fn fetch_file_details(&self) -> Result<Vec<FileDetail>, SourceError> {
        let records = self.files.list_all()?;
        Ok(records.into_iter().map(FileDetail::from).collect())
    }
}
