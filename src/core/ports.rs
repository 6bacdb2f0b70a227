//! Collaborator contracts for a review session.
//!
//! Proposals and file details come in through [`ProposalSource`]; confirmed
//! batches go out through [`ConfirmationSink`]. Neither side is owned by
//! the engine.

use crate::core::proposal::{ConfirmationRecord, FileDetail, Proposal};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed proposal data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("Confirmation rejected: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ProposalSource: Send + Sync {
    /// Current best-effort grouping from the clustering backend.
    async fn fetch_proposals(&self) -> Result<Vec<Proposal>, SourceError>;

    /// Scanner records, keyed by hash.
    async fn fetch_file_details(&self) -> Result<Vec<FileDetail>, SourceError>;
}

/// Persists reviewed groups.
///
/// Submissions are not assumed idempotent: callers must not resubmit a
/// batch that already succeeded, and must not start a second submission
/// while one is still in flight.
#[async_trait]
pub trait ConfirmationSink: Send + Sync {
    async fn submit_confirmations(&self, batch: &[ConfirmationRecord]) -> Result<(), ConfirmError>;
}
