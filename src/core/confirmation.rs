// Confirmation batch building and post-submission reconciliation.

use crate::core::proposal::{ConfirmationRecord, Proposal};
use crate::core::store::ProposalStore;
use log::info;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// The approve-all shortcut over the HIGH band.
    HighConfidence,
    /// Everything that is not fully ignored, ungrouped buckets included.
    All,
}

/// Immutable payload for the persistence collaborator, plus the ids of the
/// groups it was built from so the store can be reconciled afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationBatch {
    kind: BatchKind,
    group_ids: Vec<String>,
    records: Vec<ConfirmationRecord>,
}

impl ConfirmationBatch {
    fn from_groups(kind: BatchKind, store: &ProposalStore, groups: &[&Proposal]) -> Self {
        Self {
            kind,
            group_ids: groups.iter().map(|g| g.id.clone()).collect(),
            records: groups.iter().map(|g| build_record(store, g)).collect(),
        }
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    pub fn group_ids(&self) -> &[String] {
        &self.group_ids
    }

    pub fn records(&self) -> &[ConfirmationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split a group's members into active and ignored hashes at build time.
pub fn build_record(store: &ProposalStore, group: &Proposal) -> ConfirmationRecord {
    let (ignored_hashes, file_hashes): (Vec<String>, Vec<String>) = group
        .file_hashes
        .iter()
        .cloned()
        .partition(|h| store.is_ignored(h));

    ConfirmationRecord {
        canonical_name: group.canonical_name.clone(),
        file_hashes,
        ignored_hashes,
    }
}

impl ProposalStore {
    pub fn build_high_confidence_batch(&self) -> ConfirmationBatch {
        let groups = self.high_confidence();
        ConfirmationBatch::from_groups(BatchKind::HighConfidence, self, &groups)
    }

    /// Grouped proposals first, then ungrouped buckets; fully ignored
    /// groups are left out.
    pub fn build_full_batch(&self) -> ConfirmationBatch {
        let groups: Vec<&Proposal> = self
            .grouped()
            .chain(self.ungrouped())
            .filter(|g| !self.is_fully_ignored(g))
            .collect();
        ConfirmationBatch::from_groups(BatchKind::All, self, &groups)
    }

    /// Reconcile after the collaborator accepted `batch`.
    ///
    /// A high-confidence batch removes exactly its groups and leaves the
    /// store dirty only while groups remain. A full batch clears the dirty
    /// flag and leaves the groups in place. Returns the number of groups
    /// removed.
    pub fn apply_confirmed(&mut self, batch: &ConfirmationBatch) -> usize {
        match batch.kind {
            BatchKind::HighConfidence => {
                let ids: HashSet<&str> = batch.group_ids.iter().map(String::as_str).collect();
                let removed = self.remove_all(&ids);
                let remaining = !self.is_empty();
                self.set_dirty(remaining);
                info!(
                    "Confirmed {} high-confidence groups; {} groups remain",
                    removed,
                    self.len()
                );
                removed
            }
            BatchKind::All => {
                self.set_dirty(false);
                info!("Confirmed all {} groups", batch.len());
                0
            }
        }
    }
}
