//! Review session: the proposal store plus the transient UI state that
//! goes with one review (current page, pending split, last error).
//!
//! Exactly one mutating call runs at a time. The async confirmation entry
//! points hold `&mut self` across the submission, so a second submission
//! cannot start from the same session until the first resolves. Surfaces
//! that submit on their own through [`ReviewSession::build_full_batch`] and
//! [`ReviewSession::apply_confirmed`] must disable repeat submission
//! themselves.

use crate::core::confirmation::{BatchKind, ConfirmationBatch};
use crate::core::ports::{ConfirmError, ConfirmationSink, ProposalSource};
use crate::core::proposal::{FileDetail, Proposal};
use crate::core::store::ProposalStore;
use crate::core::view::{clamp_page, PageView};
use log::{error, info, warn};
use std::collections::HashSet;

/// Files checked for a split that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSplit {
    pub group_id: String,
    pub selected: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct ReviewSession {
    store: ProposalStore,
    page: usize,
    active_split: Option<ActiveSplit>,
    last_error: Option<String>,
    completed: bool,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch proposals and file details and start a fresh session.
    ///
    /// A failing fetch degrades to an empty list; this never errors.
    pub async fn start<S>(source: &S) -> Self
    where
        S: ProposalSource + ?Sized,
    {
        let proposals = source.fetch_proposals().await.unwrap_or_else(|e| {
            warn!("Fetching proposals failed, starting with none: {}", e);
            Vec::new()
        });
        let file_details = source.fetch_file_details().await.unwrap_or_else(|e| {
            warn!("Fetching file details failed, starting with none: {}", e);
            Vec::new()
        });

        let mut session = Self::new();
        session.initialize(proposals, file_details);
        session
    }

    pub fn initialize(&mut self, proposals: Vec<Proposal>, file_details: Vec<FileDetail>) {
        self.store.initialize(proposals, file_details);
        self.page = 0;
        self.active_split = None;
        self.last_error = None;
        self.completed = false;
    }

    pub fn store(&self) -> &ProposalStore {
        &self.store
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Exit guard: a clean session may close without asking.
    pub fn can_close(&self) -> bool {
        !self.store.is_dirty()
    }

    /// Set once a confirm-all submission has succeeded.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    // ----- pagination -----

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_view(&self) -> PageView<'_> {
        self.store.page_view(self.page)
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = clamp_page(page, self.store.grouped_count());
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    pub fn high_confidence_count(&self) -> usize {
        self.store.high_confidence().len()
    }

    // ----- edits -----

    pub fn merge(&mut self, source_id: &str, target_id: &str) -> bool {
        let changed = self.store.merge(source_id, target_id);
        self.after_edit();
        changed
    }

    pub fn split(&mut self, group_id: &str, selected: &HashSet<String>) -> Option<String> {
        let created = self.store.split(group_id, selected);
        self.after_edit();
        created
    }

    pub fn assign_ungrouped(&mut self, hash: &str, bucket_id: &str, target_id: &str) -> bool {
        let changed = self.store.assign_ungrouped(hash, bucket_id, target_id);
        self.after_edit();
        changed
    }

    pub fn ignore(&mut self, hash: &str) -> bool {
        self.store.ignore(hash)
    }

    pub fn unignore(&mut self, hash: &str) -> bool {
        self.store.unignore(hash)
    }

    pub fn rename(&mut self, group_id: &str, name: &str) -> bool {
        self.store.rename(group_id, name)
    }

    // ----- split mode -----

    pub fn active_split(&self) -> Option<&ActiveSplit> {
        self.active_split.as_ref()
    }

    /// Enter split mode for a group with at least two files. Replaces any
    /// split already pending.
    pub fn begin_split(&mut self, group_id: &str) -> bool {
        match self.store.get(group_id) {
            Some(group) if !group.is_ungrouped && group.len() >= 2 => {
                self.active_split = Some(ActiveSplit {
                    group_id: group_id.to_string(),
                    selected: HashSet::new(),
                });
                true
            }
            _ => false,
        }
    }

    /// Check or uncheck a file of the pending split. Returns whether the
    /// file is now selected.
    pub fn toggle_split_file(&mut self, hash: &str) -> bool {
        let Some(split) = self.active_split.as_mut() else {
            return false;
        };
        let is_member = self
            .store
            .get(&split.group_id)
            .is_some_and(|g| g.contains(hash));
        if !is_member {
            return false;
        }
        if split.selected.remove(hash) {
            false
        } else {
            split.selected.insert(hash.to_string());
            true
        }
    }

    pub fn cancel_split(&mut self) {
        self.active_split = None;
    }

    /// Apply the pending split. The pending selection is cleared whether
    /// or not the split took effect.
    pub fn confirm_split(&mut self) -> Option<String> {
        let split = self.active_split.take()?;
        self.split(&split.group_id, &split.selected)
    }

    fn after_edit(&mut self) {
        self.page = clamp_page(self.page, self.store.grouped_count());
        let split_gone = self
            .active_split
            .as_ref()
            .is_some_and(|s| !self.store.contains(&s.group_id));
        if split_gone {
            self.active_split = None;
        }
    }

    // ----- confirmation -----

    pub fn build_high_confidence_batch(&self) -> ConfirmationBatch {
        self.store.build_high_confidence_batch()
    }

    pub fn build_full_batch(&self) -> ConfirmationBatch {
        self.store.build_full_batch()
    }

    /// Reconcile after `batch` was accepted by the persistence collaborator.
    pub fn apply_confirmed(&mut self, batch: &ConfirmationBatch) -> usize {
        let removed = self.store.apply_confirmed(batch);
        self.last_error = None;
        match batch.kind() {
            BatchKind::HighConfidence => {
                self.page = 0;
                self.after_edit();
            }
            BatchKind::All => self.completed = true,
        }
        removed
    }

    /// Record a failed submission. State is otherwise left untouched.
    pub fn record_failure(&mut self, err: &ConfirmError) {
        error!("Confirming groups failed: {}", err);
        self.last_error = Some(format!("Error: {}", err));
    }

    /// Submit every high-confidence group and drop them from the store on
    /// success. Returns how many groups were confirmed; nothing is
    /// submitted when the subset is empty.
    pub async fn approve_high_confidence<K>(&mut self, sink: &K) -> Result<usize, ConfirmError>
    where
        K: ConfirmationSink + ?Sized,
    {
        let batch = self.build_high_confidence_batch();
        if batch.is_empty() {
            info!("No high-confidence groups to approve");
            return Ok(0);
        }
        self.submit(sink, batch).await
    }

    /// Submit every group that is not fully ignored. On success the session
    /// is marked completed and clean.
    pub async fn confirm_all<K>(&mut self, sink: &K) -> Result<usize, ConfirmError>
    where
        K: ConfirmationSink + ?Sized,
    {
        let batch = self.build_full_batch();
        self.submit(sink, batch).await
    }

    async fn submit<K>(&mut self, sink: &K, batch: ConfirmationBatch) -> Result<usize, ConfirmError>
    where
        K: ConfirmationSink + ?Sized,
    {
        info!("Submitting {} confirmation records", batch.len());
        match sink.submit_confirmations(batch.records()).await {
            Ok(()) => {
                self.apply_confirmed(&batch);
                Ok(batch.len())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }
}
