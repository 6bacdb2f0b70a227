use crate::core::proposal::{FileDetail, Proposal};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Working set of proposals plus the ignored-hash overlay.
///
/// Every mutating call leaves `groups` sorted ascending by confidence
/// (stable, so ties keep insertion order) and free of empty groups.
#[derive(Debug, Default)]
pub struct ProposalStore {
    groups: Vec<Proposal>,
    ignored: BTreeSet<String>,
    file_details: HashMap<String, FileDetail>,
    dirty: bool,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state with freshly fetched proposals and details.
    pub fn initialize(&mut self, proposals: Vec<Proposal>, file_details: Vec<FileDetail>) {
        self.groups = sanitize(proposals);
        self.file_details = file_details
            .into_iter()
            .map(|detail| (detail.hash.clone(), detail))
            .collect();
        self.ignored.clear();
        self.dirty = false;
        self.sort();

        info!(
            "Review store initialized with {} groups ({} ungrouped buckets), {} file records",
            self.groups.len(),
            self.groups.iter().filter(|g| g.is_ungrouped).count(),
            self.file_details.len()
        );
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// All groups, ascending by confidence.
    pub fn groups(&self) -> &[Proposal] {
        &self.groups
    }

    pub fn grouped(&self) -> impl Iterator<Item = &Proposal> {
        self.groups.iter().filter(|g| !g.is_ungrouped)
    }

    pub fn ungrouped(&self) -> impl Iterator<Item = &Proposal> {
        self.groups.iter().filter(|g| g.is_ungrouped)
    }

    pub fn grouped_count(&self) -> usize {
        self.grouped().count()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Proposal> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Proposal> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn file_detail(&self, hash: &str) -> Option<&FileDetail> {
        self.file_details.get(hash)
    }

    pub fn is_ignored(&self, hash: &str) -> bool {
        self.ignored.contains(hash)
    }

    pub fn ignored(&self) -> impl Iterator<Item = &String> {
        self.ignored.iter()
    }

    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }

    pub(crate) fn ignored_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.ignored
    }

    /// True iff the group has members and every one of them is ignored.
    pub fn is_fully_ignored(&self, group: &Proposal) -> bool {
        !group.is_empty() && group.file_hashes.iter().all(|h| self.ignored.contains(h))
    }

    pub(crate) fn push(&mut self, group: Proposal) {
        self.groups.push(group);
        self.sort();
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Proposal> {
        let index = self.groups.iter().position(|g| g.id == id)?;
        Some(self.groups.remove(index))
    }

    /// Drop every group whose id is in `ids`, returning how many went.
    pub(crate) fn remove_all(&mut self, ids: &HashSet<&str>) -> usize {
        let before = self.groups.len();
        self.groups.retain(|g| !ids.contains(g.id.as_str()));
        before - self.groups.len()
    }

    pub(crate) fn prune_empty(&mut self) {
        self.groups.retain(|g| {
            if g.is_empty() {
                debug!("Pruning empty group {}", g.id);
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn sort(&mut self) {
        self.groups
            .sort_by(|a, b| a.confidence.total_cmp(&b.confidence));
    }
}

/// Enforce the store invariants on imported proposals: confidence in
/// `[0,1]`, no hash listed twice, no empty groups.
fn sanitize(proposals: Vec<Proposal>) -> Vec<Proposal> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(proposals.len());

    for mut proposal in proposals {
        if !(0.0..=1.0).contains(&proposal.confidence) {
            let clamped = if proposal.confidence.is_nan() {
                0.0
            } else {
                proposal.confidence.clamp(0.0, 1.0)
            };
            warn!(
                "Group {} has confidence {} outside [0,1]; using {}",
                proposal.id, proposal.confidence, clamped
            );
            proposal.confidence = clamped;
        }
        // Fold -0.0 into 0.0 so the two tie under `sort`.
        proposal.confidence += 0.0;

        let original_len = proposal.file_hashes.len();
        proposal.file_hashes.retain(|hash| claimed.insert(hash.clone()));
        if proposal.file_hashes.len() != original_len {
            warn!(
                "Group {} listed {} file(s) already claimed; dropped them",
                proposal.id,
                original_len - proposal.file_hashes.len()
            );
        }

        if proposal.file_hashes.is_empty() {
            warn!("Skipping empty group {}", proposal.id);
            continue;
        }
        result.push(proposal);
    }

    result
}
