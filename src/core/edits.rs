// Edit operations over the proposal store.
//
// Invalid arguments (unknown ids, degenerate selections) are no-ops: the
// caller gets `false`/`None` back, the store and the dirty flag are untouched.

use crate::core::proposal::Proposal;
use crate::core::store::ProposalStore;
use log::debug;
use std::collections::HashSet;
use uuid::Uuid;

/// Confidence given to groups created by a split.
pub const SPLIT_CONFIDENCE: f64 = 0.0;

/// Session-local id for engine-created groups.
pub fn new_group_id() -> String {
    format!("grp_{}", Uuid::new_v4().simple())
}

impl ProposalStore {
    /// Fold `source_id` into `target_id`.
    ///
    /// The target keeps the union of both member lists and the lower of the
    /// two confidences; the source disappears.
    pub fn merge(&mut self, source_id: &str, target_id: &str) -> bool {
        if source_id == target_id {
            debug!("Ignoring merge of group {} into itself", source_id);
            return false;
        }
        let (Some(source), Some(target)) = (self.get(source_id), self.get(target_id)) else {
            debug!("Ignoring merge {} -> {}: unknown group", source_id, target_id);
            return false;
        };
        if source.is_ungrouped || target.is_ungrouped {
            debug!("Ignoring merge {} -> {}: ungrouped bucket", source_id, target_id);
            return false;
        }

        let Some(source) = self.remove(source_id) else {
            return false;
        };
        let Some(target) = self.get_mut(target_id) else {
            return false;
        };
        for hash in source.file_hashes {
            if !target.contains(&hash) {
                target.file_hashes.push(hash);
            }
        }
        target.confidence = target.confidence.min(source.confidence);

        self.sort();
        self.mark_dirty();
        true
    }

    /// Move `selected` out of `group_id` into a brand-new group.
    ///
    /// The selection must be a non-empty proper subset of the group's
    /// members. Returns the new group's id.
    pub fn split(&mut self, group_id: &str, selected: &HashSet<String>) -> Option<String> {
        let group = self.get(group_id)?;
        if group.is_ungrouped {
            debug!("Ignoring split of ungrouped bucket {}", group_id);
            return None;
        }

        let moved: Vec<String> = group
            .file_hashes
            .iter()
            .filter(|h| selected.contains(*h))
            .cloned()
            .collect();
        if moved.is_empty() || moved.len() >= group.len() {
            debug!(
                "Ignoring split of {}: {} of {} files selected",
                group_id,
                moved.len(),
                group.len()
            );
            return None;
        }

        let name = format!("{} (split)", group.canonical_name);
        let group = self.get_mut(group_id)?;
        group.file_hashes.retain(|h| !selected.contains(h));

        let new_id = new_group_id();
        self.push(Proposal::new(new_id.clone(), name, SPLIT_CONFIDENCE, moved));
        self.mark_dirty();
        Some(new_id)
    }

    /// Move `hash` from the ungrouped bucket `bucket_id` into `target_id`.
    ///
    /// The bucket is pruned once its last file is assigned out. The hash's
    /// ignored status is left as it was.
    pub fn assign_ungrouped(&mut self, hash: &str, bucket_id: &str, target_id: &str) -> bool {
        match self.get(target_id) {
            Some(target) if !target.is_ungrouped => {}
            _ => {
                debug!("Ignoring assign of {}: no grouped target {}", hash, target_id);
                return false;
            }
        }
        match self.get(bucket_id) {
            Some(bucket) if bucket.is_ungrouped && bucket.contains(hash) => {}
            _ => {
                debug!("Ignoring assign of {}: not in ungrouped bucket {}", hash, bucket_id);
                return false;
            }
        }

        if let Some(bucket) = self.get_mut(bucket_id) {
            bucket.file_hashes.retain(|h| h != hash);
        }
        if let Some(target) = self.get_mut(target_id) {
            if !target.contains(hash) {
                target.file_hashes.push(hash.to_string());
            }
        }

        self.prune_empty();
        self.mark_dirty();
        true
    }

    /// Exclude `hash` from confirmation output. Membership is unchanged.
    pub fn ignore(&mut self, hash: &str) -> bool {
        if !self.ignored_mut().insert(hash.to_string()) {
            return false;
        }
        self.mark_dirty();
        true
    }

    pub fn unignore(&mut self, hash: &str) -> bool {
        if !self.ignored_mut().remove(hash) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Set a group's display name. Blank input keeps the previous name.
    pub fn rename(&mut self, group_id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(group) = self.get_mut(group_id) else {
            return false;
        };
        if group.canonical_name == name {
            return false;
        }
        group.canonical_name = name.to_string();
        self.mark_dirty();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::tests::hashes;
    use std::collections::HashSet;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn store_with(groups: Vec<Proposal>) -> ProposalStore {
        let mut store = ProposalStore::new();
        store.initialize(groups, vec![]);
        store
    }

    fn assert_sorted(store: &ProposalStore) {
        let confidences: Vec<f64> = store.grouped().map(|g| g.confidence).collect();
        assert!(
            confidences.windows(2).all(|w| w[0] <= w[1]),
            "not ascending: {:?}",
            confidences
        );
    }

    fn assert_unique_membership(store: &ProposalStore) {
        let mut seen = HashSet::new();
        for group in store.groups() {
            for hash in &group.file_hashes {
                assert!(seen.insert(hash.clone()), "{} listed twice", hash);
            }
        }
    }

    #[test]
    fn test_merge_takes_union_and_min_confidence() {
        let mut store = store_with(vec![
            Proposal::new("a", "A", 0.9, hashes(&["h1", "h2"])),
            Proposal::new("b", "B", 0.6, hashes(&["h3"])),
        ]);

        assert!(store.merge("a", "b"));

        assert!(!store.contains("a"));
        let b = store.get("b").unwrap();
        assert_eq!(b.confidence, 0.6);
        assert_eq!(b.file_hashes, hashes(&["h3", "h1", "h2"]));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_merge_lowers_target_confidence() {
        let mut store = store_with(vec![
            Proposal::new("low", "Low", 0.3, hashes(&["h1"])),
            Proposal::new("mid", "Mid", 0.5, hashes(&["h2"])),
            Proposal::new("high", "High", 0.95, hashes(&["h3"])),
        ]);

        assert!(store.merge("low", "high"));

        let high = store.get("high").unwrap();
        assert_eq!(high.confidence, 0.3);
        let order: Vec<&str> = store.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid"]);
        assert_sorted(&store);
    }

    #[test]
    fn test_merge_unknown_or_same_id_is_noop() {
        let mut store = store_with(vec![
            Proposal::new("a", "A", 0.9, hashes(&["h1"])),
            Proposal::new("b", "B", 0.6, hashes(&["h2"])),
        ]);

        assert!(!store.merge("a", "missing"));
        assert!(!store.merge("missing", "a"));
        assert!(!store.merge("a", "a"));
        assert_eq!(store.len(), 2);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_merge_rejects_ungrouped_bucket() {
        let mut store = store_with(vec![
            Proposal::new("a", "A", 0.9, hashes(&["h1"])),
            Proposal::ungrouped("u", hashes(&["h2"])),
        ]);

        assert!(!store.merge("u", "a"));
        assert!(!store.merge("a", "u"));
        assert_eq!(store.len(), 2);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_split_creates_zero_confidence_group_first() {
        let mut store = store_with(vec![
            Proposal::new("other", "Other", 0.4, hashes(&["o1"])),
            Proposal::new("g", "Night Drive", 0.9, hashes(&["h1", "h2", "h3"])),
        ]);

        let new_id = store.split("g", &set(&["h3", "h1"])).unwrap();

        let created = store.get(&new_id).unwrap();
        assert_eq!(created.canonical_name, "Night Drive (split)");
        assert_eq!(created.confidence, 0.0);
        assert_eq!(created.file_hashes, hashes(&["h1", "h3"]));
        assert!(!created.is_ungrouped);
        assert_eq!(store.get("g").unwrap().file_hashes, hashes(&["h2"]));
        assert_eq!(store.groups()[0].id, new_id);
        assert!(store.is_dirty());
        assert_unique_membership(&store);
    }

    #[test]
    fn test_split_boundary_selections_are_noops() {
        let mut store = store_with(vec![Proposal::new("g", "G", 0.9, hashes(&["h1", "h2"]))]);

        assert!(store.split("g", &set(&[])).is_none());
        assert!(store.split("g", &set(&["h1", "h2"])).is_none());
        assert!(store.split("g", &set(&["not-a-member"])).is_none());
        assert!(store.split("missing", &set(&["h1"])).is_none());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("g").unwrap().len(), 2);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_split_then_merge_restores_members() {
        let mut store = store_with(vec![Proposal::new("g", "G", 0.8, hashes(&["h1", "h2", "h3", "h4"]))]);
        let original: HashSet<String> = store.get("g").unwrap().file_hashes.iter().cloned().collect();

        let new_id = store.split("g", &set(&["h2", "h4"])).unwrap();
        assert!(store.merge(&new_id, "g"));

        let restored: HashSet<String> = store.get("g").unwrap().file_hashes.iter().cloned().collect();
        assert_eq!(restored, original);
        assert_eq!(store.get("g").unwrap().confidence, 0.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_split_ids_are_unique() {
        let mut store = store_with(vec![Proposal::new("g", "G", 0.8, hashes(&["h1", "h2", "h3"]))]);

        let first = store.split("g", &set(&["h1"])).unwrap();
        let second = store.split("g", &set(&["h2"])).unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("grp_"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_sort_invariant_over_edit_sequence() {
        let mut store = store_with(vec![
            Proposal::new("a", "A", 0.91, hashes(&["a1", "a2", "a3"])),
            Proposal::new("b", "B", 0.42, hashes(&["b1", "b2"])),
            Proposal::new("c", "C", 0.77, hashes(&["c1"])),
            Proposal::new("d", "D", 0.66, hashes(&["d1", "d2"])),
        ]);

        store.merge("c", "a");
        assert_sorted(&store);
        let split_id = store.split("a", &set(&["a2", "c1"])).unwrap();
        assert_sorted(&store);
        store.merge("d", &split_id);
        assert_sorted(&store);
        store.split("b", &set(&["b1"]));
        assert_sorted(&store);
        assert_unique_membership(&store);
    }

    #[test]
    fn test_assign_ungrouped_moves_and_prunes_bucket() {
        let mut store = store_with(vec![
            Proposal::new("g", "G", 0.7, hashes(&["h1"])),
            Proposal::ungrouped("u", hashes(&["x1", "x2"])),
        ]);

        assert!(store.assign_ungrouped("x1", "u", "g"));
        assert_eq!(store.get("g").unwrap().file_hashes, hashes(&["h1", "x1"]));
        assert_eq!(store.get("u").unwrap().file_hashes, hashes(&["x2"]));

        assert!(store.assign_ungrouped("x2", "u", "g"));
        assert!(!store.contains("u"));
        assert_eq!(store.get("g").unwrap().len(), 3);
        assert!(store.is_dirty());
        assert_unique_membership(&store);
    }

    #[test]
    fn test_assign_ungrouped_invalid_arguments_are_noops() {
        let mut store = store_with(vec![
            Proposal::new("g", "G", 0.7, hashes(&["h1"])),
            Proposal::ungrouped("u", hashes(&["x1"])),
        ]);

        assert!(!store.assign_ungrouped("x1", "u", "missing"));
        assert!(!store.assign_ungrouped("x1", "u", "u"));
        assert!(!store.assign_ungrouped("x1", "missing", "g"));
        assert!(!store.assign_ungrouped("h1", "g", "g"));
        assert!(!store.assign_ungrouped("nope", "u", "g"));

        assert_eq!(store.get("u").unwrap().file_hashes, hashes(&["x1"]));
        assert_eq!(store.get("g").unwrap().file_hashes, hashes(&["h1"]));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_assign_keeps_ignored_status() {
        let mut store = store_with(vec![
            Proposal::new("g", "G", 0.7, hashes(&["h1"])),
            Proposal::ungrouped("u", hashes(&["x1", "x2"])),
        ]);
        store.ignore("x1");

        store.assign_ungrouped("x1", "u", "g");
        assert!(store.is_ignored("x1"));
    }

    #[test]
    fn test_ignore_and_unignore_are_idempotent() {
        let mut store = store_with(vec![Proposal::new("g", "G", 0.7, hashes(&["h1", "h2"]))]);

        assert!(!store.unignore("h1"));
        assert!(!store.is_dirty());

        assert!(store.ignore("h1"));
        assert!(store.is_dirty());
        assert!(!store.ignore("h1"));
        assert_eq!(store.ignored_count(), 1);
        assert_eq!(store.get("g").unwrap().len(), 2);

        assert!(store.unignore("h1"));
        assert!(!store.unignore("h1"));
        assert_eq!(store.ignored_count(), 0);
    }

    #[test]
    fn test_ignore_does_not_change_confidence_or_order() {
        let mut store = store_with(vec![
            Proposal::new("a", "A", 0.3, hashes(&["h1"])),
            Proposal::new("b", "B", 0.9, hashes(&["h2"])),
        ]);
        store.ignore("h1");

        assert_eq!(store.get("a").unwrap().confidence, 0.3);
        assert_eq!(store.groups()[0].id, "a");
    }

    #[test]
    fn test_rename_trims_and_rejects_blank() {
        let mut store = store_with(vec![Proposal::new("g", "Old", 0.7, hashes(&["h1"]))]);

        assert!(!store.rename("g", "   "));
        assert_eq!(store.get("g").unwrap().canonical_name, "Old");
        assert!(!store.is_dirty());

        assert!(store.rename("g", "  New Name "));
        assert_eq!(store.get("g").unwrap().canonical_name, "New Name");
        assert!(store.is_dirty());

        assert!(!store.rename("missing", "x"));
    }
}
