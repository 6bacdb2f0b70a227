// Read-only projections of the proposal store for a review surface.

use crate::core::proposal::{
    confidence_percent, display_name, ConfidenceBand, FileDetail, Proposal, HIGH_CONFIDENCE,
};
use crate::core::store::ProposalStore;

/// Grouped proposals shown per page. Ungrouped buckets are never paginated.
pub const PAGE_SIZE: usize = 20;

/// Number of pages needed for `grouped_count` groups (never less than one).
pub fn total_pages(grouped_count: usize) -> usize {
    grouped_count.div_ceil(PAGE_SIZE).max(1)
}

/// Clamp `page` into `[0, total_pages - 1]`.
pub fn clamp_page(page: usize, grouped_count: usize) -> usize {
    page.min(total_pages(grouped_count) - 1)
}

/// One page of grouped proposals.
#[derive(Debug)]
pub struct PageView<'a> {
    pub page: usize,
    pub total_pages: usize,
    /// Zero-based index of the first group on this page.
    pub start: usize,
    /// Exclusive end index.
    pub end: usize,
    pub total_grouped: usize,
    pub groups: Vec<GroupCard<'a>>,
}

impl PageView<'_> {
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    /// "Groups 21–40 of 45" style counter.
    pub fn counter_label(&self) -> String {
        format!(
            "Groups {}\u{2013}{} of {}",
            self.start + 1,
            self.end,
            self.total_grouped
        )
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page + 1, self.total_pages)
    }
}

#[derive(Debug)]
pub struct GroupCard<'a> {
    /// Zero-based position among all grouped proposals.
    pub position: usize,
    pub group: &'a Proposal,
    pub band: ConfidenceBand,
    pub fully_ignored: bool,
    pub files: Vec<FileRow<'a>>,
}

impl GroupCard<'_> {
    pub fn header_label(&self, total: usize) -> String {
        format!(
            "Group {} of {} \u{2014} Confidence: {}% ({})",
            self.position + 1,
            total,
            confidence_percent(self.group.confidence),
            self.band
        )
    }
}

#[derive(Debug)]
pub struct FileRow<'a> {
    pub hash: &'a str,
    pub detail: Option<&'a FileDetail>,
    pub ignored: bool,
}

impl FileRow<'_> {
    pub fn name(&self) -> String {
        display_name(self.detail.map(|d| d.path.as_str()), self.hash)
    }

    pub fn bpm_label(&self) -> String {
        self.detail
            .map(FileDetail::bpm_label)
            .unwrap_or_else(|| "\u{2014}".to_string())
    }

    pub fn date_label(&self) -> String {
        self.detail
            .map(FileDetail::date_label)
            .unwrap_or_else(|| "\u{2014}".to_string())
    }
}

/// A file waiting in an ungrouped bucket.
#[derive(Debug)]
pub struct UngroupedFile<'a> {
    pub bucket_id: &'a str,
    pub row: FileRow<'a>,
}

impl ProposalStore {
    fn file_row<'a>(&'a self, hash: &'a str) -> FileRow<'a> {
        FileRow {
            hash,
            detail: self.file_detail(hash),
            ignored: self.is_ignored(hash),
        }
    }

    fn card<'a>(&'a self, position: usize, group: &'a Proposal) -> GroupCard<'a> {
        GroupCard {
            position,
            group,
            band: group.band(),
            fully_ignored: self.is_fully_ignored(group),
            files: group.file_hashes.iter().map(|h| self.file_row(h)).collect(),
        }
    }

    /// Page `page` of the grouped proposals; out-of-range pages are clamped.
    pub fn page_view(&self, page: usize) -> PageView<'_> {
        let grouped: Vec<&Proposal> = self.grouped().collect();
        let total_grouped = grouped.len();
        let page = clamp_page(page, total_grouped);
        let start = page * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(total_grouped);

        let groups = grouped[start..end]
            .iter()
            .enumerate()
            .map(|(offset, &group)| self.card(start + offset, group))
            .collect();

        PageView {
            page,
            total_pages: total_pages(total_grouped),
            start,
            end,
            total_grouped,
            groups,
        }
    }

    /// Non-ungrouped, not fully ignored, confidence at or above the HIGH band.
    pub fn high_confidence(&self) -> Vec<&Proposal> {
        self.grouped()
            .filter(|g| g.confidence >= HIGH_CONFIDENCE && !self.is_fully_ignored(g))
            .collect()
    }

    /// Every file sitting in an ungrouped bucket, bucket by bucket.
    pub fn ungrouped_files(&self) -> Vec<UngroupedFile<'_>> {
        self.ungrouped()
            .flat_map(|bucket| {
                bucket.file_hashes.iter().map(move |hash| UngroupedFile {
                    bucket_id: bucket.id.as_str(),
                    row: self.file_row(hash),
                })
            })
            .collect()
    }

    pub fn ignored_files(&self) -> Vec<FileRow<'_>> {
        self.ignored().map(|hash| self.file_row(hash)).collect()
    }

    /// Groups `source_id` may be merged into, optionally narrowed by a
    /// case-insensitive name filter.
    pub fn merge_targets(&self, source_id: &str, filter: Option<&str>) -> Vec<&Proposal> {
        let needle = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        self.grouped()
            .filter(|g| g.id != source_id)
            .filter(|g| match &needle {
                Some(needle) => g.canonical_name.to_lowercase().contains(needle),
                None => true,
            })
            .collect()
    }

    /// Groups an ungrouped file may be assigned to.
    pub fn assign_targets(&self) -> Vec<&Proposal> {
        self.grouped().collect()
    }
}
