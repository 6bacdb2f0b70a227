// Proposal data model shared by the store, the projection and the batch builder.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Groups at or above this confidence are offered for one-click approval.
pub const HIGH_CONFIDENCE: f64 = 0.85;

/// Lower bound of the MEDIUM band.
pub const MEDIUM_CONFIDENCE: f64 = 0.65;

/// A candidate cluster of files believed to be variants of one project.
///
/// Deserializes from the grouping backend's export as-is; `file_hashes`
/// reference [`FileDetail`] records owned outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub canonical_name: String,
    pub confidence: f64,
    pub file_hashes: Vec<String>,
    #[serde(default)]
    pub is_ungrouped: bool,
}

impl Proposal {
    pub fn new(
        id: impl Into<String>,
        canonical_name: impl Into<String>,
        confidence: f64,
        file_hashes: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            canonical_name: canonical_name.into(),
            confidence,
            file_hashes,
            is_ungrouped: false,
        }
    }

    /// Catch-all bucket for files the clustering could not place.
    pub fn ungrouped(id: impl Into<String>, file_hashes: Vec<String>) -> Self {
        Self {
            id: id.into(),
            canonical_name: "Ungrouped".to_string(),
            confidence: 0.0,
            file_hashes,
            is_ungrouped: true,
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.file_hashes.iter().any(|h| h == hash)
    }

    pub fn len(&self) -> usize {
        self.file_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_hashes.is_empty()
    }

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < MEDIUM_CONFIDENCE {
            ConfidenceBand::Low
        } else if confidence < HIGH_CONFIDENCE {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::Low => "LOW",
            ConfidenceBand::Medium => "MEDIUM",
            ConfidenceBand::High => "HIGH",
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Confidence as a rounded whole percentage.
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence * 100.0).round() as u32
}

/// Per-file record produced by the scanner. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    pub hash: String,
    pub path: String,
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub mtime: Option<i64>,
}

impl FileDetail {
    pub fn file_name(&self) -> String {
        display_name(Some(&self.path), &self.hash)
    }

    pub fn bpm_label(&self) -> String {
        match self.bpm {
            Some(bpm) => format!("{:.0}", bpm),
            None => "\u{2014}".to_string(),
        }
    }

    pub fn date_label(&self) -> String {
        format_mtime(self.mtime)
    }
}

/// Last path component, or the hash itself when no path is known.
///
/// Splits on both `/` and `\` whatever the host, since scanned paths
/// often come from Windows machines.
pub fn display_name(path: Option<&str>, hash: &str) -> String {
    match path {
        Some(p) if !p.is_empty() => match p.rsplit(['/', '\\']).next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => p.to_string(),
        },
        _ => hash.to_string(),
    }
}

pub fn format_mtime(mtime: Option<i64>) -> String {
    mtime
        .filter(|secs| *secs != 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

/// One entry of the batch sent to the persistence collaborator.
///
/// `file_hashes` holds only the active (non-ignored) members; the
/// opted-out members travel separately in `ignored_hashes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub canonical_name: String,
    pub file_hashes: Vec<String>,
    pub ignored_hashes: Vec<String>,
}
