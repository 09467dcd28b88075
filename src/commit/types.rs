//! Per-invocation data model for the prompt side of the pipeline

use serde::Serialize;
use std::fmt::Write;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::context::ChangeType;
use crate::git::LineStats;

/// Content category of a staged file. Only `Content` ever carries diff text.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Deleted,
    Lockfile,
    Binary,
    Generated,
    Content,
}

/// One staged file and the text block it contributes to the prompt
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub relative_path: String,
    pub change_type: ChangeType,
    pub category: Category,
    pub entry_text: String,
    /// Zero for every category except `Content`
    pub additions: usize,
    /// Zero for every category except `Content`
    pub deletions: usize,
    pub char_count: usize,
}

impl FileChange {
    pub fn new(
        relative_path: String,
        change_type: ChangeType,
        category: Category,
        entry_text: String,
        stats: LineStats,
    ) -> Self {
        let (additions, deletions) = if category == Category::Content {
            (stats.additions, stats.deletions)
        } else {
            (0, 0)
        };
        let char_count = entry_text.chars().count();
        Self {
            relative_path,
            change_type,
            category,
            entry_text,
            additions,
            deletions,
            char_count,
        }
    }
}

/// One line of a degraded bundle's summary
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    pub path: String,
    pub change_type: ChangeType,
    pub stats: LineStats,
}

/// File-level summary used when the changeset is too large to show as diffs
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StatSummary {
    pub entries: Vec<StatEntry>,
}

impl StatSummary {
    pub fn total_additions(&self) -> usize {
        self.entries.iter().map(|e| e.stats.additions).sum()
    }

    pub fn total_deletions(&self) -> usize {
        self.entries.iter().map(|e| e.stats.deletions).sum()
    }

    /// Renders paths and line deltas only; never any diff content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} files changed, {} insertions(+), {} deletions(-)",
            self.entries.len(),
            self.total_additions(),
            self.total_deletions()
        );
        for entry in &self.entries {
            let delta = if entry.stats.binary {
                "binary".to_string()
            } else {
                format!("+{} -{}", entry.stats.additions, entry.stats.deletions)
            };
            let _ = writeln!(out, "{} {} | {}", entry.change_type, entry.path, delta);
        }
        out
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
enum BundleBody {
    Detailed(Vec<FileChange>),
    Degraded(StatSummary),
}

/// Budgeted view of a changeset: either per-file entries or, when degraded,
/// a single stat summary with no per-file diff content.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DiffBundle {
    body: BundleBody,
}

impl DiffBundle {
    pub fn detailed(files: Vec<FileChange>) -> Self {
        Self {
            body: BundleBody::Detailed(files),
        }
    }

    pub fn degraded(summary: StatSummary) -> Self {
        Self {
            body: BundleBody::Degraded(summary),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.body, BundleBody::Degraded(_))
    }

    /// Per-file entries; empty for a degraded bundle
    pub fn files(&self) -> &[FileChange] {
        match &self.body {
            BundleBody::Detailed(files) => files,
            BundleBody::Degraded(_) => &[],
        }
    }

    pub fn summary(&self) -> Option<&StatSummary> {
        match &self.body {
            BundleBody::Detailed(_) => None,
            BundleBody::Degraded(summary) => Some(summary),
        }
    }

    /// Every path the bundle accounts for, in collector order
    pub fn paths(&self) -> Vec<&str> {
        match &self.body {
            BundleBody::Detailed(files) => files.iter().map(|f| f.relative_path.as_str()).collect(),
            BundleBody::Degraded(summary) => {
                summary.entries.iter().map(|e| e.path.as_str()).collect()
            }
        }
    }

    pub fn file_count(&self) -> usize {
        match &self.body {
            BundleBody::Detailed(files) => files.len(),
            BundleBody::Degraded(summary) => summary.entries.len(),
        }
    }
}
