//! Whole-changeset size limits with fallback to a stat summary

use std::fmt;

use super::classify::DiffClassifier;
use super::types::{DiffBundle, FileChange, StatEntry, StatSummary};
use crate::config::BudgetConfig;
use crate::git::{CollectionError, DiffCollector, StagedEntry, StagedSnapshot, StagedSource};
use crate::log_debug;

/// Separator placed between entries when the prompt is assembled
pub const ENTRY_SEPARATOR: &str = "\n";

/// Why a bundle was degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// More staged files than `max_staged_files`; nothing was classified
    FileCount { count: usize, ceiling: usize },
    /// The bulk diff hit its byte cap; nothing was classified
    DiffOverflow,
    /// Adding the entry for the file at `index` would exceed `max_prompt_chars`
    Size {
        index: usize,
        projected: usize,
        max: usize,
    },
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileCount { count, ceiling } => {
                write!(f, "{count} staged files exceeds the limit of {ceiling}")
            }
            Self::DiffOverflow => write!(f, "staged diff exceeds the read limit"),
            Self::Size {
                projected, max, ..
            } => write!(f, "diff entries would reach {projected} characters (limit {max})"),
        }
    }
}

/// What the budgeter produced, plus how it got there
#[derive(Debug, Clone)]
pub struct BudgetOutcome {
    pub bundle: DiffBundle,
    pub reason: Option<DegradeReason>,
    /// Characters of accumulated entries, separators included
    pub total_chars: usize,
}

pub struct ChunkBudgeter<'a> {
    budget: &'a BudgetConfig,
}

impl<'a> ChunkBudgeter<'a> {
    pub fn new(budget: &'a BudgetConfig) -> Self {
        Self { budget }
    }

    /// Classifies every staged file in collector order unless a breaker fires.
    pub fn build<S: StagedSource>(
        &self,
        collector: &DiffCollector<S>,
        snapshot: &StagedSnapshot,
    ) -> Result<BudgetOutcome, CollectionError> {
        let classifier = DiffClassifier::new(collector, self.budget);
        self.fit(snapshot, |entry| classifier.classify(snapshot, entry))
    }

    /// Runs both breakers around a per-entry classification step.
    ///
    /// The file-count and overflow checks happen before `classify` is called
    /// for any entry. The size check happens before each entry is kept, so an
    /// oversized total is never accumulated.
    pub fn fit<E>(
        &self,
        snapshot: &StagedSnapshot,
        mut classify: impl FnMut(&StagedEntry) -> Result<FileChange, E>,
    ) -> Result<BudgetOutcome, E> {
        let count = snapshot.len();
        if count > self.budget.max_staged_files {
            return Ok(degrade(
                snapshot,
                DegradeReason::FileCount {
                    count,
                    ceiling: self.budget.max_staged_files,
                },
            ));
        }
        if snapshot.overflowed() {
            return Ok(degrade(snapshot, DegradeReason::DiffOverflow));
        }

        let max = self.budget.max_prompt_chars;
        let separator = ENTRY_SEPARATOR.chars().count();
        let mut total = 0usize;
        let mut files: Vec<FileChange> = Vec::with_capacity(count);

        for (index, entry) in snapshot.entries.iter().enumerate() {
            let change = classify(entry)?;
            let joint = if files.is_empty() { 0 } else { separator };
            let projected = total + joint + change.char_count;
            if projected > max {
                return Ok(degrade(
                    snapshot,
                    DegradeReason::Size {
                        index,
                        projected,
                        max,
                    },
                ));
            }
            total = projected;
            files.push(change);
        }

        Ok(BudgetOutcome {
            bundle: DiffBundle::detailed(files),
            reason: None,
            total_chars: total,
        })
    }
}

/// Stat summary covering every staged path, in collector order
pub fn summarize(snapshot: &StagedSnapshot) -> StatSummary {
    StatSummary {
        entries: snapshot
            .entries
            .iter()
            .map(|entry| StatEntry {
                path: entry.path.clone(),
                change_type: entry.change_type,
                stats: snapshot.stats_for(&entry.path),
            })
            .collect(),
    }
}

fn degrade(snapshot: &StagedSnapshot, reason: DegradeReason) -> BudgetOutcome {
    log_debug!("Degrading to stat summary: {}", reason);
    let summary = summarize(snapshot);
    let total_chars = summary.render().chars().count();
    BudgetOutcome {
        bundle: DiffBundle::degraded(summary),
        reason: Some(reason),
        total_chars,
    }
}
