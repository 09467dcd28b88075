use serde::Serialize;
use std::collections::HashMap;

use super::diff_split::index_fragments;
use super::error::CollectionError;
use super::utils::CappedOutput;
use crate::context::ChangeType;
use crate::log_debug;

/// Read-only queries the collector needs from a repository.
///
/// `GitRepo` answers these by spawning `git`; tests substitute canned output.
pub trait StagedSource {
    /// NUL-separated `git diff --cached --name-status -z` output
    fn name_status(&self) -> Result<String, CollectionError>;
    /// Full staged patch, read under a byte cap
    fn bulk_diff(&self, max_bytes: usize) -> Result<CappedOutput, CollectionError>;
    /// Staged patch for a single path
    fn file_diff(&self, path: &str) -> Result<String, CollectionError>;
    /// NUL-separated `git diff --cached --numstat -z` output
    fn numstat(&self) -> Result<String, CollectionError>;
}

/// One staged path as reported by the status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub path: String,
    /// Raw status code, e.g. `M`, `A`, `R100`
    pub status_code: String,
    pub change_type: ChangeType,
    /// Source path for renames and copies
    pub original_path: Option<String>,
}

/// Added/removed line counts for one path
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub additions: usize,
    pub deletions: usize,
    pub binary: bool,
}

impl LineStats {
    /// Counts `+`/`-` lines of a unified diff fragment. Lines before the
    /// first `@@` are file headers and never counted.
    pub fn from_fragment(fragment: &str) -> Self {
        let mut stats = Self {
            binary: super::utils::is_binary_diff(fragment),
            ..Self::default()
        };
        let hunks = fragment
            .lines()
            .skip_while(|line| !line.starts_with("@@"));
        for line in hunks {
            if line.starts_with('+') {
                stats.additions += 1;
            } else if line.starts_with('-') {
                stats.deletions += 1;
            }
        }
        stats
    }
}

/// A point-in-time view of the staged changes
#[derive(Debug, Clone)]
pub struct StagedSnapshot {
    pub entries: Vec<StagedEntry>,
    fragments: HashMap<String, String>,
    /// Present only when the bulk diff overflowed its cap
    numstat: Option<HashMap<String, LineStats>>,
}

impl StagedSnapshot {
    pub fn new(entries: Vec<StagedEntry>, diff: &str) -> Self {
        Self {
            entries,
            fragments: index_fragments(diff),
            numstat: None,
        }
    }

    /// True when the bulk diff was cut short by the byte cap
    pub fn overflowed(&self) -> bool {
        self.numstat.is_some()
    }

    pub fn fragment(&self, path: &str) -> Option<&str> {
        self.fragments.get(path).map(String::as_str)
    }

    /// Line statistics for a path, from numstat when the diff overflowed
    pub fn stats_for(&self, path: &str) -> LineStats {
        if let Some(numstat) = &self.numstat {
            return numstat.get(path).copied().unwrap_or_default();
        }
        self.fragment(path)
            .map(LineStats::from_fragment)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects staged paths and the bulk diff with a fixed number of git calls
pub struct DiffCollector<S> {
    source: S,
    max_diff_bytes: usize,
}

impl<S: StagedSource> DiffCollector<S> {
    pub fn new(source: S, max_diff_bytes: usize) -> Self {
        Self {
            source,
            max_diff_bytes,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns `None` when nothing is staged.
    ///
    /// Issues exactly one status query and one bulk diff query. A numstat query
    /// is added only if the bulk diff overflows its cap.
    pub fn collect(&self) -> Result<Option<StagedSnapshot>, CollectionError> {
        let entries = parse_name_status(&self.source.name_status()?)?;
        if entries.is_empty() {
            log_debug!("No staged changes");
            return Ok(None);
        }

        let diff = self.source.bulk_diff(self.max_diff_bytes)?;
        let mut snapshot = StagedSnapshot::new(entries, &diff.text);

        if diff.overflowed {
            log_debug!(
                "Bulk diff exceeded {} bytes, falling back to numstat",
                self.max_diff_bytes
            );
            snapshot.numstat = Some(parse_numstat(&self.source.numstat()?));
        }

        log_debug!(
            "Collected {} staged files, {} diff fragments",
            snapshot.entries.len(),
            snapshot.fragments.len()
        );
        Ok(Some(snapshot))
    }

    /// Returns the diff fragment for `path`, falling back to a single-file
    /// query only when the bulk diff produced nothing for it.
    pub fn fragment_for(
        &self,
        snapshot: &StagedSnapshot,
        path: &str,
    ) -> Result<String, CollectionError> {
        if let Some(fragment) = snapshot.fragment(path) {
            return Ok(fragment.to_string());
        }
        log_debug!("No bulk fragment for {}, querying individually", path);
        self.source.file_diff(path)
    }
}

/// Parses `--name-status -z` output into entries in git's order.
///
/// Records are `STATUS\0PATH\0`, or `STATUS\0OLD\0NEW\0` for renames/copies.
pub fn parse_name_status(raw: &str) -> Result<Vec<StagedEntry>, CollectionError> {
    let invalid = |detail: String| CollectionError::InvalidOutput {
        command: "diff --cached --name-status".to_string(),
        detail,
    };

    let mut tokens = raw.split('\0').filter(|t| !t.is_empty());
    let mut entries = Vec::new();

    while let Some(code) = tokens.next() {
        let code = code.trim();
        let change_type = ChangeType::from_status_code(code)
            .ok_or_else(|| invalid(format!("unknown status code '{code}'")))?;
        let first = tokens
            .next()
            .ok_or_else(|| invalid(format!("missing path after '{code}'")))?;

        let entry = if code.starts_with('R') || code.starts_with('C') {
            let destination = tokens
                .next()
                .ok_or_else(|| invalid(format!("missing destination for '{first}'")))?;
            StagedEntry {
                path: destination.to_string(),
                status_code: code.to_string(),
                change_type,
                original_path: Some(first.to_string()),
            }
        } else {
            StagedEntry {
                path: first.to_string(),
                status_code: code.to_string(),
                change_type,
                original_path: None,
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

/// Parses `--numstat -z` output. Binary files report `-` for both counts.
pub fn parse_numstat(raw: &str) -> HashMap<String, LineStats> {
    let mut stats = HashMap::new();
    let mut tokens = raw.split('\0');

    while let Some(record) = tokens.next() {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }
        let mut fields = record.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        // Renames leave the path field empty and follow with OLD\0NEW
        let path = if path.is_empty() {
            let _old = tokens.next();
            match tokens.next() {
                Some(new) => new.to_string(),
                None => continue,
            }
        } else {
            path.to_string()
        };

        let binary = added == "-" && deleted == "-";
        stats.insert(
            path,
            LineStats {
                additions: added.parse().unwrap_or(0),
                deletions: deleted.parse().unwrap_or(0),
                binary,
            },
        );
    }

    stats
}
