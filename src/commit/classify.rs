//! Table-driven classification of staged files into prompt entries

use std::path::Path;

use super::types::{Category, FileChange};
use crate::config::BudgetConfig;
use crate::context::ChangeType;
use crate::git::{CollectionError, DiffCollector, StagedEntry, StagedSnapshot, StagedSource};
use crate::git::is_binary_diff;

/// Dependency lock files, matched on the file name
const LOCKFILE_NAMES: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "Gemfile.lock",
    "composer.lock",
    "poetry.lock",
    "Pipfile.lock",
    "uv.lock",
    "go.sum",
    "flake.lock",
    "mix.lock",
    "pubspec.lock",
    "Podfile.lock",
    "packages.lock.json",
];

/// Binary and asset extensions, lowercase without the dot
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "psd", "svgz", "mp3", "mp4",
    "wav", "ogg", "flac", "avi", "mov", "mkv", "webm", "pdf", "zip", "gz", "tgz", "bz2", "xz",
    "7z", "rar", "tar", "jar", "war", "exe", "dll", "so", "dylib", "a", "o", "class", "pyc",
    "wasm", "bin", "dat", "db", "sqlite", "ttf", "otf", "woff", "woff2", "eot",
];

/// Suffixes of minified or generated artifacts
const GENERATED_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".js.map", ".css.map", ".map"];

/// One row of the classification table
pub struct ClassifierRule {
    pub category: Category,
    pub matches: fn(&StagedEntry) -> bool,
}

/// Rules in priority order. The first match wins; anything unmatched is content.
pub const RULES: &[ClassifierRule] = &[
    ClassifierRule {
        category: Category::Deleted,
        matches: is_deleted,
    },
    ClassifierRule {
        category: Category::Lockfile,
        matches: is_lockfile,
    },
    ClassifierRule {
        category: Category::Binary,
        matches: has_binary_extension,
    },
    ClassifierRule {
        category: Category::Generated,
        matches: is_generated,
    },
];

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_deleted(entry: &StagedEntry) -> bool {
    entry.change_type == ChangeType::Deleted
}

fn is_lockfile(entry: &StagedEntry) -> bool {
    LOCKFILE_NAMES.contains(&file_name(&entry.path))
}

fn has_binary_extension(entry: &StagedEntry) -> bool {
    Path::new(&entry.path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn is_generated(entry: &StagedEntry) -> bool {
    let name = file_name(&entry.path).to_ascii_lowercase();
    GENERATED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Category from the table alone, before any diff text is looked at
pub fn category_for(entry: &StagedEntry) -> Category {
    RULES
        .iter()
        .find(|rule| (rule.matches)(entry))
        .map_or(Category::Content, |rule| rule.category)
}

/// One-line entry for every category that never carries content
pub fn marker_entry(category: Category, path: &str) -> Option<String> {
    match category {
        Category::Deleted => Some(format!("[deleted] {path}")),
        Category::Lockfile => Some(format!("[lockfile changed] {path}")),
        Category::Binary => Some(format!("[binary changed] {path}")),
        Category::Generated => Some(format!("[generated file changed] {path}")),
        Category::Content => None,
    }
}

fn binary_marker(path: &str) -> String {
    format!("[binary changed] {path}")
}

/// Result of applying the head/tail policy to a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    /// Lines dropped between head and tail; zero when nothing was cut
    pub skipped: usize,
}

/// Keeps the first `head` and last `tail` lines when `text` has more than
/// `head + tail` lines, with a skip marker in between.
pub fn truncate_lines(text: &str, head: usize, tail: usize) -> Truncated {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len();
    if total <= head + tail {
        return Truncated {
            text: text.to_string(),
            skipped: 0,
        };
    }

    let skipped = total - head - tail;
    let mut out = Vec::with_capacity(head + tail + 1);
    out.extend_from_slice(&lines[..head]);
    let marker = skip_marker(skipped);
    out.push(marker.as_str());
    out.extend_from_slice(&lines[total - tail..]);

    let mut text = out.join("\n");
    text.push('\n');
    Truncated { text, skipped }
}

/// Splits a file fragment after its first `@@` line. Everything before the
/// split is header and never truncated. A fragment without hunks is all header.
pub fn split_hunk_header(fragment: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in fragment.split_inclusive('\n') {
        offset += line.len();
        if line.starts_with("@@") {
            return fragment.split_at(offset);
        }
    }
    (fragment, "")
}

pub fn skip_marker(skipped: usize) -> String {
    format!("... [{skipped} lines skipped] ...")
}

/// Assigns categories and builds per-file entries for one snapshot
pub struct DiffClassifier<'a, S> {
    collector: &'a DiffCollector<S>,
    budget: &'a BudgetConfig,
}

impl<'a, S: StagedSource> DiffClassifier<'a, S> {
    pub fn new(collector: &'a DiffCollector<S>, budget: &'a BudgetConfig) -> Self {
        Self { collector, budget }
    }

    pub fn classify(
        &self,
        snapshot: &StagedSnapshot,
        entry: &StagedEntry,
    ) -> Result<FileChange, CollectionError> {
        let path = entry.path.clone();
        let stats = snapshot.stats_for(&entry.path);

        let category = category_for(entry);
        if let Some(text) = marker_entry(category, &path) {
            return Ok(FileChange::new(path, entry.change_type, category, text, stats));
        }

        let fragment = self.collector.fragment_for(snapshot, &entry.path)?;
        if is_binary_diff(&fragment) {
            let text = binary_marker(&path);
            return Ok(FileChange::new(
                path,
                entry.change_type,
                Category::Binary,
                text,
                stats,
            ));
        }

        let (head, tail) = self.head_tail(entry.change_type);
        let (header, body) = split_hunk_header(&fragment);
        let truncated = truncate_lines(body, head, tail);
        let text = format!(
            "=== {} ({}) ===\n{}{}",
            entry.path, entry.change_type, header, truncated.text
        );
        Ok(FileChange::new(
            path,
            entry.change_type,
            Category::Content,
            text,
            stats,
        ))
    }

    fn head_tail(&self, change_type: ChangeType) -> (usize, usize) {
        match change_type {
            ChangeType::Added => (self.budget.added_head(), self.budget.added_tail()),
            _ => (self.budget.modified_head(), self.budget.modified_tail()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::CappedOutput;

    fn entry(path: &str, change_type: ChangeType) -> StagedEntry {
        StagedEntry {
            path: path.to_string(),
            status_code: String::new(),
            change_type,
            original_path: None,
        }
    }

    struct FixedSource(String);

    impl StagedSource for FixedSource {
        fn name_status(&self) -> Result<String, CollectionError> {
            Ok(String::new())
        }

        fn bulk_diff(&self, _max_bytes: usize) -> Result<CappedOutput, CollectionError> {
            Ok(CappedOutput {
                text: self.0.clone(),
                overflowed: false,
            })
        }

        fn file_diff(&self, _path: &str) -> Result<String, CollectionError> {
            Ok(String::new())
        }

        fn numstat(&self) -> Result<String, CollectionError> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_rule_priority() {
        assert_eq!(
            category_for(&entry("package-lock.json", ChangeType::Deleted)),
            Category::Deleted
        );
        assert_eq!(
            category_for(&entry("web/package-lock.json", ChangeType::Modified)),
            Category::Lockfile
        );
        assert_eq!(
            category_for(&entry("assets/Logo.PNG", ChangeType::Added)),
            Category::Binary
        );
        assert_eq!(
            category_for(&entry("dist/app.min.js", ChangeType::Modified)),
            Category::Generated
        );
        assert_eq!(
            category_for(&entry("dist/app.js.map", ChangeType::Modified)),
            Category::Generated
        );
        assert_eq!(
            category_for(&entry("src/main.rs", ChangeType::Modified)),
            Category::Content
        );
    }

    #[test]
    fn test_truncate_exact_head_and_tail() {
        let text: String = (1..=120).map(|i| format!("line {i}\n")).collect();
        let truncated = truncate_lines(&text, 25, 25);
        let lines: Vec<&str> = truncated.text.lines().collect();

        assert_eq!(truncated.skipped, 70);
        assert_eq!(lines.len(), 51);
        assert_eq!(lines[0], "line 1");
        assert_eq!(lines[24], "line 25");
        assert_eq!(lines[25], skip_marker(70));
        assert_eq!(lines[26], "line 96");
        assert_eq!(lines[50], "line 120");
    }

    #[test]
    fn test_truncate_at_threshold_is_untouched() {
        let text: String = (1..=50).map(|i| format!("{i}\n")).collect();
        let truncated = truncate_lines(&text, 25, 25);
        assert_eq!(truncated.skipped, 0);
        assert_eq!(truncated.text, text);
    }

    #[test]
    fn test_added_and_modified_use_their_own_limits() {
        let body: String = (1..=600).map(|i| format!("+row {i}\n")).collect();
        let diff = format!(
            "diff --git a/new.rs b/new.rs\n@@ -0,0 +1,600 @@\n{body}\
             diff --git a/old.rs b/old.rs\n@@ -1,600 +1,600 @@\n{body}"
        );
        let collector = DiffCollector::new(FixedSource(diff.clone()), 1 << 20);
        let snapshot = StagedSnapshot::new(
            vec![entry("new.rs", ChangeType::Added), entry("old.rs", ChangeType::Modified)],
            &diff,
        );
        let budget = BudgetConfig::default();
        let classifier = DiffClassifier::new(&collector, &budget);

        let added = classifier
            .classify(&snapshot, &snapshot.entries[0])
            .expect("classify");
        assert!(added.entry_text.contains(&skip_marker(600 - 50)));
        assert!(added.entry_text.starts_with(
            "=== new.rs (added) ===\ndiff --git a/new.rs b/new.rs\n@@ -0,0 +1,600 @@\n+row 1\n"
        ));
        assert!(added.entry_text.contains("+row 25\n"));
        assert!(!added.entry_text.contains("+row 26\n"));
        assert!(added.entry_text.contains("+row 576\n"));

        let modified = classifier
            .classify(&snapshot, &snapshot.entries[1])
            .expect("classify");
        assert!(modified.entry_text.contains(&skip_marker(600 - 500)));
        assert!(modified.entry_text.contains("+row 450\n"));
        assert!(!modified.entry_text.contains("+row 451\n"));
        assert!(!modified.entry_text.contains("+row 550\n"));
        assert!(modified.entry_text.contains("+row 551\n"));
        assert_eq!(modified.additions, 600);
    }

    #[test]
    fn test_header_lines_do_not_count_toward_the_limit() {
        let body: String = (1..=46).map(|i| format!("+row {i}\n")).collect();
        let diff = format!(
            "diff --git a/small.txt b/small.txt\nnew file mode 100644\nindex 0000000..1111111\n\
             --- /dev/null\n+++ b/small.txt\n@@ -0,0 +1,46 @@\n{body}"
        );
        let collector = DiffCollector::new(FixedSource(diff.clone()), 1 << 20);
        let snapshot = StagedSnapshot::new(vec![entry("small.txt", ChangeType::Added)], &diff);
        let budget = BudgetConfig::default();
        let change = DiffClassifier::new(&collector, &budget)
            .classify(&snapshot, &snapshot.entries[0])
            .expect("classify");

        assert!(!change.entry_text.contains("lines skipped"));
        assert_eq!(change.entry_text, format!("=== small.txt (added) ===\n{diff}"));
        assert_eq!(change.additions, 46);
    }

    #[test]
    fn test_split_hunk_header() {
        let (header, body) = split_hunk_header("diff --git a/x b/x\n@@ -1 +1 @@\n-a\n+b\n");
        assert_eq!(header, "diff --git a/x b/x\n@@ -1 +1 @@\n");
        assert_eq!(body, "-a\n+b\n");

        let (header, body) = split_hunk_header("diff --git a/x b/x\nold mode 100644\n");
        assert_eq!(header, "diff --git a/x b/x\nold mode 100644\n");
        assert!(body.is_empty());
    }

    #[test]
    fn test_binary_fragment_never_leaks() {
        let diff = "diff --git a/blob b/blob\nindex 0000000..1111111\nBinary files /dev/null and b/blob differ\n";
        let collector = DiffCollector::new(FixedSource(diff.to_string()), 1 << 20);
        let snapshot = StagedSnapshot::new(vec![entry("blob", ChangeType::Added)], diff);
        let budget = BudgetConfig::default();
        let change = DiffClassifier::new(&collector, &budget)
            .classify(&snapshot, &snapshot.entries[0])
            .expect("classify");

        assert_eq!(change.category, Category::Binary);
        assert_eq!(change.entry_text, "[binary changed] blob");
        assert_eq!(change.additions, 0);
    }
}
