use git_quill::commit::{Category, CommitMessageService, PipelineError, Preparation, PreparedInvocation};
use git_quill::config::Config;
use git_quill::git::{CollectionError, DiffCollector, GitRepo};
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

use test_utils::{
    commit_staged, numbered_lines, setup_git_repo, stage_file, stage_paths, stage_removal,
};

fn prepare_with(root: &Path, config: Config) -> Preparation {
    CommitMessageService::new(config, root)
        .expect("Failed to create service")
        .prepare()
        .expect("Failed to prepare")
}

fn prepared(root: &Path, config: Config) -> PreparedInvocation {
    match prepare_with(root, config) {
        Preparation::Ready(prepared) => prepared,
        Preparation::NoChanges => panic!("expected staged changes"),
    }
}

#[test]
fn test_nothing_staged_is_not_an_error() {
    let (temp_dir, _repo) = setup_git_repo();
    assert!(matches!(
        prepare_with(temp_dir.path(), Config::default()),
        Preparation::NoChanges
    ));
}

#[test]
fn test_outside_a_repository_fails_with_collection_error() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let missing = temp_dir.path().join("nowhere");
    std::fs::create_dir_all(&missing).expect("Failed to create directory");

    // A temp dir may itself sit inside a checkout; only assert when it does not
    if GitRepo::discover(&missing).is_err() {
        let result = CommitMessageService::new(Config::default(), &missing);
        assert!(matches!(
            result,
            Err(PipelineError::Collection(CollectionError::NoRepository { .. }))
        ));
    }
}

#[test]
fn test_mixed_changeset_gets_one_entry_per_file() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();

    stage_file(root, "A.ts", numbered_lines("export const a =", 10).as_bytes());
    stage_file(root, "D.ts", b"export const d = 1;\n");
    commit_staged(root, "Add sources");

    stage_file(root, "A.ts", numbered_lines("export const b =", 10).as_bytes());
    let png: Vec<u8> = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0xff, 0x00]
        .repeat(8);
    stage_file(root, "B.png", &png);
    stage_file(root, "package-lock.json", b"{\n  \"lockfileVersion\": 3\n}\n");
    stage_removal(root, "D.ts");

    let prepared = prepared(root, Config::default());
    let files = prepared.bundle.files();
    assert!(!prepared.bundle.is_degraded());
    assert_eq!(files.len(), 4);

    let by_path = |path: &str| {
        files
            .iter()
            .find(|f| f.relative_path == path)
            .unwrap_or_else(|| panic!("missing entry for {path}"))
    };

    let a = by_path("A.ts");
    assert_eq!(a.category, Category::Content);
    assert!(a.entry_text.contains("+export const b = 10"));
    assert_eq!(a.additions, 10);
    assert_eq!(a.deletions, 10);

    assert_eq!(by_path("B.png").category, Category::Binary);
    assert_eq!(by_path("B.png").entry_text, "[binary changed] B.png");
    assert_eq!(by_path("package-lock.json").category, Category::Lockfile);
    assert_eq!(by_path("D.ts").category, Category::Deleted);
    assert_eq!(by_path("D.ts").entry_text, "[deleted] D.ts");

    for file in files.iter().filter(|f| f.category != Category::Content) {
        assert_eq!(file.entry_text.lines().count(), 1);
    }
}

#[test]
fn test_every_staged_path_appears_exactly_once() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();

    let mut expected = HashSet::new();
    for i in 0..30 {
        let path = format!("src/module_{i:02}.rs");
        stage_file(root, &path, format!("pub fn f{i}() {{}}\n").as_bytes());
        expected.insert(path);
    }
    stage_file(root, "Cargo.lock", b"# lock\n");
    expected.insert("Cargo.lock".to_string());

    let prepared = prepared(root, Config::default());
    let paths = prepared.bundle.paths();
    let unique: HashSet<String> = paths.iter().map(|p| (*p).to_string()).collect();

    assert_eq!(paths.len(), expected.len());
    assert_eq!(unique, expected);
}

#[test]
fn test_rename_reports_destination_as_added() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();

    let body = numbered_lines("line", 40);
    stage_file(root, "old_name.txt", body.as_bytes());
    commit_staged(root, "Add file");

    std::fs::rename(root.join("old_name.txt"), root.join("new_name.txt"))
        .expect("Failed to rename");
    let repo = git2::Repository::open(root).expect("Failed to open repository");
    let mut index = repo.index().expect("Failed to get index");
    index
        .remove_path(Path::new("old_name.txt"))
        .expect("Failed to remove old path");
    index.write().expect("Failed to write index");
    stage_paths(root, &["new_name.txt"]);

    let collector = DiffCollector::new(GitRepo::discover(root).expect("repo"), 1 << 20);
    let snapshot = collector.collect().expect("collect").expect("changes");

    assert_eq!(snapshot.entries.len(), 1);
    let entry = &snapshot.entries[0];
    assert_eq!(entry.path, "new_name.txt");
    assert_eq!(entry.original_path.as_deref(), Some("old_name.txt"));
    assert_eq!(entry.change_type.to_string(), "added");
}

#[test]
fn test_paths_with_spaces_and_non_ascii() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();

    stage_file(root, "docs/release notes.md", b"# Notes\n\nFirst entry\n");
    stage_file(root, "docs/café b/menu.md", b"- coffee\n");

    let prepared = prepared(root, Config::default());
    let files = prepared.bundle.files();
    assert_eq!(files.len(), 2);

    for file in files {
        assert_eq!(file.category, Category::Content);
        assert!(
            file.entry_text.lines().count() > 1,
            "no diff content for {}",
            file.relative_path
        );
    }
    let paths: HashSet<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert!(paths.contains("docs/release notes.md"));
    assert!(paths.contains("docs/café b/menu.md"));
}

#[test]
fn test_new_file_truncation_keeps_head_and_tail() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();
    stage_file(root, "big.txt", numbered_lines("row", 200).as_bytes());

    let prepared = prepared(root, Config::default());
    let entry = &prepared.bundle.files()[0].entry_text;
    let lines: Vec<&str> = entry.lines().collect();

    // Header block is kept whole, ending with the hunk line
    let hunk = lines
        .iter()
        .position(|l| l.starts_with("@@"))
        .expect("hunk header");
    assert!(lines[1].starts_with("diff --git a/big.txt b/big.txt"));

    let body = &lines[hunk + 1..];
    let marker = body
        .iter()
        .position(|l| l.contains("lines skipped"))
        .expect("skip marker");
    assert_eq!(marker, 25);
    assert_eq!(body[marker], "... [150 lines skipped] ...");
    assert_eq!(body.len() - marker - 1, 25);
    assert_eq!(body[0], "+row 1");
    assert_eq!(body[24], "+row 25");
    assert_eq!(body[26], "+row 176");
    assert_eq!(body.last().copied(), Some("+row 200"));
}

#[test]
fn test_new_file_under_threshold_is_kept_whole() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();
    stage_file(root, "new.txt", numbered_lines("row", 46).as_bytes());

    let prepared = prepared(root, Config::default());
    let entry = &prepared.bundle.files()[0].entry_text;

    assert!(!entry.contains("lines skipped"));
    let rows = entry.lines().filter(|l| l.starts_with("+row ")).count();
    assert_eq!(rows, 46);
}

#[test]
fn test_diff_overflow_degrades_to_numstat_summary() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();
    stage_file(root, "a.txt", numbered_lines("alpha", 50).as_bytes());
    stage_file(root, "b.txt", numbered_lines("beta", 50).as_bytes());

    let mut config = Config::default();
    config.budget.max_diff_bytes = 64;
    let prepared = prepared(root, config);

    assert!(prepared.bundle.is_degraded());
    let summary = prepared.bundle.summary().expect("summary");
    assert_eq!(summary.total_additions(), 100);
    assert!(!prepared.prompt.user.contains("alpha 1"));
}

#[test]
fn test_file_count_ceiling_degrades() {
    let (temp_dir, _repo) = setup_git_repo();
    let root = temp_dir.path();
    for i in 0..12 {
        stage_file(root, &format!("f{i}.txt"), b"x\n");
    }

    let mut config = Config::default();
    config.budget.max_staged_files = 10;
    let prepared = prepared(root, config);

    assert!(prepared.bundle.is_degraded());
    assert_eq!(prepared.bundle.file_count(), 12);
    assert!(prepared.prompt.user.contains("12 files changed"));
}
