use git2::Repository;
use std::path::{Path, PathBuf};

use super::error::CollectionError;
use super::files::StagedSource;
use super::utils::{CappedOutput, run_git_capped, run_git_command};
use crate::log_debug;

const NAME_STATUS_ARGS: &[&str] = &[
    "diff",
    "--cached",
    "--no-color",
    "--no-ext-diff",
    "-M",
    "--name-status",
    "-z",
];
const BULK_DIFF_ARGS: &[&str] = &["diff", "--cached", "--no-color", "--no-ext-diff", "-M"];
const NUMSTAT_ARGS: &[&str] = &[
    "diff",
    "--cached",
    "--no-color",
    "--no-ext-diff",
    "-M",
    "--numstat",
    "-z",
];

/// A local Git repository, located by discovery from any path inside it.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
    git_dir: PathBuf,
}

impl GitRepo {
    /// Discovers the repository containing `path`.
    ///
    /// Bare repositories are rejected since they have no staging area to read.
    pub fn discover(path: &Path) -> Result<Self, CollectionError> {
        let no_repo = || CollectionError::NoRepository {
            path: path.to_path_buf(),
        };
        let repo = Repository::discover(path).map_err(|e| {
            log_debug!("Repository discovery failed for {}: {}", path.display(), e);
            no_repo()
        })?;
        let root = repo.workdir().ok_or_else(no_repo)?.to_path_buf();
        let git_dir = repo.path().to_path_buf();

        log_debug!("Discovered repository at {}", root.display());
        Ok(Self { root, git_dir })
    }

    /// Working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.git` directory (or the worktree's private git dir)
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Current branch name, or `None` for a detached or unborn HEAD
    pub fn current_branch(&self) -> Option<String> {
        run_git_command(&self.root, &["symbolic-ref", "--short", "-q", "HEAD"])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    /// Subjects of the last `count` commits, newest first; empty on an unborn branch
    pub fn recent_commit_subjects(&self, count: usize) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }
        let limit = format!("-n{count}");
        run_git_command(&self.root, &["log", &limit, "--format=%s"])
            .map(|out| {
                out.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl StagedSource for GitRepo {
    fn name_status(&self) -> Result<String, CollectionError> {
        run_git_command(&self.root, NAME_STATUS_ARGS)
    }

    fn bulk_diff(&self, max_bytes: usize) -> Result<CappedOutput, CollectionError> {
        run_git_capped(&self.root, BULK_DIFF_ARGS, max_bytes)
    }

    fn file_diff(&self, path: &str) -> Result<String, CollectionError> {
        let mut args = BULK_DIFF_ARGS.to_vec();
        args.extend(["--", path]);
        run_git_command(&self.root, &args)
    }

    fn numstat(&self) -> Result<String, CollectionError> {
        run_git_command(&self.root, NUMSTAT_ARGS)
    }
}
