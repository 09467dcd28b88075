//! Pending commit message slot
//!
//! The only write the pipeline performs: the chosen message replaces whatever
//! the slot held before.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::git::GitRepo;
use crate::log_debug;

/// Destination for the selected commit message
pub trait MessageSlot {
    /// Replaces the slot's contents with `message`
    fn write(&self, message: &str) -> Result<()>;

    /// Human-readable location, for status output
    fn describe(&self) -> String;
}

/// A message file inside the repository's git dir, such as `COMMIT_EDITMSG`
pub struct GitMessageFile {
    path: PathBuf,
}

impl GitMessageFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolves `file_name` inside the git dir of `repo`
    pub fn for_repo(repo: &GitRepo, file_name: &str) -> Self {
        Self::new(repo.git_dir().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageSlot for GitMessageFile {
    fn write(&self, message: &str) -> Result<()> {
        let dir = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;

        let mut contents = message.trim_end().to_string();
        contents.push('\n');

        // Write beside the target and rename over it so readers never see a partial file
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        temp.write_all(contents.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        log_debug!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_overwrites_previous_message() {
        let dir = TempDir::new().expect("temp dir");
        let slot = GitMessageFile::new(dir.path().join("COMMIT_EDITMSG"));

        slot.write("first message\n\nwith a body that is longer").expect("write");
        slot.write("fix: second").expect("write");

        let contents = fs::read_to_string(slot.path()).expect("read");
        assert_eq!(contents, "fix: second\n");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let slot = GitMessageFile::new(dir.path().join("absent").join("COMMIT_EDITMSG"));
        assert!(slot.write("msg").is_err());
    }
}
