use std::path::PathBuf;

/// Failure to obtain a consistent view of the staged changes.
///
/// This is the only error class that aborts a generation invocation; it is
/// surfaced to the caller once and no partial output is produced.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("No Git repository found at or above {}", path.display())]
    NoRepository { path: PathBuf },
    #[error("`git {command}` exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    GitFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Unexpected output from `git {command}`: {detail}")]
    InvalidOutput { command: String, detail: String },
}
