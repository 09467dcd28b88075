use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use super::error::CollectionError;
use crate::log_debug;

/// Output of a git command whose stdout was read under a byte cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CappedOutput {
    pub text: String,
    /// True when stdout exceeded the cap and the child was killed
    pub overflowed: bool,
}

/// Determines if the given diff represents a binary file.
pub fn is_binary_diff(diff: &str) -> bool {
    diff.lines().any(|line| {
        (line.starts_with("Binary files ") && line.ends_with(" differ"))
            || line == "GIT binary patch"
    })
}

/// Builds the base git command used for every read-only query.
///
/// Paths are never octal-quoted and external diff drivers are never invoked,
/// so output is stable regardless of the user's git configuration.
fn git_command(repo_root: &Path, args: &[&str]) -> Command {
    let mut command = Command::new("git");
    command
        .current_dir(repo_root)
        .args(["-c", "core.quotePath=false", "-c", "color.ui=false"])
        .args(args)
        .stdin(Stdio::null());
    command
}

/// Executes a git command in `repo_root` and returns its stdout
pub fn run_git_command(repo_root: &Path, args: &[&str]) -> Result<String, CollectionError> {
    log_debug!("Running git {}", args.join(" "));
    let output = git_command(repo_root, args).output()?;

    if !output.status.success() {
        return Err(CollectionError::GitFailed {
            command: args.join(" "),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Executes a git command, reading at most `max_bytes` of stdout.
///
/// When the output is larger the child is killed and the returned text holds
/// only the first `max_bytes` bytes, with `overflowed` set.
pub fn run_git_capped(
    repo_root: &Path,
    args: &[&str],
    max_bytes: usize,
) -> Result<CappedOutput, CollectionError> {
    log_debug!("Running git {} (cap {} bytes)", args.join(" "), max_bytes);
    let mut child = git_command(repo_root, args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        })
    });

    let mut buf = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        stdout.take(limit).read_to_end(&mut buf)?;
    }

    let overflowed = buf.len() > max_bytes;
    if overflowed {
        log_debug!("git {} exceeded {} bytes, stopping", args.join(" "), max_bytes);
        buf.truncate(max_bytes);
        let _ = child.kill();
    }

    let status = child.wait()?;
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !overflowed && !status.success() {
        return Err(CollectionError::GitFailed {
            command: args.join(" "),
            code: status.code(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(CappedOutput {
        text: String::from_utf8_lossy(&buf).into_owned(),
        overflowed,
    })
}
