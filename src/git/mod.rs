//! Local git operations against the operator's working tree.
//!
//! This module implements the version-control collaborator the cascade needs:
//! - Divergence analysis between branches and their remote counterparts
//! - Checkout and merge with conflict detection
//! - Push, including first push of a branch with no remote counterpart
//! - Recovery (dirty-tree detection, hard reset for the lock retry)
//!
//! Everything goes through the `git` CLI in the repository's single working
//! tree. [`WorkingTree`] owns that tree and interprets [`crate::effects::GitEffect`]s.

pub mod divergence;
pub mod merge;
pub mod push;
pub mod recovery;
pub mod worktree;

#[cfg(test)]
mod property_tests;

use std::path::Path;
use std::process::Output;

use thiserror::Error;

use crate::types::Sha;

pub use worktree::WorkingTree;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command failed.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Another process holds the repository's index or a ref lock.
    ///
    /// The only failure class the cascade retries automatically.
    #[error("working tree is locked by another git process: {command}\nstderr: {stderr}")]
    WorkingTreeLocked { command: String, stderr: String },

    /// Push was rejected (non-fast-forward).
    #[error("push of {branch} rejected: {details}")]
    PushRejected { branch: String, details: String },

    /// Invalid SHA format.
    #[error("invalid SHA: {0}")]
    InvalidSha(String),

    /// Not inside a git working tree.
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub fn is_locked(&self) -> bool {
        matches!(self, GitError::WorkingTreeLocked { .. })
    }
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Whether stderr reports lock contention rather than a real failure.
fn is_lock_failure(stderr: &str) -> bool {
    stderr.contains("index.lock")
        || (stderr.contains("Unable to create") && stderr.contains(".lock"))
        || stderr.to_ascii_lowercase().contains("another git process")
}

/// Classifies a failed command's stderr.
pub(crate) fn command_error(args: &[&str], stderr: &str) -> GitError {
    let command = format!("git {}", args.join(" "));
    let stderr = stderr.to_string();
    if is_lock_failure(&stderr) {
        GitError::WorkingTreeLocked { command, stderr }
    } else {
        GitError::CommandFailed { command, stderr }
    }
}

/// Create a git Command for the operator's repository.
///
/// The operator's own configuration (identity, credential helpers, hooks)
/// stays in effect. Output is forced to the C locale so conflict and
/// up-to-date messages can be recognised, and merges never open an editor.
pub(crate) fn git_command(workdir: &Path) -> std::process::Command {
    use std::process::Command;

    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("LC_ALL", "C");
    cmd.env("GIT_MERGE_AUTOEDIT", "no");
    cmd
}

/// Run a git command in the given working directory.
///
/// Returns the command output on success. Lock contention is reported as
/// [`GitError::WorkingTreeLocked`], anything else as [`GitError::CommandFailed`].
pub fn run_git_sync(workdir: &Path, args: &[&str]) -> GitResult<Output> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(command_error(args, &String::from_utf8_lossy(&output.stderr)))
    }
}

/// Run a git command and return stdout as a string.
pub fn run_git_stdout(workdir: &Path, args: &[&str]) -> GitResult<String> {
    let output = run_git_sync(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get the SHA of a revision.
pub fn rev_parse(workdir: &Path, rev: &str) -> GitResult<Sha> {
    let sha_str = run_git_stdout(workdir, &["rev-parse", "--verify", rev])?;
    Sha::parse(&sha_str).map_err(|_| GitError::InvalidSha(sha_str))
}

/// Whether a fully qualified ref exists.
pub fn ref_exists(workdir: &Path, full_ref: &str) -> GitResult<bool> {
    let output = git_command(workdir)
        .args(["show-ref", "--verify", "--quiet", full_ref])
        .output()?;
    Ok(output.status.success())
}

/// Fetch every branch from a remote, pruning deleted ones.
pub fn fetch(workdir: &Path, remote: &str) -> GitResult<()> {
    run_git_sync(workdir, &["fetch", "--prune", remote])?;
    Ok(())
}

/// Check out a local branch.
pub fn checkout(workdir: &Path, branch: &str) -> GitResult<()> {
    run_git_sync(workdir, &["checkout", branch])?;
    Ok(())
}

/// The checked-out branch, or `None` on a detached HEAD.
pub fn current_branch(workdir: &Path) -> GitResult<Option<String>> {
    let output = git_command(workdir)
        .args(["symbolic-ref", "--quiet", "--short", "HEAD"])
        .output()?;
    match output.status.code() {
        Some(0) => Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        )),
        // Exit 1 = HEAD is detached
        Some(1) => Ok(None),
        _ => Err(command_error(
            &["symbolic-ref", "--quiet", "--short", "HEAD"],
            &String::from_utf8_lossy(&output.stderr),
        )),
    }
}

/// The fetch URL configured for a remote.
pub fn remote_url(workdir: &Path, remote: &str) -> GitResult<String> {
    run_git_stdout(workdir, &["remote", "get-url", remote])
}

/// The top level of the working tree containing `start`.
pub fn toplevel(start: &Path) -> GitResult<std::path::PathBuf> {
    let output = git_command(start)
        .args(["rev-parse", "--show-toplevel"])
        .output()?;
    if !output.status.success() {
        return Err(GitError::NotARepository(start.display().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().into())
}
