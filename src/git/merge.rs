//! Merge operations for grafting and origin sync.
//!
//! Both the origin-sync step (merge `origin/<branch>` into `<branch>`) and the
//! graft step (merge `<branch>` into its successor) are a plain merge into the
//! checked-out branch. A conflicted merge is left in place for the operator to
//! resolve; nothing here aborts it.

use std::path::Path;

use crate::effects::MergeOutcome;

use super::{GitResult, command_error, git_command, rev_parse, run_git_stdout};

/// Merge `target` into HEAD with the given commit message.
///
/// Conflicts are an outcome, not an error. Lock contention surfaces as
/// [`super::GitError::WorkingTreeLocked`].
pub fn merge_with_message(worktree: &Path, target: &str, message: &str) -> GitResult<MergeOutcome> {
    let args = ["merge", "--no-edit", "-m", message, target];
    let output = git_command(worktree).args(args).output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        if stdout.contains("Already up to date") || stdout.contains("Already up-to-date") {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }
        let tip = rev_parse(worktree, "HEAD")?;
        return Ok(MergeOutcome::Merged { tip });
    }

    // git reports CONFLICT on stdout, not stderr
    let combined = format!("{}{}", stdout, stderr);
    if combined.contains("CONFLICT") || combined.contains("Automatic merge failed") {
        let files = conflicting_files(worktree)?;
        return Ok(MergeOutcome::Conflict { files });
    }

    Err(command_error(&args, &stderr))
}

/// Files with unresolved conflicts in the index.
pub fn conflicting_files(worktree: &Path) -> GitResult<Vec<String>> {
    let output = run_git_stdout(worktree, &["diff", "--name-only", "--diff-filter=U"])?;
    Ok(output.lines().map(str::to_string).collect())
}

/// Message for grafting `source` into `target`.
pub fn graft_message(source: &str, target: &str) -> String {
    format!("Merge branch '{}' into {}", source, target)
}

/// Message for syncing `branch` with its remote counterpart.
pub fn origin_sync_message(tracked: &str, branch: &str) -> String {
    format!("Merge remote-tracking branch '{}' into {}", tracked, branch)
}
