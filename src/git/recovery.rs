//! Working-tree cleanliness checks and reset for the lock retry.
//!
//! - **After a conflict pause**: the cascade refuses to continue until the
//!   operator has finished the merge, so "clean" here means no staged or
//!   unstaged changes to tracked files and no merge in progress.
//!
//! - **On lock contention**: the step that failed is retried once after a
//!   hard reset to the branch's last known-good tip. Untracked files belong
//!   to the operator and are never removed.

use std::path::Path;

use super::{GitResult, git_command, run_git_sync, run_git_stdout};

/// Whether a merge is in progress (MERGE_HEAD exists).
pub fn merge_in_progress(worktree: &Path) -> GitResult<bool> {
    let output = git_command(worktree)
        .args(["rev-parse", "-q", "--verify", "MERGE_HEAD"])
        .output()?;
    Ok(output.status.success())
}

/// Whether the working tree has uncommitted changes or an unfinished merge.
pub fn is_worktree_dirty(worktree: &Path) -> GitResult<bool> {
    if merge_in_progress(worktree)? {
        return Ok(true);
    }
    let status = run_git_stdout(worktree, &["status", "--porcelain", "--untracked-files=no"])?;
    Ok(!status.is_empty())
}

/// Abandons any in-progress merge and hard resets HEAD to `target`.
pub fn reset_hard(worktree: &Path, target: &str) -> GitResult<()> {
    // Fails when no merge is in progress
    let _ = run_git_sync(worktree, &["merge", "--abort"]);
    run_git_sync(worktree, &["reset", "--hard", target])?;
    tracing::debug!(target, "working tree reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::merge::merge_with_message;
    use crate::test_utils::TestRepo;

    #[test]
    fn fresh_clone_is_clean() {
        let repo = TestRepo::new();
        assert!(!is_worktree_dirty(repo.path()).unwrap());
    }

    #[test]
    fn untracked_files_do_not_count() {
        let repo = TestRepo::new();
        std::fs::write(repo.path().join("scratch.txt"), "notes").unwrap();
        assert!(!is_worktree_dirty(repo.path()).unwrap());
    }

    #[test]
    fn modified_tracked_file_is_dirty() {
        let repo = TestRepo::new();
        std::fs::write(repo.path().join("README.md"), "changed").unwrap();
        assert!(is_worktree_dirty(repo.path()).unwrap());
    }

    #[test]
    fn resolved_but_uncommitted_merge_is_still_dirty() {
        let repo = TestRepo::new();
        repo.branch_with_commit("b1", "main", "shared.txt");
        repo.git(&["checkout", "-b", "b2", "main"]);
        repo.commit_file("shared.txt", "different\n", "b2 edits shared");
        merge_with_message(repo.path(), "b1", "graft").unwrap();

        std::fs::write(repo.path().join("shared.txt"), "resolved\n").unwrap();
        repo.git(&["add", "shared.txt"]);
        assert!(is_worktree_dirty(repo.path()).unwrap());

        repo.git(&["commit", "--no-edit"]);
        assert!(!is_worktree_dirty(repo.path()).unwrap());
    }

    #[test]
    fn reset_hard_abandons_conflicted_merge_and_keeps_untracked_files() {
        let repo = TestRepo::new();
        repo.branch_with_commit("b1", "main", "shared.txt");
        repo.git(&["checkout", "-b", "b2", "main"]);
        let tip = repo.commit_file("shared.txt", "different\n", "b2 edits shared");
        std::fs::write(repo.path().join("scratch.txt"), "notes").unwrap();
        merge_with_message(repo.path(), "b1", "graft").unwrap();
        assert!(is_worktree_dirty(repo.path()).unwrap());

        reset_hard(repo.path(), tip.as_str()).unwrap();

        assert!(!is_worktree_dirty(repo.path()).unwrap());
        assert_eq!(repo.head("HEAD"), tip);
        assert!(repo.path().join("scratch.txt").exists());
    }
}
