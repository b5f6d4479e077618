//! Push operations.
//!
//! Branches are pushed by name to the same name on the remote. A branch with
//! no remote counterpart yet is pushed with `-u` so later runs can compare
//! it with its upstream.

use std::path::Path;

use crate::types::Sha;

use super::{GitError, GitResult, command_error, git_command, rev_parse};

/// Result of a push operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    /// Push succeeded.
    Success {
        /// The SHA that was pushed.
        pushed_sha: Sha,
    },

    /// Push was rejected (non-fast-forward).
    Rejected {
        /// Details about why the push was rejected.
        details: String,
    },

    /// Push was a no-op (remote already has this commit).
    AlreadyUpToDate,
}

/// Push a local branch to `remote`.
pub fn push_branch(
    worktree: &Path,
    remote: &str,
    branch: &str,
    set_upstream: bool,
) -> GitResult<PushResult> {
    let local = format!("refs/heads/{}", branch);
    let pushed_sha = rev_parse(worktree, &local)?;

    let refspec = format!("{}:refs/heads/{}", local, branch);
    let mut args = vec!["push", "--porcelain"];
    if set_upstream {
        args.push("--set-upstream");
    }
    args.push(remote);
    args.push(&refspec);

    let output = git_command(worktree).args(&args).output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        // Porcelain flag "=" marks an up-to-date ref
        if stdout.lines().any(|line| line.starts_with("=\t")) {
            return Ok(PushResult::AlreadyUpToDate);
        }
        return Ok(PushResult::Success { pushed_sha });
    }

    if stdout.contains("[rejected]")
        || stdout.contains("non-fast-forward")
        || stderr.contains("non-fast-forward")
        || stderr.contains("[rejected]")
    {
        return Ok(PushResult::Rejected {
            details: format!("{}{}", stdout.trim(), stderr.trim()),
        });
    }

    Err(command_error(&args, &stderr))
}

/// Push, treating rejection as an error.
pub fn push_or_fail(
    worktree: &Path,
    remote: &str,
    branch: &str,
    set_upstream: bool,
) -> GitResult<PushResult> {
    match push_branch(worktree, remote, branch, set_upstream)? {
        PushResult::Rejected { details } => Err(GitError::PushRejected {
            branch: branch.to_string(),
            details,
        }),
        result => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::divergence::tracked_remote;
    use crate::test_utils::TestRepo;

    #[test]
    fn first_push_sets_upstream() {
        let repo = TestRepo::new();
        repo.git(&["checkout", "-b", "fresh"]);
        let tip = repo.commit_file("fresh.txt", "f\n", "fresh work");
        assert_eq!(tracked_remote(repo.path(), "fresh", "origin").unwrap(), None);

        let result = push_branch(repo.path(), "origin", "fresh", true).unwrap();
        assert_eq!(result, PushResult::Success { pushed_sha: tip });
        assert_eq!(
            repo.git(&["rev-parse", "--abbrev-ref", "fresh@{upstream}"]),
            "origin/fresh"
        );
    }

    #[test]
    fn pushing_unchanged_branch_is_up_to_date() {
        let repo = TestRepo::new();
        repo.branch_with_commit("b1", "main", "one.txt");
        let result = push_branch(repo.path(), "origin", "b1", false).unwrap();
        assert_eq!(result, PushResult::AlreadyUpToDate);
    }

    #[test]
    fn pushes_a_branch_that_is_not_checked_out() {
        let repo = TestRepo::new();
        repo.branch_with_commit("b1", "main", "one.txt");
        let tip = repo.commit_file("more.txt", "m\n", "more");
        repo.git(&["checkout", "main"]);

        let result = push_branch(repo.path(), "origin", "b1", false).unwrap();
        assert_eq!(result, PushResult::Success { pushed_sha: tip.clone() });
        assert_eq!(repo.head("origin/b1"), tip);
    }

    #[test]
    fn non_fast_forward_is_rejected() {
        let repo = TestRepo::new();
        repo.branch_with_commit("b1", "main", "one.txt");
        repo.push_from_elsewhere("b1", "remote.txt", "r\n");
        repo.commit_file("local.txt", "l\n", "local work");

        let result = push_branch(repo.path(), "origin", "b1", false).unwrap();
        assert!(matches!(result, PushResult::Rejected { .. }));
        assert!(matches!(
            push_or_fail(repo.path(), "origin", "b1", false),
            Err(GitError::PushRejected { .. })
        ));
    }
}
