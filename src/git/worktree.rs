//! The repository's working tree as the single git mutation resource.
//!
//! Checkout changes process-wide state that every later git command observes,
//! so exactly one [`WorkingTree`] exists per run and every mutating effect
//! goes through `&mut WorkingTree`.

use std::path::{Path, PathBuf};

use crate::effects::{GitEffect, GitInterpreter, GitResponse};

use super::{
    GitResult, checkout, current_branch, divergence, fetch, merge, push, recovery,
    rev_parse, toplevel,
};

/// Owner of the operator's working tree.
#[derive(Debug)]
pub struct WorkingTree {
    root: PathBuf,
    remote: String,
}

impl WorkingTree {
    /// Opens the working tree containing `start`.
    pub fn discover(start: &Path, remote: impl Into<String>) -> GitResult<Self> {
        Ok(WorkingTree {
            root: toplevel(start)?,
            remote: remote.into(),
        })
    }

    /// The top-level directory of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn execute(&mut self, effect: GitEffect) -> GitResult<GitResponse> {
        let root = self.root.as_path();
        match effect {
            GitEffect::Fetch { remote } => {
                fetch(root, &remote)?;
                Ok(GitResponse::Ok)
            }
            GitEffect::Checkout { branch } => {
                checkout(root, &branch)?;
                Ok(GitResponse::Ok)
            }
            GitEffect::Merge { target, message } => Ok(GitResponse::Merge(
                merge::merge_with_message(root, &target, &message)?,
            )),
            GitEffect::Push {
                remote,
                branch,
                set_upstream,
            } => {
                push::push_or_fail(root, &remote, &branch, set_upstream)?;
                Ok(GitResponse::Ok)
            }
            GitEffect::ResetHard { target } => {
                recovery::reset_hard(root, &target)?;
                Ok(GitResponse::Ok)
            }
            GitEffect::IsDirty => Ok(GitResponse::Bool(recovery::is_worktree_dirty(root)?)),
            GitEffect::RevParse { rev } => Ok(GitResponse::Sha(rev_parse(root, &rev)?)),
            GitEffect::Divergence { left, right } => Ok(GitResponse::Divergence(
                divergence::compare(root, &left, &right)?,
            )),
            GitEffect::TrackedRemote { branch } => Ok(GitResponse::Ref(
                divergence::tracked_remote(root, &branch, &self.remote)?,
            )),
            GitEffect::CurrentBranch => Ok(GitResponse::Ref(current_branch(root)?)),
        }
    }
}

impl GitInterpreter for WorkingTree {
    type Error = super::GitError;

    fn interpret(&mut self, effect: GitEffect) -> Result<GitResponse, Self::Error> {
        tracing::trace!(?effect, "git effect");
        self.execute(effect)
    }
}
