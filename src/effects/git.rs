//! Git operation effect types.
//!
//! These types describe git operations as data, without executing them.
//! `crate::git::WorkingTree` executes them against the repository's single
//! working tree; tests substitute an in-memory model.

use serde::{Deserialize, Serialize};

use crate::types::{Divergence, Sha};

/// A git operation effect.
///
/// Effects are repository-scoped: the interpreter owns the working tree they
/// act on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitEffect {
    /// Fetch every branch from a remote.
    Fetch { remote: String },

    /// Check out a local branch.
    Checkout { branch: String },

    /// Merge a branch, remote ref, or commit into HEAD.
    Merge { target: String, message: String },

    /// Push a local branch to the remote branch of the same name.
    Push {
        remote: String,
        branch: String,
        /// Record the remote branch as the local branch's upstream (`-u`).
        set_upstream: bool,
    },

    /// Abort any merge in progress and hard reset HEAD to a target.
    ///
    /// Untracked files are left alone.
    ResetHard { target: String },

    /// Whether the working tree has uncommitted or conflicted changes.
    IsDirty,

    /// Resolve a revision to a commit.
    RevParse { rev: String },

    /// Ahead/behind of `left` relative to `right`.
    Divergence { left: String, right: String },

    /// The remote-tracking ref configured as `branch`'s upstream, if any.
    TrackedRemote { branch: String },

    /// The checked-out branch. `None` on a detached HEAD.
    CurrentBranch,
}

/// Outcome of a merge that ran to completion or stopped on conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// A merge commit (or fast-forward) was created.
    Merged { tip: Sha },
    /// The target was already contained in HEAD.
    AlreadyUpToDate,
    /// The merge stopped with conflicts, leaving the tree mid-merge.
    Conflict { files: Vec<String> },
}

/// Response from a git effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitResponse {
    /// Operation completed successfully with no specific return value.
    Ok,
    /// Operation returned a commit (e.g., from RevParse).
    Sha(Sha),
    /// Operation returned a boolean (e.g., from IsDirty).
    Bool(bool),
    Merge(MergeOutcome),
    Divergence(Divergence),
    /// A ref name that may not exist (TrackedRemote, CurrentBranch).
    Ref(Option<String>),
}

impl GitResponse {
    /// Short name of the variant, for unexpected-response errors.
    pub fn kind(&self) -> &'static str {
        match self {
            GitResponse::Ok => "ok",
            GitResponse::Sha(_) => "sha",
            GitResponse::Bool(_) => "bool",
            GitResponse::Merge(_) => "merge",
            GitResponse::Divergence(_) => "divergence",
            GitResponse::Ref(_) => "ref",
        }
    }
}
