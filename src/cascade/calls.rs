//! Typed wrappers over [`GitInterpreter`] responses.
//!
//! Each wrapper issues one effect and unpacks the response variant it
//! expects; any other variant is an interpreter bug surfaced as
//! [`CascadeError::UnexpectedResponse`].

use crate::effects::{GitEffect, GitInterpreter, GitResponse, MergeOutcome};
use crate::git::GitError;
use crate::types::{Divergence, Sha};

use super::engine::CascadeError;

fn unexpected(effect: &'static str, response: &GitResponse) -> CascadeError {
    CascadeError::UnexpectedResponse {
        effect,
        response: response.kind(),
    }
}

/// Git operations the cascade issues, as plain method calls.
pub trait GitCalls: GitInterpreter<Error = GitError> {
    fn fetch(&mut self, remote: &str) -> Result<(), CascadeError> {
        match self.interpret(GitEffect::Fetch {
            remote: remote.to_string(),
        })? {
            GitResponse::Ok => Ok(()),
            other => Err(unexpected("fetch", &other)),
        }
    }

    fn checkout(&mut self, branch: &str) -> Result<(), CascadeError> {
        match self.interpret(GitEffect::Checkout {
            branch: branch.to_string(),
        })? {
            GitResponse::Ok => Ok(()),
            other => Err(unexpected("checkout", &other)),
        }
    }

    fn merge(&mut self, target: &str, message: String) -> Result<MergeOutcome, CascadeError> {
        match self.interpret(GitEffect::Merge {
            target: target.to_string(),
            message,
        })? {
            GitResponse::Merge(outcome) => Ok(outcome),
            other => Err(unexpected("merge", &other)),
        }
    }

    fn push(&mut self, remote: &str, branch: &str, set_upstream: bool) -> Result<(), CascadeError> {
        match self.interpret(GitEffect::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
            set_upstream,
        })? {
            GitResponse::Ok => Ok(()),
            other => Err(unexpected("push", &other)),
        }
    }

    fn reset_hard(&mut self, target: &str) -> Result<(), CascadeError> {
        match self.interpret(GitEffect::ResetHard {
            target: target.to_string(),
        })? {
            GitResponse::Ok => Ok(()),
            other => Err(unexpected("reset_hard", &other)),
        }
    }

    fn is_dirty(&mut self) -> Result<bool, CascadeError> {
        match self.interpret(GitEffect::IsDirty)? {
            GitResponse::Bool(dirty) => Ok(dirty),
            other => Err(unexpected("is_dirty", &other)),
        }
    }

    fn rev_parse(&mut self, rev: &str) -> Result<Sha, CascadeError> {
        match self.interpret(GitEffect::RevParse {
            rev: rev.to_string(),
        })? {
            GitResponse::Sha(sha) => Ok(sha),
            other => Err(unexpected("rev_parse", &other)),
        }
    }

    fn compare(&mut self, left: &str, right: &str) -> Result<Divergence, CascadeError> {
        match self.interpret(GitEffect::Divergence {
            left: left.to_string(),
            right: right.to_string(),
        })? {
            GitResponse::Divergence(divergence) => Ok(divergence),
            other => Err(unexpected("divergence", &other)),
        }
    }

    fn tracked_remote(&mut self, branch: &str) -> Result<Option<String>, CascadeError> {
        match self.interpret(GitEffect::TrackedRemote {
            branch: branch.to_string(),
        })? {
            GitResponse::Ref(tracked) => Ok(tracked),
            other => Err(unexpected("tracked_remote", &other)),
        }
    }

    /// Compares a branch with its remote counterpart, `NoRemote` if it has none.
    fn compare_with_remote(&mut self, branch: &str) -> Result<Divergence, CascadeError> {
        match self.tracked_remote(branch)? {
            Some(tracked) => self.compare(branch, &tracked),
            None => Ok(Divergence::NoRemote),
        }
    }

    fn current_branch(&mut self) -> Result<Option<String>, CascadeError> {
        match self.interpret(GitEffect::CurrentBranch)? {
            GitResponse::Ref(branch) => Ok(branch),
            other => Err(unexpected("current_branch", &other)),
        }
    }
}

impl<G: GitInterpreter<Error = GitError>> GitCalls for G {}
