//! A single graft step: check out a branch and merge another ref into it.
//!
//! Origin sync (remote-tracking ref into branch) and graft (branch into its
//! successor) are both this step. It returns a typed outcome; the bounded
//! lock retry and the conflict pause are layered on top.

use std::time::Duration;

use crate::effects::MergeOutcome;
use crate::git::GitError;
use crate::operator::Operator;
use crate::types::Sha;

use super::calls::GitCalls;
use super::engine::CascadeError;

/// How many times a step that hit lock contention is retried.
pub const MAX_LOCK_RETRIES: u32 = 1;

/// Result of one attempt at a graft step.
#[derive(Debug)]
pub enum GraftOutcome {
    /// `source` was merged; `target` now points at `tip`.
    Success { tip: Sha },
    /// `target` already contained `source`.
    AlreadyUpToDate,
    /// The merge stopped with conflicts and is still in progress.
    Conflict { files: Vec<String> },
    /// The working tree was locked by another process.
    TransientFailure(GitError),
}

/// One graft step, described as data.
#[derive(Debug, Clone)]
pub struct GraftStep {
    /// Branch that receives the merge.
    pub target: String,
    /// Ref merged into it.
    pub source: String,
    pub message: String,
}

/// Checks out `step.target` and merges `step.source` into it, once.
///
/// Lock contention becomes [`GraftOutcome::TransientFailure`]; any other git
/// failure is returned as an error.
pub fn graft_one<G: GitCalls>(git: &mut G, step: &GraftStep) -> Result<GraftOutcome, CascadeError> {
    let attempt = git
        .checkout(&step.target)
        .and_then(|()| git.merge(&step.source, step.message.clone()));

    match attempt {
        Ok(MergeOutcome::Merged { tip }) => Ok(GraftOutcome::Success { tip }),
        Ok(MergeOutcome::AlreadyUpToDate) => Ok(GraftOutcome::AlreadyUpToDate),
        Ok(MergeOutcome::Conflict { files }) => Ok(GraftOutcome::Conflict { files }),
        Err(CascadeError::Git(e)) if e.is_locked() => Ok(GraftOutcome::TransientFailure(e)),
        Err(e) => Err(e),
    }
}

/// Runs a graft step, retrying lock contention a bounded number of times.
///
/// Before each retry the tree is hard reset: the target back to `known_good`
/// if it is checked out, otherwise whatever branch is checked out back to its
/// own HEAD. Steps only start from a clean tree, so the reset discards
/// nothing but the failed attempt.
pub fn graft_with_retry<G: GitCalls>(
    git: &mut G,
    step: &GraftStep,
    retry_delay: Duration,
) -> Result<GraftOutcome, CascadeError> {
    let known_good = git.rev_parse(&format!("refs/heads/{}", step.target))?;
    let mut retries = 0;

    loop {
        let outcome = graft_one(git, step)?;
        let GraftOutcome::TransientFailure(error) = outcome else {
            return Ok(outcome);
        };

        if retries >= MAX_LOCK_RETRIES {
            return Err(CascadeError::LockRetryExhausted {
                branch: step.target.clone(),
                source: error,
            });
        }
        retries += 1;

        tracing::warn!(
            branch = %step.target,
            source = %step.source,
            error = %error,
            "working tree locked, resetting and retrying"
        );
        if !retry_delay.is_zero() {
            std::thread::sleep(retry_delay);
        }

        let reset_to = match git.current_branch()? {
            Some(current) if current == step.target => known_good.as_str().to_string(),
            _ => "HEAD".to_string(),
        };
        git.reset_hard(&reset_to)?;
    }
}

/// Waits for the operator to finish a conflicted merge into `branch`.
///
/// Returns once the tree is clean. The operator is asked again for as long
/// as the tree stays unclean; declining aborts.
pub fn await_resolution<G: GitCalls, O: Operator>(
    git: &mut G,
    operator: &mut O,
    branch: &str,
    files: &[String],
) -> Result<(), CascadeError> {
    tracing::warn!(branch, conflicts = ?files, "merge stopped with conflicts");
    loop {
        if !operator.confirm_resume(branch, files)? {
            tracing::error!(branch, "operator declined to continue");
            return Err(CascadeError::Aborted {
                branch: branch.to_string(),
            });
        }
        if !git.is_dirty()? {
            tracing::info!(branch, "conflict resolved");
            return Ok(());
        }
        tracing::warn!(branch, "working tree still unclean after confirmation");
    }
}
