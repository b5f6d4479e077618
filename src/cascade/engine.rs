//! The graft propagation engine.
//!
//! Walks a [`Train`] left to right in four phases:
//!
//! 1. **Divergence**: compare every node with its remote counterpart. Any
//!    history divergence, and any upstream commits not on the remote, stop
//!    the run before anything is mutated.
//! 2. **Origin sync**: merge the remote counterpart into every node that is
//!    behind it.
//! 3. **Cascade**: merge each node into the next non-merged node while it is
//!    ahead of it. The last node before the upstream terminal is the end of
//!    the train and is never grafted forward.
//! 4. **Push**: push every node with local commits its remote lacks.
//!
//! Divergence for an affected node is recomputed after every mutating step.
//! Conflicts pause the run until the operator confirms a clean tree.

use std::time::Duration;

use thiserror::Error;

use crate::git::GitError;
use crate::git::merge::{graft_message, origin_sync_message};
use crate::operator::Operator;
use crate::types::{Divergence, Train};

use super::calls::GitCalls;
use super::step::{GraftOutcome, GraftStep, await_resolution, graft_with_retry};

/// Errors that stop a cascade run.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("git interpreter returned {response} for {effect}")]
    UnexpectedResponse {
        effect: &'static str,
        response: &'static str,
    },

    #[error("the working tree has uncommitted changes; commit or stash them before running")]
    DirtyWorkingTree,

    #[error(
        "upstream branch {branch} is {ahead} commit(s) ahead of its remote; \
         push or reset it by hand before running"
    )]
    UpstreamAhead { branch: String, ahead: u32 },

    #[error(
        "branch {branch} has diverged from its remote counterpart; \
         reconcile the histories by hand before running"
    )]
    DivergedFromOrigin { branch: String },

    #[error("branches {branch} and {next} share no history; fix the train definition or the branches")]
    UnrelatedBranches { branch: String, next: String },

    #[error("merge into {branch} stopped with conflicts and the run was aborted; finish or abort the merge by hand")]
    Aborted { branch: String },

    #[error("working tree for {branch} stayed locked after a reset and retry")]
    LockRetryExhausted {
        branch: String,
        #[source]
        source: GitError,
    },

    #[error("failed to prompt the operator: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Knobs for a cascade run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Remote every branch is fetched from and pushed to.
    pub remote: String,
    /// Fetch the remote before comparing.
    pub fetch: bool,
    /// Push advanced branches at the end.
    pub push: bool,
    /// Pause before retrying a step that hit lock contention.
    pub lock_retry_delay: Duration,
}

impl EngineOptions {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            fetch: true,
            push: true,
            lock_retry_delay: Duration::from_secs(1),
        }
    }
}

/// What a run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Branches that took commits from their remote counterpart.
    pub origin_synced: Vec<String>,
    /// `(source, target)` pairs that were merged.
    pub grafted: Vec<(String, String)>,
    pub pushed: Vec<String>,
}

impl CascadeReport {
    pub fn is_noop(&self) -> bool {
        self.origin_synced.is_empty() && self.grafted.is_empty() && self.pushed.is_empty()
    }
}

/// Drives a train through origin sync, cascade and push.
///
/// Holding `&mut G` for the engine's lifetime makes it the only mutator of
/// the working tree for the run.
pub struct GraftEngine<'a, G, O> {
    git: &'a mut G,
    operator: &'a mut O,
    options: EngineOptions,
}

impl<'a, G: GitCalls, O: Operator> GraftEngine<'a, G, O> {
    pub fn new(git: &'a mut G, operator: &'a mut O, options: EngineOptions) -> Self {
        Self {
            git,
            operator,
            options,
        }
    }

    /// Runs every phase and restores the branch checked out at the start.
    ///
    /// On error the tree is left where the failure happened, including any
    /// unfinished merge, so it can be inspected with ordinary git commands.
    pub fn run(&mut self, train: &mut Train) -> Result<CascadeReport, CascadeError> {
        let starting_branch = self.git.current_branch()?;
        if self.git.is_dirty()? {
            return Err(CascadeError::DirtyWorkingTree);
        }

        if self.options.fetch {
            tracing::info!(remote = %self.options.remote, "fetching");
            self.git.fetch(&self.options.remote)?;
        }

        let mut report = CascadeReport::default();
        self.refresh_origin(train)?;
        self.check_origin(train)?;
        self.sync_with_origin(train, &mut report)?;
        self.refresh_next(train)?;
        self.cascade(train, &mut report)?;
        if self.options.push {
            self.push_advanced(train, &mut report)?;
        }

        if let Some(branch) = starting_branch {
            self.git.checkout(&branch)?;
        }
        tracing::info!(
            train = train.name(),
            synced = report.origin_synced.len(),
            grafted = report.grafted.len(),
            pushed = report.pushed.len(),
            "cascade complete"
        );
        Ok(report)
    }

    /// Computes every divergence figure without changing anything.
    pub fn inspect(&mut self, train: &mut Train) -> Result<(), CascadeError> {
        if self.options.fetch {
            self.git.fetch(&self.options.remote)?;
        }
        self.refresh_origin(train)?;
        self.refresh_next(train)
    }

    /// Recomputes divergence from the remote for every non-merged node.
    pub fn refresh_origin(&mut self, train: &mut Train) -> Result<(), CascadeError> {
        for index in 0..train.nodes().len() {
            if train.node(index).is_merged() {
                continue;
            }
            self.refresh_origin_at(train, index)?;
        }
        Ok(())
    }

    fn refresh_origin_at(&mut self, train: &mut Train, index: usize) -> Result<(), CascadeError> {
        let node = train.node_mut(index);
        let origin = self.git.compare_with_remote(&node.name)?;
        tracing::debug!(branch = %node.name, ?origin, "compared with remote");
        node.origin = Some(origin);
        Ok(())
    }

    /// Recomputes `to_next` for every non-merged train branch.
    pub fn refresh_next(&mut self, train: &mut Train) -> Result<(), CascadeError> {
        let active: Vec<usize> = train.active_indices().collect();
        for index in active {
            self.refresh_next_at(train, index)?;
        }
        Ok(())
    }

    fn refresh_next_at(&mut self, train: &mut Train, index: usize) -> Result<(), CascadeError> {
        let next = match train.next(index) {
            Some(next) if next != train.upstream_index() => next,
            // End of train
            _ => {
                train.node_mut(index).to_next = None;
                return Ok(());
            }
        };

        let branch = train.node(index).name.clone();
        let next_name = train.node(next).name.clone();
        match self.git.compare(&branch, &next_name)? {
            Divergence::Counts(counts) => {
                tracing::debug!(branch = %branch, next = %next_name, %counts, "compared with next");
                train.node_mut(index).to_next = Some(counts);
                Ok(())
            }
            _ => Err(CascadeError::UnrelatedBranches {
                branch,
                next: next_name,
            }),
        }
    }

    /// Fails on any remote divergence, and on upstream commits missing from the remote.
    fn check_origin(&self, train: &Train) -> Result<(), CascadeError> {
        let upstream = train.upstream();
        if upstream.ahead_of_origin() > 0 {
            return Err(CascadeError::UpstreamAhead {
                branch: upstream.name.clone(),
                ahead: upstream.ahead_of_origin(),
            });
        }
        if let Some(node) = train
            .nodes()
            .iter()
            .find(|n| !n.is_merged() && n.has_diverged_from_origin())
        {
            return Err(CascadeError::DivergedFromOrigin {
                branch: node.name.clone(),
            });
        }
        Ok(())
    }

    /// Merges the remote counterpart into every node behind it, upstream included.
    fn sync_with_origin(
        &mut self,
        train: &mut Train,
        report: &mut CascadeReport,
    ) -> Result<(), CascadeError> {
        for index in 0..train.nodes().len() {
            let node = train.node(index);
            if node.is_merged() || node.behind_origin() == 0 {
                continue;
            }
            let branch = node.name.clone();
            let Some(tracked) = self.git.tracked_remote(&branch)? else {
                continue;
            };

            tracing::info!(branch = %branch, behind = node.behind_origin(), "syncing with remote");
            let step = GraftStep {
                message: origin_sync_message(&tracked, &branch),
                target: branch.clone(),
                source: tracked,
            };
            if self.run_step(&step)? {
                report.origin_synced.push(branch);
            }
            self.refresh_origin_at(train, index)?;
        }
        Ok(())
    }

    /// Grafts each node into its successor while it is ahead.
    fn cascade(&mut self, train: &mut Train, report: &mut CascadeReport) -> Result<(), CascadeError> {
        let active: Vec<usize> = train.active_indices().collect();
        for index in active {
            let Some(next) = train.next(index) else {
                continue;
            };
            if next == train.upstream_index() {
                tracing::debug!(branch = %train.node(index).name, "end of train");
                continue;
            }
            // Earlier grafts moved this node; never trust counts from before them.
            self.refresh_next_at(train, index)?;
            if train.node(index).ahead_of_next().unwrap_or(0) == 0 {
                continue;
            }

            let source = train.node(index).name.clone();
            let target = train.node(next).name.clone();
            tracing::info!(
                source = %source,
                target = %target,
                ahead = train.node(index).ahead_of_next().unwrap_or(0),
                "grafting"
            );
            let step = GraftStep {
                message: graft_message(&source, &target),
                target: target.clone(),
                source: source.clone(),
            };
            if self.run_step(&step)? {
                report.grafted.push((source, target));
            }

            self.refresh_next_at(train, index)?;
            self.refresh_origin_at(train, next)?;
            if train.node(index).ahead_of_next().unwrap_or(0) > 0 {
                tracing::warn!(
                    branch = %train.node(index).name,
                    next = %train.node(next).name,
                    "graft did not take; continuing with the branch still ahead"
                );
            }
        }
        Ok(())
    }

    /// Pushes every train branch that has commits its remote lacks.
    fn push_advanced(
        &mut self,
        train: &mut Train,
        report: &mut CascadeReport,
    ) -> Result<(), CascadeError> {
        let active: Vec<usize> = train.active_indices().collect();
        for index in active {
            let node = train.node(index);
            let set_upstream = !node.has_remote();
            if node.ahead_of_origin() == 0 && !set_upstream {
                continue;
            }
            let branch = node.name.clone();
            tracing::info!(
                branch = %branch,
                ahead = node.ahead_of_origin(),
                new = set_upstream,
                "pushing"
            );
            self.git.push(&self.options.remote, &branch, set_upstream)?;
            report.pushed.push(branch);
            self.refresh_origin_at(train, index)?;
        }
        Ok(())
    }

    /// Runs one step through the lock retry and conflict pause.
    ///
    /// Returns whether the target branch now contains the source.
    fn run_step(&mut self, step: &GraftStep) -> Result<bool, CascadeError> {
        match graft_with_retry(self.git, step, self.options.lock_retry_delay)? {
            GraftOutcome::Success { tip } => {
                tracing::debug!(branch = %step.target, tip = %tip.short(), "merged");
                Ok(true)
            }
            GraftOutcome::AlreadyUpToDate => Ok(false),
            GraftOutcome::Conflict { files } => {
                await_resolution(self.git, self.operator, &step.target, &files)?;
                // A clean tree may mean the merge was aborted rather than committed.
                let took = matches!(
                    self.git.compare(&step.source, &step.target)?,
                    Divergence::Counts(counts) if counts.ahead == 0
                );
                if !took {
                    tracing::warn!(branch = %step.target, source = %step.source, "merge was abandoned");
                }
                Ok(took)
            }
            // graft_with_retry turns an exhausted retry into an error
            GraftOutcome::TransientFailure(source) => Err(CascadeError::LockRetryExhausted {
                branch: step.target.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
