//! The train model: an ordered sequence of branch nodes ending in the upstream node.
//!
//! # Invariants
//!
//! - Exactly one upstream node, always last, never a graft source.
//! - Branch names are unique within the train.
//! - Node order is graft order. Merged nodes are inert pass-throughs: `next`
//!   and `previous` skip them.
//!
//! The train is rebuilt from the definition file on every run. `is_merged` is
//! the only field with a lifetime beyond the run; everything else is
//! recomputed.

use serde::Serialize;

use crate::config::{ConfigError, TrainDefinition};
use crate::persistence::{DefinitionFile, PersistError};

use super::branch::BranchNode;

/// An ordered train of branches terminated by the upstream branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Train {
    name: String,
    nodes: Vec<BranchNode>,
}

impl Train {
    /// Builds the named train from the definition, appending the upstream node.
    pub fn build(definition: &TrainDefinition, train_name: &str) -> Result<Self, ConfigError> {
        let spec = definition.train(train_name)?;
        let mut nodes: Vec<BranchNode> = spec
            .entries
            .iter()
            .map(|entry| BranchNode::new(entry.branch.clone(), entry.merged))
            .collect();
        nodes.push(BranchNode::upstream(
            definition.settings.upstream_branch.clone(),
        ));

        Ok(Train {
            name: spec.name.clone(),
            nodes,
        })
    }

    /// Builds the one train that contains `current_branch`.
    pub fn for_branch(
        definition: &TrainDefinition,
        current_branch: &str,
    ) -> Result<Self, ConfigError> {
        let spec = definition.select_train(current_branch)?;
        Self::build(definition, &spec.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &BranchNode {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut BranchNode {
        &mut self.nodes[index]
    }

    /// Number of train branches, excluding the upstream node.
    pub fn branch_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn upstream_index(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn upstream(&self) -> &BranchNode {
        &self.nodes[self.upstream_index()]
    }

    pub fn index_of(&self, branch: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == branch)
    }

    /// The next non-merged node after `index`. The upstream node has no successor.
    pub fn next(&self, index: usize) -> Option<usize> {
        if index >= self.upstream_index() {
            return None;
        }
        (index + 1..self.nodes.len()).find(|&i| !self.nodes[i].is_merged())
    }

    /// The closest non-merged branch before `index`, if any.
    pub fn previous(&self, index: usize) -> Option<usize> {
        (0..index.min(self.upstream_index()))
            .rev()
            .find(|&i| !self.nodes[i].is_merged())
    }

    /// Indices of train branches that are not merged, in train order.
    pub fn active_indices(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        (0..self.upstream_index()).filter(|&i| !self.nodes[i].is_merged())
    }

    /// Sets a branch's merged flag, persisting it before changing the model.
    ///
    /// Returns whether the in-memory flag changed. If persisting fails, the
    /// model is left as it was.
    pub fn mark_merged(
        &mut self,
        index: usize,
        merged: bool,
        file: &DefinitionFile,
    ) -> Result<bool, PersistError> {
        let node = &self.nodes[index];
        if node.is_upstream {
            return Err(PersistError::UpstreamBranch(node.name.clone()));
        }

        file.set_merged(&self.name, &node.name, merged)?;

        let node = &mut self.nodes[index];
        let changed = node.is_merged != merged;
        node.is_merged = merged;
        if changed {
            tracing::info!(branch = %node.name, merged, "updated merge status");
        }
        Ok(changed)
    }
}
