//! Branch nodes and the review requests attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::divergence::{AheadBehind, Divergence};
use super::ids::PrNumber;

/// A review request (pull request) whose head is a train branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub number: PrNumber,
    pub url: String,
    pub title: String,
    pub body: Option<String>,
    /// Set when the request is closed, whether or not it was merged.
    pub closed_at: Option<DateTime<Utc>>,
    pub merged: bool,
}

impl ReviewRequest {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Closed without its changes landing.
    pub fn is_closed_unmerged(&self) -> bool {
        self.closed_at.is_some() && !self.merged
    }
}

/// Where a branch node stands in the propagation state machine.
///
/// Derived from the divergence fields recomputed during the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// The remote counterpart has commits this branch lacks.
    NeedsOriginSync,
    /// This branch has commits its successor lacks.
    NeedsGraft,
    /// Local commits (or the whole branch) are not on the remote yet.
    GraftedPendingPush,
    Synced,
    /// Landed; inert for grafting and pushing.
    Merged,
}

/// One branch in a train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNode {
    pub name: String,

    /// The train's upstream terminal node.
    pub is_upstream: bool,

    /// Only changed through `Train::mark_merged`, which persists it first.
    pub(super) is_merged: bool,

    /// Counts against the next non-merged node. `None` is the end of the train.
    pub to_next: Option<AheadBehind>,

    /// Comparison with the remote counterpart. `None` until computed this run.
    pub origin: Option<Divergence>,

    pub review_requests: Vec<ReviewRequest>,
}

impl BranchNode {
    pub fn new(name: impl Into<String>, is_merged: bool) -> Self {
        Self {
            name: name.into(),
            is_upstream: false,
            is_merged,
            to_next: None,
            origin: None,
            review_requests: Vec::new(),
        }
    }

    pub fn upstream(name: impl Into<String>) -> Self {
        Self {
            is_upstream: true,
            ..Self::new(name, false)
        }
    }

    pub fn is_merged(&self) -> bool {
        self.is_merged
    }

    pub fn ahead_of_next(&self) -> Option<u32> {
        self.to_next.map(|c| c.ahead)
    }

    pub fn ahead_of_origin(&self) -> u32 {
        self.origin.and_then(|d| d.counts()).map_or(0, |c| c.ahead)
    }

    pub fn behind_origin(&self) -> u32 {
        self.origin.and_then(|d| d.counts()).map_or(0, |c| c.behind)
    }

    /// False only once the comparison has established there is no counterpart.
    pub fn has_remote(&self) -> bool {
        !matches!(self.origin, Some(Divergence::NoRemote))
    }

    pub fn has_diverged_from_origin(&self) -> bool {
        matches!(self.origin, Some(Divergence::Diverged))
    }

    pub fn has_open_request(&self) -> bool {
        self.review_requests.iter().any(ReviewRequest::is_open)
    }

    pub fn sync_state(&self) -> SyncState {
        if self.is_merged {
            return SyncState::Merged;
        }
        if self.behind_origin() > 0 {
            return SyncState::NeedsOriginSync;
        }
        if self.ahead_of_next().is_some_and(|n| n > 0) {
            return SyncState::NeedsGraft;
        }
        if self.ahead_of_origin() > 0 || (!self.has_remote() && !self.is_upstream) {
            return SyncState::GraftedPendingPush;
        }
        SyncState::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(number: u64, closed: bool, merged: bool) -> ReviewRequest {
        ReviewRequest {
            number: PrNumber(number),
            url: format!("https://github.com/acme/widgets/pull/{}", number),
            title: format!("Request {}", number),
            body: None,
            closed_at: closed.then(Utc::now),
            merged,
        }
    }

    #[test]
    fn request_classification() {
        assert!(request(1, false, false).is_open());
        assert!(request(2, true, false).is_closed_unmerged());
        assert!(!request(3, true, true).is_closed_unmerged());
        assert!(!request(3, true, true).is_open());
    }

    #[test]
    fn uncomputed_node_is_synced_with_remote_assumed() {
        let node = BranchNode::new("b1", false);
        assert!(node.has_remote());
        assert!(!node.has_diverged_from_origin());
        assert_eq!(node.ahead_of_next(), None);
        assert_eq!(node.sync_state(), SyncState::Synced);
    }

    #[test]
    fn sync_state_priorities() {
        let mut node = BranchNode::new("b1", false);
        node.origin = Some(Divergence::Counts(AheadBehind::new(1, 2)));
        node.to_next = Some(AheadBehind::new(3, 0));
        assert_eq!(node.sync_state(), SyncState::NeedsOriginSync);

        node.origin = Some(Divergence::Counts(AheadBehind::new(1, 0)));
        assert_eq!(node.sync_state(), SyncState::NeedsGraft);

        node.to_next = Some(AheadBehind::LEVEL);
        assert_eq!(node.sync_state(), SyncState::GraftedPendingPush);

        node.origin = Some(Divergence::Counts(AheadBehind::LEVEL));
        assert_eq!(node.sync_state(), SyncState::Synced);

        node.origin = Some(Divergence::NoRemote);
        assert!(!node.has_remote());
        assert_eq!(node.sync_state(), SyncState::GraftedPendingPush);
    }

    #[test]
    fn merged_node_is_inert() {
        let mut node = BranchNode::new("b2", true);
        node.origin = Some(Divergence::Counts(AheadBehind::new(0, 4)));
        assert_eq!(node.sync_state(), SyncState::Merged);
    }

    #[test]
    fn upstream_without_remote_is_not_pending_push() {
        let mut node = BranchNode::upstream("main");
        node.origin = Some(Divergence::NoRemote);
        assert_eq!(node.sync_state(), SyncState::Synced);
    }

    #[test]
    fn open_request_detection() {
        let mut node = BranchNode::new("b1", false);
        node.review_requests = vec![request(1, true, false)];
        assert!(!node.has_open_request());
        node.review_requests.push(request(2, false, false));
        assert!(node.has_open_request());
    }
}
