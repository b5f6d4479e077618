//! GitHub API effect types.
//!
//! These types describe review-host operations as data. The interpreter in
//! `crate::github` executes them against the GitHub API.

use serde::{Deserialize, Serialize};

use crate::types::{PrNumber, ReviewRequest};

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`,
/// so effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    /// List every PR whose head is `head`, regardless of state.
    ListPrs { head: String },

    /// Open a PR from `head` into `base`.
    CreatePr {
        base: String,
        head: String,
        title: String,
        body: String,
    },

    /// Replace a PR's description.
    UpdatePrBody { pr: PrNumber, body: String },
}

/// Response from a GitHub effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    Ok,
    Prs(Vec<ReviewRequest>),
    PrCreated(ReviewRequest),
}

impl GitHubResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::Ok => "ok",
            GitHubResponse::Prs(_) => "prs",
            GitHubResponse::PrCreated(_) => "pr_created",
        }
    }
}
