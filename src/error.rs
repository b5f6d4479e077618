//! Top-level error type.
//!
//! Every fatal condition of a run ends up here. Configuration errors happen
//! before anything is mutated; cascade errors leave the repository where they
//! happened for inspection with ordinary git commands.

use thiserror::Error;

use crate::cascade::CascadeError;
use crate::config::ConfigError;
use crate::git::GitError;
use crate::persistence::PersistError;
use crate::review::ReviewSyncError;

#[derive(Debug, Error)]
pub enum GraftError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HEAD is detached; check out a branch of the train first")]
    DetachedHead,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),

    #[error(transparent)]
    Review(#[from] ReviewSyncError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("failed to create the GitHub client: {0}")]
    Client(#[source] octocrab::Error),

    #[error("failed to render the status report: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraftError {
    /// Whether the run stopped before touching the repository.
    pub fn is_before_mutation(&self) -> bool {
        matches!(
            self,
            GraftError::Config(_) | GraftError::DetachedHead | GraftError::Client(_)
        ) || matches!(
            self,
            GraftError::Cascade(
                CascadeError::DirtyWorkingTree
                    | CascadeError::UpstreamAhead { .. }
                    | CascadeError::DivergedFromOrigin { .. }
            )
        )
    }
}
