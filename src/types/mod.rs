//! Core domain types for the branch train.
//!
//! This module contains the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod branch;
pub mod divergence;
pub mod ids;
pub mod train;

// Re-export commonly used types at the module level
pub use branch::{BranchNode, ReviewRequest, SyncState};
pub use divergence::{AheadBehind, Divergence};
pub use ids::{InvalidSha, PrNumber, RepoId, Sha};
pub use train::Train;
