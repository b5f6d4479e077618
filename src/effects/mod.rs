//! Effects-as-data for Git and GitHub operations.
//!
//! The cascade engine and review sync describe what they want done as effect
//! values; interpreters execute them. This keeps the propagation logic
//! testable against in-memory repositories and hosts.

pub mod git;
pub mod github;
pub mod interpreter;

pub use git::{GitEffect, GitResponse, MergeOutcome};
pub use github::{GitHubEffect, GitHubResponse};
pub use interpreter::{GitHubInterpreter, GitInterpreter};
