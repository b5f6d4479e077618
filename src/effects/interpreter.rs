//! Effect interpreter traits.
//!
//! The trait-based design lets the cascade and review-sync logic run against
//! mock interpreters in tests and against git and octocrab in production.

use std::future::Future;

use super::git::{GitEffect, GitResponse};
use super::github::{GitHubEffect, GitHubResponse};

/// Interprets GitHub effects against the GitHub API.
///
/// Implementations are constructed with a `RepoId`, so all effects executed
/// through a single interpreter instance are scoped to that repository.
pub trait GitHubInterpreter {
    /// The error type returned by this interpreter.
    type Error;

    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send;
}

/// Interprets Git effects against the repository's working tree.
///
/// Synchronous and `&mut self`: the working tree is a single exclusive
/// resource, so holding the interpreter mutably is holding the tree. No
/// other mutator can run while an engine borrows it.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct AlwaysClean;
///
/// impl GitInterpreter for AlwaysClean {
///     type Error = std::convert::Infallible;
///
///     fn interpret(&mut self, effect: GitEffect) -> Result<GitResponse, Self::Error> {
///         match effect {
///             GitEffect::IsDirty => Ok(GitResponse::Bool(false)),
///             _ => Ok(GitResponse::Ok),
///         }
///     }
/// }
/// ```
pub trait GitInterpreter {
    /// The error type returned by this interpreter.
    type Error;

    /// Execute a Git effect and return its response.
    fn interpret(&mut self, effect: GitEffect) -> Result<GitResponse, Self::Error>;
}
