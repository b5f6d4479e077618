//! GitHub API client and effect interpreter.
//!
//! Executes review-host effects via octocrab:
//! - Exponential backoff retry for transient failures
//! - Distinguishes transient vs permanent errors

mod client;
mod error;
mod interpreter;
mod retry;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use interpreter::interpret_github_effect;
pub use retry::{RetryConfig, RetryPolicy};
