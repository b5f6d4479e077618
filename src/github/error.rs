//! GitHub API error types.
//!
//! Errors are split into the two classes retry logic cares about:
//!
//! - **Transient** errors are retriable (5xx, rate limits, network failures)
//! - **Permanent** errors are reported (most 4xx, validation failures such as
//!   "a pull request already exists")

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Safe to retry with backoff.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with a rate-limit message
    /// - Network timeouts
    Transient,

    /// Retrying will not help.
    ///
    /// Examples:
    /// - HTTP 401/403 (bad or under-scoped token)
    /// - HTTP 404 (repository not visible to the token)
    /// - HTTP 422 (validation failed, e.g. duplicate pull request)
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = Self::extract_status_code(&err);
        let message = Self::describe(&err);
        let kind = classify(status_code, &message);

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }

    /// The API's own message when GitHub returned one.
    fn describe(err: &octocrab::Error) -> String {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                let mut message = source.message.clone();
                if let Some(errors) = &source.errors
                    && !errors.is_empty()
                {
                    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    message.push_str(&format!(" ({})", details.join("; ")));
                }
                message
            }
            other => other.to_string(),
        }
    }

    fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
        match err {
            octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
            _ => None,
        }
    }
}

/// Transient when a retry has a realistic chance of succeeding.
fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

const RATE_LIMIT_HINTS: &[&str] = &["rate limit", "api rate", "abuse detection"];

const NETWORK_HINTS: &[&str] = &["timeout", "timed out", "connection", "network", "dns"];

fn mentions_any(message: &str, hints: &[&str]) -> bool {
    let message = message.to_lowercase();
    hints.iter().any(|hint| message.contains(hint))
}

fn is_rate_limit_error(message: &str) -> bool {
    mentions_any(message, RATE_LIMIT_HINTS)
}

fn is_network_error(message: &str) -> bool {
    mentions_any(message, NETWORK_HINTS)
}
