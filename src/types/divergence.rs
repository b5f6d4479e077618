//! Ahead/behind counts between two references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commit counts one reference has that another lacks, relative to their merge base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AheadBehind {
    /// Commits reachable from the left reference but not the right.
    pub ahead: u32,
    /// Commits reachable from the right reference but not the left.
    pub behind: u32,
}

impl AheadBehind {
    pub const LEVEL: Self = Self {
        ahead: 0,
        behind: 0,
    };

    pub fn new(ahead: u32, behind: u32) -> Self {
        Self { ahead, behind }
    }

    /// The same comparison seen from the other side.
    pub fn reversed(self) -> Self {
        Self {
            ahead: self.behind,
            behind: self.ahead,
        }
    }

    pub fn is_level(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }

    /// Parses `git rev-list --left-right --count a...b` output (`"<ahead>\t<behind>"`).
    ///
    /// Both counts must be present. A single parseable count is an
    /// inconsistency, and yields `None` rather than a half-trusted answer.
    pub fn parse_left_right(output: &str) -> Option<Self> {
        let mut fields = output.split_whitespace();
        let ahead = fields.next()?.parse().ok()?;
        let behind = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self { ahead, behind })
    }
}

impl fmt::Display for AheadBehind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}/-{}", self.ahead, self.behind)
    }
}

/// Outcome of comparing two references.
///
/// `Diverged` and `NoRemote` are never numeric: callers must handle them
/// explicitly rather than treating them as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Divergence {
    /// The references share history; counts are relative to the merge base.
    Counts(AheadBehind),
    /// The branch has no remote-tracking counterpart.
    NoRemote,
    /// The references share no common ancestor.
    Diverged,
}

impl Divergence {
    pub fn counts(&self) -> Option<AheadBehind> {
        match self {
            Divergence::Counts(c) => Some(*c),
            Divergence::NoRemote | Divergence::Diverged => None,
        }
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, Divergence::Diverged)
    }

    /// The comparison seen from the other side. Non-numeric outcomes are symmetric.
    pub fn reversed(self) -> Self {
        match self {
            Divergence::Counts(c) => Divergence::Counts(c.reversed()),
            other => other,
        }
    }
}
