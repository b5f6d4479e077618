//! Graft - keeps a train of stacked branches and their pull requests in sync.
//!
//! A train is an ordered list of branches, each building on the one before,
//! declared in `.pr-train.yml`. A run pulls remote commits into every branch,
//! merges each branch into its successor, pushes what moved, and keeps a
//! tracking table of the whole train in every pull request's description.

pub mod cascade;
pub mod cli;
pub mod config;
pub mod effects;
pub mod error;
pub mod git;
pub mod github;
pub mod operator;
pub mod persistence;
pub mod review;
pub mod status;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use error::GraftError;
