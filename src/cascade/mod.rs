//! Graft propagation engine.
//!
//! Keeps every branch of a train synchronised with its remote counterpart and
//! with its predecessor:
//!
//! - **Origin sync**: branches behind their remote take the remote's commits
//! - **Cascade**: each branch is merged into the next non-merged branch
//! - **Push**: advanced branches, and branches never pushed, go to the remote
//!
//! # Architecture
//!
//! The engine follows the effects-as-data pattern. It issues
//! [`crate::effects::GitEffect`]s through [`GitCalls`] and never touches the
//! repository directly, so the scenarios in `engine_tests.rs` run against an
//! in-memory model.
//!
//! # Key Invariants
//!
//! 1. **Fresh counts**: divergence is recomputed after every mutating step.
//!
//! 2. **Operator-gated conflicts**: a conflicted merge is never continued
//!    past without confirmation, and never with an unclean tree.
//!
//! 3. **Bounded retry**: lock contention is the only failure retried, once,
//!    after a hard reset to the last known-good tip.

pub mod calls;
pub mod engine;
pub mod step;

pub use calls::GitCalls;
pub use engine::{CascadeError, CascadeReport, EngineOptions, GraftEngine};
pub use step::{GraftOutcome, GraftStep, MAX_LOCK_RETRIES};
