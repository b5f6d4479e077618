//! Train status reports.
//!
//! Printed at the end of every run, after divergence has been recomputed:
//! a plain-text report for the terminal, or JSON with `--json`.

pub mod format;

pub use format::{NodeStatus, TrainStatus, render_train_json, render_train_status};
