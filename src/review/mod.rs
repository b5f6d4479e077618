//! Review request tracking tables and their synchronisation with the host.

pub mod sync;
pub mod table;

pub use sync::{BranchFailure, ReviewReport, ReviewSync, ReviewSyncError};
pub use table::{POINTER, TABLE_END, TABLE_START, render_table, substitute_table};
