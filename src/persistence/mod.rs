//! Merge-status persistence for the train definition file.
//!
//! A branch's `merged` flag is the only train state that outlives a run. It is
//! written back to the human-edited definition file with a minimal line edit
//! (see [`merge_flag`]) and an atomic replace (see [`fsync`]); the rest of the
//! file, comments included, is preserved byte for byte.

pub mod fsync;
pub mod merge_flag;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use fsync::{fsync_dir, fsync_file, write_atomic};
pub use merge_flag::set_merged_flag;

/// Errors writing the merged flag.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("train {0:?} not found in the definition file")]
    TrainNotFound(String),

    #[error("branch {branch:?} not found in train {train:?} of the definition file")]
    BranchNotFound { train: String, branch: String },

    #[error("the upstream branch {0:?} cannot be marked merged")]
    UpstreamBranch(String),

    #[error("failed to update {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle on the train definition file for targeted edits.
#[derive(Debug, Clone)]
pub struct DefinitionFile {
    path: PathBuf,
}

impl DefinitionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `merged` for `branch` within `train`.
    ///
    /// Returns whether the file changed. No write happens when the flag
    /// already matches.
    pub fn set_merged(&self, train: &str, branch: &str, merged: bool) -> Result<bool, PersistError> {
        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        let content = std::fs::read_to_string(&self.path).map_err(io_err)?;
        let Some(updated) = set_merged_flag(&content, train, branch, merged)? else {
            tracing::debug!(branch, merged, "definition file already up to date");
            return Ok(false);
        };

        write_atomic(&self.path, updated.as_bytes()).map_err(io_err)?;
        tracing::debug!(branch, merged, path = %self.path.display(), "wrote merge status");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONTENT: &str = "prs:\n  main-branch-name: main\n\ntrains:\n  t:\n    - a # first\n    - b\n";

    #[test]
    fn set_merged_round_trips_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".pr-train.yml");
        std::fs::write(&path, CONTENT).unwrap();
        let file = DefinitionFile::new(&path);

        assert!(file.set_merged("t", "a", true).unwrap());
        assert!(!file.set_merged("t", "a", true).unwrap());
        assert_ne!(std::fs::read_to_string(&path).unwrap(), CONTENT);

        assert!(file.set_merged("t", "a", false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CONTENT);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let file = DefinitionFile::new(dir.path().join("absent.yml"));
        assert!(matches!(
            file.set_merged("t", "a", true),
            Err(PersistError::Io { .. })
        ));
    }
}
