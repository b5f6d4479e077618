//! Shared test utilities: real-git repository fixtures and arbitrary generators.

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use tempfile::TempDir;

use crate::git::{run_git_stdout, run_git_sync};
use crate::types::{PrNumber, Sha};

pub fn arb_pr_number() -> impl Strategy<Value = PrNumber> {
    (1u64..100_000).prop_map(PrNumber)
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn arb_branch_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9/-]{0,30}".prop_map(String::from)
}

/// Configure identity for a fresh repository, ignoring the runner's signing setup.
fn configure_identity(dir: &Path) {
    run_git_sync(dir, &["config", "user.email", "test@test.com"]).unwrap();
    run_git_sync(dir, &["config", "user.name", "Test"]).unwrap();
    run_git_sync(dir, &["config", "commit.gpgsign", "false"]).unwrap();
}

/// A working clone of a bare `origin`, with `main` pushed and tracked.
pub struct TestRepo {
    dir: TempDir,
    work: PathBuf,
    origin: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("origin.git");
        let work = dir.path().join("work");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&work).unwrap();

        run_git_sync(&origin, &["init", "--bare"]).unwrap();
        run_git_sync(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]).unwrap();

        run_git_sync(&work, &["init"]).unwrap();
        run_git_sync(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]).unwrap();
        configure_identity(&work);
        run_git_sync(&work, &["remote", "add", "origin", origin.to_str().unwrap()]).unwrap();

        let repo = TestRepo { dir, work, origin };
        repo.commit_file("README.md", "# Test\n", "Initial commit");
        repo.git(&["push", "-u", "origin", "main"]);
        repo
    }

    /// The working clone.
    pub fn path(&self) -> &Path {
        &self.work
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git_stdout(&self.work, args).unwrap()
    }

    pub fn head(&self, rev: &str) -> Sha {
        Sha::parse(self.git(&["rev-parse", rev])).unwrap()
    }

    /// Writes `file` on the checked-out branch and commits it.
    pub fn commit_file(&self, file: &str, content: &str, message: &str) -> Sha {
        std::fs::write(self.work.join(file), content).unwrap();
        self.git(&["add", file]);
        self.git(&["commit", "-m", message]);
        self.head("HEAD")
    }

    /// Creates `branch` from `base`, commits one file on it, and pushes it with tracking.
    pub fn branch_with_commit(&self, branch: &str, base: &str, file: &str) -> Sha {
        self.git(&["checkout", "-b", branch, base]);
        let sha = self.commit_file(file, &format!("{}\n", branch), &format!("work on {}", branch));
        self.git(&["push", "-u", "origin", branch]);
        sha
    }

    /// Commits to `branch` through a second clone and pushes, leaving this
    /// clone behind until it fetches.
    pub fn push_from_elsewhere(&self, branch: &str, file: &str, content: &str) -> Sha {
        let other = self.dir.path().join(format!("elsewhere-{}", branch.replace('/', "-")));
        if !other.exists() {
            run_git_sync(
                self.dir.path(),
                &[
                    "clone",
                    self.origin.to_str().unwrap(),
                    other.to_str().unwrap(),
                ],
            )
            .unwrap();
            configure_identity(&other);
        }
        run_git_sync(&other, &["fetch", "origin"]).unwrap();
        run_git_sync(&other, &["checkout", "-B", branch, &format!("origin/{}", branch)]).unwrap();
        std::fs::write(other.join(file), content).unwrap();
        run_git_sync(&other, &["add", file]).unwrap();
        run_git_sync(&other, &["commit", "-m", &format!("remote work on {}", branch)]).unwrap();
        run_git_sync(&other, &["push", "origin", branch]).unwrap();
        Sha::parse(run_git_stdout(&other, &["rev-parse", "HEAD"]).unwrap()).unwrap()
    }
}
