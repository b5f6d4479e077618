//! Property-based tests with real git operations.
//!
//! Each case builds a small history with random shape and checks divergence
//! invariants against it.
//!
//! **Property**: comparing a ref with itself is level
//! **Property**: divergence is antisymmetric
//! **Property**: grafting leaves the source level with its successor

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use crate::effects::MergeOutcome;
use crate::git::divergence::compare;
use crate::git::merge::{graft_message, merge_with_message};
use crate::git::{checkout, run_git_sync};
use crate::test_utils::TestRepo;
use crate::types::{AheadBehind, Divergence};

/// Adds `count` commits to the checked-out branch.
fn add_commits(repo: &TestRepo, prefix: &str, count: usize) {
    for i in 0..count {
        repo.commit_file(
            &format!("{}-{}.txt", prefix, i),
            &format!("{}\n", i),
            &format!("{} {}", prefix, i),
        );
    }
}

/// `main` plus a branch `b` forked from it, each advanced independently.
fn forked(main_commits: usize, branch_commits: usize) -> TestRepo {
    let repo = TestRepo::new();
    run_git_sync(repo.path(), &["checkout", "-b", "b"]).unwrap();
    add_commits(&repo, "b", branch_commits);
    checkout(repo.path(), "main").unwrap();
    add_commits(&repo, "main", main_commits);
    repo
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn self_comparison_is_level(main_commits in 0usize..4, branch_commits in 0usize..4) {
        let repo = forked(main_commits, branch_commits);
        for rev in ["main", "b"] {
            prop_assert_eq!(
                compare(repo.path(), rev, rev).unwrap(),
                Divergence::Counts(AheadBehind::LEVEL)
            );
        }
    }

    #[test]
    fn divergence_is_antisymmetric(main_commits in 0usize..4, branch_commits in 0usize..4) {
        let repo = forked(main_commits, branch_commits);
        let forward = compare(repo.path(), "b", "main").unwrap();
        let backward = compare(repo.path(), "main", "b").unwrap();

        prop_assert_eq!(
            forward,
            Divergence::Counts(AheadBehind::new(branch_commits as u32, main_commits as u32))
        );
        prop_assert_eq!(backward, forward.reversed());
    }

    #[test]
    fn graft_leaves_source_level_with_successor(
        main_commits in 0usize..3,
        branch_commits in 1usize..4,
    ) {
        let repo = forked(main_commits, branch_commits);
        let outcome = merge_with_message(repo.path(), "b", &graft_message("b", "main")).unwrap();
        prop_assert!(
            matches!(outcome, MergeOutcome::Merged { .. }),
            "expected a merge, got {:?}",
            outcome
        );

        let after = compare(repo.path(), "b", "main").unwrap();
        prop_assert_eq!(after.counts().map(|c| c.ahead), Some(0));
    }
}
