//! Ahead/behind analysis between references.
//!
//! Both counts come from one `rev-list --left-right --count` call over the
//! symmetric difference, so they are never computed separately. Unrelated
//! histories are detected up front with `merge-base` and reported as
//! [`Divergence::Diverged`], never as numbers.

use std::path::Path;

use crate::types::{AheadBehind, Divergence};

use super::{GitResult, command_error, git_command, ref_exists, run_git_stdout};

/// Whether `left` and `right` share any common ancestor.
fn have_common_ancestor(workdir: &Path, left: &str, right: &str) -> GitResult<bool> {
    let args = ["merge-base", left, right];
    let output = git_command(workdir).args(args).output()?;

    // Exit 0 = found, exit 1 = none, other = error
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(command_error(&args, &String::from_utf8_lossy(&output.stderr))),
    }
}

/// Commits `left` has that `right` lacks (ahead), and the reverse (behind).
///
/// Comparing a reference with itself is always level. A count that cannot be
/// parsed as a pair is treated as divergence rather than trusted.
pub fn compare(workdir: &Path, left: &str, right: &str) -> GitResult<Divergence> {
    if !have_common_ancestor(workdir, left, right)? {
        tracing::debug!(left, right, "no common ancestor");
        return Ok(Divergence::Diverged);
    }

    let range = format!("{}...{}", left, right);
    let counts = run_git_stdout(workdir, &["rev-list", "--left-right", "--count", &range])?;
    match AheadBehind::parse_left_right(&counts) {
        Some(counts) => Ok(Divergence::Counts(counts)),
        None => {
            tracing::warn!(left, right, output = %counts, "unparseable ahead/behind counts");
            Ok(Divergence::Diverged)
        }
    }
}

/// The remote-tracking ref `branch` follows, if it exists.
///
/// Uses the configured upstream first. A branch with no upstream configured
/// that nonetheless has `<remote>/<branch>` is treated as tracking it. An
/// upstream whose ref was pruned counts as absent.
pub fn tracked_remote(workdir: &Path, branch: &str, remote: &str) -> GitResult<Option<String>> {
    let local = format!("refs/heads/{}", branch);
    let upstream = run_git_stdout(
        workdir,
        &["for-each-ref", "--format=%(upstream)", &local],
    )?;

    if !upstream.is_empty() {
        if ref_exists(workdir, &upstream)? {
            return Ok(Some(short_ref(&upstream)));
        }
        tracing::debug!(branch, upstream = %upstream, "configured upstream is gone");
        return Ok(None);
    }

    let conventional = format!("refs/remotes/{}/{}", remote, branch);
    if ref_exists(workdir, &conventional)? {
        return Ok(Some(short_ref(&conventional)));
    }
    Ok(None)
}

fn short_ref(full: &str) -> String {
    full.strip_prefix("refs/remotes/")
        .or_else(|| full.strip_prefix("refs/heads/"))
        .unwrap_or(full)
        .to_string()
}

/// Compares a local branch with its remote counterpart.
pub fn compare_with_remote(workdir: &Path, branch: &str, remote: &str) -> GitResult<Divergence> {
    match tracked_remote(workdir, branch, remote)? {
        Some(tracked) => compare(workdir, branch, &tracked),
        None => Ok(Divergence::NoRemote),
    }
}
