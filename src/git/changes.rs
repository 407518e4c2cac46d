//! Listing the files touched by a revision or by uncommitted changes.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::error::TargetError;
use crate::output::OutputSink;

use super::command::{CommandRunner, argv};
use super::revision::short_rev;

/// What to analyze: the working tree or one recorded revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    /// Staged and unstaged changes relative to the last commit.
    Uncommitted,
    /// A specific revision compared to its parent.
    Revision(String),
}

impl ChangeTarget {
    /// Build a target from an optional revision; blank means uncommitted.
    ///
    /// Revisions starting with `-` are rejected so they can never be read
    /// by git as an option.
    pub fn from_revision(rev: Option<&str>) -> Result<Self, TargetError> {
        match rev.map(str::trim) {
            Some(r) if is_option_like(r) => Err(TargetError::OptionLikeRevision(r.to_string())),
            Some(r) if !r.is_empty() => Ok(ChangeTarget::Revision(r.to_string())),
            _ => Ok(ChangeTarget::Uncommitted),
        }
    }

    pub fn revision(&self) -> Option<&str> {
        match self {
            ChangeTarget::Uncommitted => None,
            ChangeTarget::Revision(rev) => Some(rev),
        }
    }
}

fn is_option_like(rev: &str) -> bool {
    rev.starts_with('-')
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Uncommitted => write!(f, "current uncommitted changes"),
            ChangeTarget::Revision(rev) => write!(f, "commit {}...", short_rev(rev)),
        }
    }
}

/// List the changed files for `target`, sorted and deduplicated.
///
/// For uncommitted changes both the staged and the unstaged listing are
/// collected; a failure of one does not discard the other's results.
pub async fn list_changed(
    runner: &dyn CommandRunner,
    target: &ChangeTarget,
    sink: &dyn OutputSink,
) -> Vec<String> {
    let mut files = BTreeSet::new();

    sink.info(&format!("Getting changed files for {}...", target));

    match target {
        ChangeTarget::Revision(rev) if is_option_like(rev) => {
            sink.error(&TargetError::OptionLikeRevision(rev.clone()).to_string());
            return Vec::new();
        }
        ChangeTarget::Revision(rev) => {
            // --root lists every file of a root commit instead of nothing
            let command = argv([
                "git",
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "--no-renames",
                "-z",
                "-r",
                "--root",
                rev.as_str(),
            ]);
            let output = runner.run(&command).await;
            if !output.success() {
                sink.error(&format!(
                    "Failed to list files for commit {}...: {}",
                    short_rev(rev),
                    output.stderr.trim()
                ));
                return Vec::new();
            }
            files.extend(output.nul_fields().map(str::to_string));
        }
        ChangeTarget::Uncommitted => {
            let staged = runner
                .run(&argv(["git", "diff", "--name-only", "--no-renames", "-z", "--staged"]))
                .await;
            if !staged.success() {
                sink.error(&format!("Failed to list staged files: {}", staged.stderr.trim()));
            }
            files.extend(staged.nul_fields().map(str::to_string));

            let unstaged = runner
                .run(&argv(["git", "diff", "--name-only", "--no-renames", "-z"]))
                .await;
            if !unstaged.success() {
                sink.error(&format!(
                    "Failed to list unstaged files: {}",
                    unstaged.stderr.trim()
                ));
            }
            files.extend(unstaged.nul_fields().map(str::to_string));
        }
    }

    let files: Vec<String> = files.into_iter().collect();
    debug!("Changed files for {}: {:?}", target, files);

    if files.is_empty() {
        sink.warn("No changed files detected.");
    } else {
        sink.info(&format!("Found {} changed file(s).", files.len()));
    }

    files
}
