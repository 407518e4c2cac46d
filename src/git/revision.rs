//! Revision lookup and diff-base resolution.

use tracing::debug;

use super::changes::ChangeTarget;
use super::command::{CommandRunner, argv};

/// Object id of git's empty tree, used as the base for root commits and
/// repositories without any commit.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Get the hash of the latest commit (`HEAD`), if the repository has one.
pub async fn latest_commit_hash(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner.run(&argv(["git", "rev-parse", "HEAD"])).await;
    if !output.success() {
        debug!("git rev-parse HEAD failed: {}", output.stderr.trim());
        return None;
    }
    let hash = output.stdout.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

/// Check whether `rev` resolves to a commit.
pub async fn commit_exists(runner: &dyn CommandRunner, rev: &str) -> bool {
    let spec = format!("{}^{{commit}}", rev);
    runner
        .run(&argv(["git", "rev-parse", "--verify", "--quiet", spec.as_str()]))
        .await
        .success()
}

/// Resolve the base that per-file diffs are taken against.
///
/// - A revision is compared to its first parent, or to the empty tree when
///   it is a root commit.
/// - Uncommitted changes are compared to `HEAD`, or to the empty tree when
///   nothing has been committed yet.
pub async fn resolve_diff_base(runner: &dyn CommandRunner, target: &ChangeTarget) -> String {
    let candidate = match target {
        ChangeTarget::Revision(rev) => format!("{}^", rev),
        ChangeTarget::Uncommitted => "HEAD".to_string(),
    };

    if commit_exists(runner, &candidate).await {
        candidate
    } else {
        debug!("{} does not resolve, diffing against the empty tree", candidate);
        EMPTY_TREE.to_string()
    }
}

/// Shorten a revision for display (first 8 characters).
pub fn short_rev(rev: &str) -> &str {
    match rev.char_indices().nth(8) {
        Some((idx, _)) => &rev[..idx],
        None => rev,
    }
}
