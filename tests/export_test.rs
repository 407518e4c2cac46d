//! Integration tests for listing changes and exporting diffs against real git repositories.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use common::{TestRepo, list_dir, temp_test_dir};
use diffsage::export::{ExportedDiff, export_diffs};
use diffsage::git::{EMPTY_TREE, latest_commit_hash, list_changed, resolve_diff_base};
use diffsage::{CaptureSink, ChangeTarget, CommandOutput, CommandRunner, GitRunner, Tone};

fn paths(written: &[ExportedDiff]) -> Vec<PathBuf> {
    written.iter().map(|d| d.path.clone()).collect()
}

fn files(written: &[ExportedDiff]) -> Vec<&str> {
    written.iter().map(|d| d.file.as_str()).collect()
}

/// Repository with `a.py` and `b/c.py` committed, then both modified.
fn repo_with_two_modified_files() -> TestRepo {
    let repo = TestRepo::new();
    repo.commit_contents(
        &[("a.py", "print('a')\n"), ("b/c.py", "print('c')\n")],
        "initial",
    );
    repo.write("a.py", "print('a')\nprint('a2')\n");
    repo.write("b/c.py", "print('c changed')\n");
    repo
}

#[tokio::test]
async fn test_end_to_end_export_of_uncommitted_changes() {
    let repo = repo_with_two_modified_files();
    let out_root = temp_test_dir();
    let out = out_root.path().join("temp_diffs");

    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        &out,
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .expect("export should succeed");

    assert_eq!(files(&written), vec!["a.py", "b/c.py"]);
    assert_eq!(list_dir(&out), vec!["a.py_diff.txt", "b__c.py_diff.txt"]);

    let a = std::fs::read_to_string(out.join("a.py_diff.txt")).unwrap();
    assert!(a.contains("diff --git a/a.py b/a.py"));
    assert!(a.contains("+print('a2')"));

    let c = std::fs::read_to_string(out.join("b__c.py_diff.txt")).unwrap();
    assert!(c.contains("diff --git a/b/c.py b/b/c.py"));
    assert!(c.contains("-print('c')"));
    assert!(c.contains("+print('c changed')"));
}

#[tokio::test]
async fn test_clean_tree_lists_nothing_and_exports_nothing() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("a.py", "x\n")], "initial");

    let sink = CaptureSink::new();
    let files = list_changed(&repo.runner(), &ChangeTarget::Uncommitted, &sink).await;
    assert!(files.is_empty());

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        4,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert!(written.is_empty());
    assert!(list_dir(out.path()).is_empty());
}

#[tokio::test]
async fn test_export_is_idempotent_and_leaves_no_leftovers() {
    let repo = repo_with_two_modified_files();
    let out = temp_test_dir();
    std::fs::write(out.path().join("stale.py_diff.txt"), "old run").unwrap();
    std::fs::create_dir_all(out.path().join("old_subdir")).unwrap();

    let first = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();
    let first_listing = list_dir(out.path());

    let second = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();
    let second_listing = list_dir(out.path());

    assert_eq!(first, second);
    assert_eq!(first_listing, second_listing);
    assert_eq!(second_listing, vec!["a.py_diff.txt", "b__c.py_diff.txt"]);
}

#[tokio::test]
async fn test_staged_and_unstaged_changes_are_both_exported() {
    let repo = TestRepo::new();
    repo.commit_contents(
        &[("staged.txt", "one\n"), ("unstaged.txt", "one\n")],
        "initial",
    );
    repo.write("staged.txt", "one\ntwo\n");
    repo.stage("staged.txt");
    repo.write("unstaged.txt", "one\nthree\n");

    let sink = CaptureSink::new();
    let files = list_changed(&repo.runner(), &ChangeTarget::Uncommitted, &sink).await;
    assert_eq!(files, vec!["staged.txt", "unstaged.txt"]);

    let out = temp_test_dir();
    export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    let staged = std::fs::read_to_string(out.path().join("staged.txt_diff.txt")).unwrap();
    assert!(staged.contains("+two"));
    let unstaged = std::fs::read_to_string(out.path().join("unstaged.txt_diff.txt")).unwrap();
    assert!(unstaged.contains("+three"));
}

#[tokio::test]
async fn test_export_specific_revision() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("src/lib.rs", "fn a() {}\n"), ("keep.txt", "k\n")], "initial");
    let second = repo.commit_contents(&[("src/lib.rs", "fn a() {}\nfn b() {}\n")], "add b");
    // Later working-tree edits must not leak into a revision export
    repo.write("keep.txt", "dirty\n");

    let target = ChangeTarget::Revision(second.to_string());
    let sink = CaptureSink::new();
    let files = list_changed(&repo.runner(), &target, &sink).await;
    assert_eq!(files, vec!["src/lib.rs"]);

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &target,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(paths(&written), vec![out.path().join("src__lib.rs_diff.txt")]);
    let diff = std::fs::read_to_string(&written[0].path).unwrap();
    assert!(diff.contains("+fn b() {}"));
}

#[tokio::test]
async fn test_root_revision_exports_against_empty_tree() {
    let repo = TestRepo::new();
    let root = repo.commit_contents(&[("first.txt", "hello\n"), ("dir/second.txt", "x\n")], "root");
    let target = ChangeTarget::Revision(root.to_string());

    let base = resolve_diff_base(&repo.runner(), &target).await;
    assert_eq!(base, EMPTY_TREE);

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &target,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(
        list_dir(out.path()),
        vec!["dir__second.txt_diff.txt", "first.txt_diff.txt"]
    );
    assert_eq!(written.len(), 2);
    let first = std::fs::read_to_string(out.path().join("first.txt_diff.txt")).unwrap();
    assert!(first.contains("+hello"));
}

#[tokio::test]
async fn test_repository_without_commits_diffs_against_empty_tree() {
    let repo = TestRepo::new();
    repo.write("new.txt", "brand new\n");
    repo.stage("new.txt");

    assert_eq!(latest_commit_hash(&repo.runner()).await, None);

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        1,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(paths(&written), vec![out.path().join("new.txt_diff.txt")]);
    let diff = std::fs::read_to_string(&written[0].path).unwrap();
    assert!(diff.contains("+brand new"));
}

#[tokio::test]
async fn test_unknown_revision_exports_nothing() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("a.txt", "a\n")], "initial");

    let sink = Arc::new(CaptureSink::new());
    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Revision("deadbeefdeadbeef".to_string()),
        out.path(),
        2,
        sink.clone(),
    )
    .await
    .unwrap();

    assert!(written.is_empty());
    assert!(!sink.with_tone(Tone::Error).is_empty());
}

/// Delegates to git but breaks the diff of one file by pointing it at a
/// revision that does not exist.
struct PoisonedRunner {
    inner: GitRunner,
    poisoned_file: String,
}

#[async_trait]
impl CommandRunner for PoisonedRunner {
    async fn run(&self, command: &[String]) -> CommandOutput {
        let is_file_diff = command.iter().any(|a| a == "--")
            && command.last() == Some(&self.poisoned_file);
        if is_file_diff {
            let mut broken = command.to_vec();
            broken[2] = "no-such-revision-anywhere".to_string();
            return self.inner.run(&broken).await;
        }
        self.inner.run(command).await
    }
}

#[tokio::test]
async fn test_failing_unit_does_not_abort_siblings() {
    let repo = repo_with_two_modified_files();
    let runner = PoisonedRunner {
        inner: repo.runner(),
        poisoned_file: "a.py".to_string(),
    };

    let sink = Arc::new(CaptureSink::new());
    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(runner),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        sink.clone(),
    )
    .await
    .unwrap();

    assert_eq!(paths(&written), vec![out.path().join("b__c.py_diff.txt")]);
    assert_eq!(list_dir(out.path()), vec!["b__c.py_diff.txt"]);

    let errors = sink.with_tone(Tone::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("a.py"));
}

#[tokio::test]
async fn test_paths_with_shell_metacharacters_are_exported() {
    let repo = TestRepo::new();
    let tricky = "weird $(name) & 'quote'.txt";
    repo.commit_contents(&[(tricky, "one\n")], "initial");
    repo.write(tricky, "one\ntwo\n");

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        1,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(files(&written), vec![tricky]);
    let diff = std::fs::read_to_string(&written[0].path).unwrap();
    assert!(diff.contains("+two"));
}

#[tokio::test]
async fn test_non_ascii_paths_are_exported() {
    let repo = TestRepo::new();
    repo.commit_contents(
        &[("héllo.txt", "one\n"), ("plain.txt", "one\n")],
        "initial",
    );
    repo.write("héllo.txt", "one\nbonjour\n");
    repo.write("plain.txt", "one\nplain\n");

    let sink = Arc::new(CaptureSink::new());
    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        sink.clone(),
    )
    .await
    .unwrap();

    assert_eq!(files(&written), vec!["héllo.txt", "plain.txt"]);
    assert_eq!(list_dir(out.path()), vec!["héllo.txt_diff.txt", "plain.txt_diff.txt"]);
    let diff = std::fs::read_to_string(out.path().join("héllo.txt_diff.txt")).unwrap();
    assert!(diff.contains("+bonjour"));
    assert!(!sink.contains("No changes found"));
}

#[tokio::test]
async fn test_non_ascii_paths_in_a_revision_are_exported() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("docs/naïve.md", "a\n")], "initial");
    let second = repo.commit_contents(&[("docs/naïve.md", "a\nb\n")], "edit");

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Revision(second.to_string()),
        out.path(),
        1,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(files(&written), vec!["docs/naïve.md"]);
    assert_eq!(list_dir(out.path()), vec!["docs__naïve.md_diff.txt"]);
}

#[tokio::test]
async fn test_staged_rename_exports_both_sides() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("old.txt", "same content\nacross the rename\n")], "initial");

    // Equivalent of `git mv old.txt new.txt`
    std::fs::rename(repo.path().join("old.txt"), repo.path().join("new.txt")).unwrap();
    let mut index = repo.repo.index().unwrap();
    index.remove_path(std::path::Path::new("old.txt")).unwrap();
    index.add_path(std::path::Path::new("new.txt")).unwrap();
    index.write().unwrap();

    let sink = CaptureSink::new();
    let listed = list_changed(&repo.runner(), &ChangeTarget::Uncommitted, &sink).await;
    assert_eq!(listed, vec!["new.txt", "old.txt"]);

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(files(&written), vec!["new.txt", "old.txt"]);
    let removed = std::fs::read_to_string(out.path().join("old.txt_diff.txt")).unwrap();
    assert!(removed.contains("deleted file mode"));
}

#[tokio::test]
async fn test_committed_rename_lists_both_sides() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("old.txt", "same content\nacross the rename\n")], "initial");

    std::fs::rename(repo.path().join("old.txt"), repo.path().join("new.txt")).unwrap();
    let mut index = repo.repo.index().unwrap();
    index.remove_path(std::path::Path::new("old.txt")).unwrap();
    index.write().unwrap();
    let renamed = repo.commit_files(&["new.txt"], "rename");

    let sink = CaptureSink::new();
    let listed = list_changed(
        &repo.runner(),
        &ChangeTarget::Revision(renamed.to_string()),
        &sink,
    )
    .await;
    assert_eq!(listed, vec!["new.txt", "old.txt"]);
}

#[tokio::test]
async fn test_dunder_paths_keep_their_repository_path() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("pkg/__init__.py", "")], "initial");
    repo.write("pkg/__init__.py", "__all__ = []\n");

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        1,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(files(&written), vec!["pkg/__init__.py"]);
    assert_eq!(list_dir(out.path()), vec!["pkg____init__.py_diff.txt"]);
}

#[tokio::test]
async fn test_colliding_flattened_names_do_not_overwrite() {
    let repo = TestRepo::new();
    repo.commit_contents(&[("a/b.py", "one\n"), ("a__b.py", "one\n")], "initial");
    repo.write("a/b.py", "one\nnested\n");
    repo.write("a__b.py", "one\nflat\n");

    let out = temp_test_dir();
    let written = export_diffs(
        Arc::new(repo.runner()),
        &ChangeTarget::Uncommitted,
        out.path(),
        2,
        Arc::new(CaptureSink::new()),
    )
    .await
    .unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(list_dir(out.path()), vec!["a__b.py_diff.txt", "a__b.py~2_diff.txt"]);
    for exported in &written {
        let diff = std::fs::read_to_string(&exported.path).unwrap();
        assert!(diff.contains(&format!("b/{}", exported.file)));
    }
}
