//! Parallel per-file diff export.
//!
//! The output directory is cleared first, then each changed file is diffed
//! on a bounded pool of tokio tasks and written to its own file. Every task
//! owns a distinct pre-computed output path, so workers share nothing but
//! the directory itself.

pub mod naming;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::ExportError;
use crate::git::command::{CommandRunner, argv};
use crate::git::{ChangeTarget, list_changed, resolve_diff_base};
use crate::output::OutputSink;

pub use naming::{DIFF_SUFFIX, assign_file_names, display_name, safe_file_name};

/// Default output directory for exported diffs.
pub const DEFAULT_OUTPUT_DIR: &str = "temp_diffs";

/// Worker count used when the host parallelism cannot be determined.
const FALLBACK_WORKERS: usize = 4;

/// Result of diffing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub file: String,
    pub diff: String,
    /// Where the diff was written; `None` when the diff was blank.
    pub written_to: Option<PathBuf>,
}

/// A diff file on disk together with the repository path it describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExportedDiff {
    /// Diff file location.
    pub path: PathBuf,
    /// Repository-relative path of the changed file.
    pub file: String,
}

impl ExportedDiff {
    /// Describe a diff file whose repository path is unknown, recovering
    /// it from the file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = display_name(&path);
        Self { path, file }
    }
}

/// Number of workers matching the host's available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_WORKERS)
}

/// Ensure `dir` exists and remove everything inside it.
///
/// The directory itself is kept. Any failure aborts the export before a
/// single diff is produced.
pub async fn prepare_output_dir(dir: &Path) -> Result<(), ExportError> {
    let prepare_err = |source| ExportError::PrepareOutputDir {
        path: dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(prepare_err)?;

    let mut entries = tokio::fs::read_dir(dir).await.map_err(prepare_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(prepare_err)? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(prepare_err)?;

        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await.map_err(prepare_err)?;
        } else {
            // Files and symlinks (including links to directories)
            tokio::fs::remove_file(&path).await.map_err(prepare_err)?;
        }
    }

    Ok(())
}

/// Build the per-file diff command against `base`.
pub fn diff_command(target: &ChangeTarget, base: &str, file: &str) -> Vec<String> {
    match target {
        ChangeTarget::Revision(rev) => argv(["git", "diff", base, rev.as_str(), "--", file]),
        ChangeTarget::Uncommitted => argv(["git", "diff", base, "--", file]),
    }
}

/// Diff one file and persist it as `output_dir/file_name` when non-blank.
pub async fn export_file(
    runner: &dyn CommandRunner,
    target: &ChangeTarget,
    base: &str,
    file: &str,
    output_dir: &Path,
    file_name: &str,
) -> Result<DiffRecord, ExportError> {
    let command = diff_command(target, base, file);
    let output = runner.run(&command).await;

    if !output.success() {
        return Err(ExportError::DiffFailed {
            file: file.to_string(),
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    if output.stdout.trim().is_empty() {
        return Ok(DiffRecord {
            file: file.to_string(),
            diff: output.stdout,
            written_to: None,
        });
    }

    let path = output_dir.join(file_name);
    let write_err = |source| ExportError::WriteFailed {
        file: file.to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(&path, output.stdout.as_bytes())
        .await
        .map_err(write_err)?;

    Ok(DiffRecord {
        file: file.to_string(),
        diff: output.stdout,
        written_to: Some(path),
    })
}

/// Export one diff file per changed file of `target` into `output_dir`.
///
/// Returns the written diffs sorted by diff file path. An empty result
/// means nothing changed. Per-file failures are reported through `sink`
/// and skipped; only preparing the output directory can fail the whole
/// export.
pub async fn export_diffs(
    runner: Arc<dyn CommandRunner>,
    target: &ChangeTarget,
    output_dir: &Path,
    max_workers: usize,
    sink: Arc<dyn OutputSink>,
) -> Result<Vec<ExportedDiff>, ExportError> {
    sink.info(&format!(
        "Preparing output directory {}...",
        output_dir.display()
    ));
    prepare_output_dir(output_dir).await?;

    sink.info(&format!("Exporting diffs for {}", target));

    let files = list_changed(runner.as_ref(), target, sink.as_ref()).await;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let base = resolve_diff_base(runner.as_ref(), target).await;
    let workers = max_workers.max(1);
    debug!(
        "Diffing {} file(s) against {} with {} worker(s)",
        files.len(),
        base,
        workers
    );

    let permits = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for (file, file_name) in assign_file_names(&files) {
        if file_name != safe_file_name(&file) {
            sink.warn(&format!(
                "Diff name for {} collides with another file, writing {}",
                file, file_name
            ));
        }

        let runner = Arc::clone(&runner);
        let permits = Arc::clone(&permits);
        let target = target.clone();
        let base = base.clone();
        let output_dir = output_dir.to_path_buf();

        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ExportError::WorkerFailed {
                    file: file.clone(),
                    reason: e.to_string(),
                })?;
            export_file(runner.as_ref(), &target, &base, &file, &output_dir, &file_name).await
        });
    }

    let mut written = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(DiffRecord {
                file,
                written_to: Some(path),
                ..
            })) => {
                sink.success(&format!("Saved diff for: {} → {}", file, path.display()));
                written.push(ExportedDiff { path, file });
            }
            Ok(Ok(DiffRecord { file, .. })) => {
                sink.info(&format!("No changes found for: {}", file));
            }
            Ok(Err(e)) => {
                warn!("{}", e);
                sink.error(&e.to_string());
            }
            Err(join_err) => {
                warn!("Diff worker panicked or was cancelled: {}", join_err);
                sink.error(&format!("Diff worker failed: {}", join_err));
            }
        }
    }

    written.sort();

    if written.is_empty() {
        sink.warn("No diff files were generated.");
    } else {
        let shown = tokio::fs::canonicalize(output_dir)
            .await
            .unwrap_or_else(|_| output_dir.to_path_buf());
        sink.success(&format!(
            "Exported {} diff file(s) to {}",
            written.len(),
            shown.display()
        ));
    }

    Ok(written)
}
