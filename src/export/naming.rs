//! Mapping between repository paths and diff file names.

use std::collections::HashSet;
use std::path::Path;

/// Suffix appended to every exported diff file.
pub const DIFF_SUFFIX: &str = "_diff.txt";

/// Separator replacing `/` and `\` in exported file names.
const SEPARATOR_TOKEN: &str = "__";

/// Derive the flat diff file name for a repository path.
///
/// `src/a/b.py` becomes `src__a__b.py_diff.txt`.
pub fn safe_file_name(repo_path: &str) -> String {
    format!("{}{}", flatten(repo_path), DIFF_SUFFIX)
}

fn flatten(repo_path: &str) -> String {
    repo_path.replace(['/', '\\'], SEPARATOR_TOKEN)
}

/// Assign every repository path a distinct diff file name.
///
/// Paths that flatten to the same name (`a/b.py` and `a__b.py`), or to
/// names differing only in case, get a `~N` marker before the suffix.
/// Output order matches `files`.
pub fn assign_file_names(files: &[String]) -> Vec<(String, String)> {
    let mut taken = HashSet::new();

    files
        .iter()
        .map(|file| {
            let flat = flatten(file);
            let mut name = format!("{}{}", flat, DIFF_SUFFIX);
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}~{}{}", flat, n, DIFF_SUFFIX);
                n += 1;
            }
            (file.clone(), name)
        })
        .collect()
}

/// Best-effort repository path for a diff file found on disk.
///
/// Strips the directory and the `_diff.txt` suffix, then restores `/`
/// separators. Lossy for paths that contain `__` themselves; exported
/// diffs carry their real path and only fall back to this.
pub fn display_name(diff_file: &Path) -> String {
    let base = diff_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = base.strip_suffix(DIFF_SUFFIX).unwrap_or(&base);
    stem.replace(SEPARATOR_TOKEN, "/")
}
