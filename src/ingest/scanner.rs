use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Collects every non-hidden file under `root` whose extension matches
/// `extension`, sorted so runs are reproducible.
///
/// A missing `root` yields no files. Extensions are compared case-sensitively.
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        warn!("{:?} does not exist, nothing to load", root);
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(root).into_iter();

    let mut files = Vec::new();
    for entry in walker.filter_entry(|e| !is_hidden(e)) {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == extension.trim_start_matches('.'))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    // The root itself may be a relative path like "."
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}
