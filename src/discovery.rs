use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Expands input paths into the markdown files to check.
///
/// Files named explicitly are always included. Directories are walked
/// recursively in file-name order, keeping files whose extension is in
/// `extensions` (case-insensitive) and skipping VCS and build directories.
///
/// # Errors
///
/// Returns an error if an input path does not exist or a directory cannot
/// be read.
pub fn discover_documents(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = BTreeSet::new();
    let mut documents = Vec::new();

    for path in paths {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to access input path {}", path.display()))?;

        if metadata.is_file() {
            if seen.insert(path.clone()) {
                documents.push(path.clone());
            }
            continue;
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !should_skip(entry));

        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to read directory {}", path.display()))?;
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                let file = entry.into_path();
                if seen.insert(file.clone()) {
                    documents.push(file);
                }
            }
        }
    }

    log::info!("Found {} document(s) to check", documents.len());
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Directories to skip during traversal.
fn should_skip(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|name| {
            matches!(name, ".git" | "target" | "node_modules" | ".venv" | "venv")
        })
}
