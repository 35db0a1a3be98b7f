use crate::error::{CompressionError, Result};
use crate::model::is_png_file;
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Expands CLI inputs into the list handed to the batch.
///
/// Directories contribute their `.png` files (immediate children unless
/// `recursive`). Files named explicitly are kept as given so the batch can
/// report why it skipped them. Missing paths with glob metacharacters are
/// expanded; other missing paths pass through and fail as "input not found".
pub fn collect_png_files<S: AsRef<str>>(inputs: &[S], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);

        if path.is_dir() {
            files.extend(scan_directory(path, recursive)?);
        } else if path.exists() || !is_glob_pattern(input) {
            files.push(path.to_path_buf());
        } else {
            files.extend(expand_glob(input)?);
        }
    }

    debug!(count = files.len(), "collected inputs");
    Ok(files)
}

/// True if any collected input would be scheduled rather than rejected.
pub fn contains_png(files: &[PathBuf]) -> bool {
    files.iter().any(|path| is_png_file(path))
}

/// Number of collected inputs with a `.png` extension.
pub fn png_count(files: &[PathBuf]) -> usize {
    files.iter().filter(|path| is_png_file(path)).count()
}

fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files = Vec::new();
    for entry in walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_png_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).map_err(|e| CompressionError::Glob(format!("{pattern}: {e}")))?;
    Ok(paths
        .flatten()
        .filter(|path| path.is_file() && is_png_file(path))
        .collect())
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}
