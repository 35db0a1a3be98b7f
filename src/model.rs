//! Jobs, per-file results and batch summaries.

use crate::config::CompressionLevel;
use crate::constants::{COMPRESSED_SUFFIX, PNG_EXTENSION};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One file's compression request with its destination already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub level: CompressionLevel,
}

impl CompressionJob {
    /// Builds a job, deriving a sibling `_compressed` path when `output_path` is `None`.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        level: CompressionLevel,
    ) -> Self {
        let input_path = input_path.into();
        let output_path = output_path.unwrap_or_else(|| default_output_path(&input_path));
        Self {
            input_path,
            output_path,
            level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Compressed {
        new_size: u64,
        bytes_saved: i64,
        percentage_saved: f64,
    },
    Failed {
        error_message: String,
    },
}

/// Terminal outcome of one job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionResult {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub original_size: u64,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

impl CompressionResult {
    pub fn succeeded(
        input_path: PathBuf,
        output_path: PathBuf,
        original_size: u64,
        new_size: u64,
    ) -> Self {
        let bytes_saved = original_size as i64 - new_size as i64;
        Self {
            input_path,
            output_path: Some(output_path),
            original_size,
            outcome: JobOutcome::Compressed {
                new_size,
                bytes_saved,
                percentage_saved: percentage_saved(original_size, bytes_saved),
            },
        }
    }

    pub fn failed(
        input_path: PathBuf,
        output_path: Option<PathBuf>,
        original_size: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            input_path,
            output_path,
            original_size,
            outcome: JobOutcome::Failed {
                error_message: error_message.into(),
            },
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Compressed { .. })
    }

    pub fn new_size(&self) -> Option<u64> {
        match self.outcome {
            JobOutcome::Compressed { new_size, .. } => Some(new_size),
            JobOutcome::Failed { .. } => None,
        }
    }

    pub fn bytes_saved(&self) -> Option<i64> {
        match self.outcome {
            JobOutcome::Compressed { bytes_saved, .. } => Some(bytes_saved),
            JobOutcome::Failed { .. } => None,
        }
    }

    pub fn percentage_saved(&self) -> Option<f64> {
        match self.outcome {
            JobOutcome::Compressed {
                percentage_saved, ..
            } => Some(percentage_saved),
            JobOutcome::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Compressed { .. } => None,
            JobOutcome::Failed { error_message } => Some(error_message),
        }
    }
}

/// Aggregate statistics over a finished batch.
///
/// Byte totals and the average cover successful results only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded_count: usize,
    pub total_original_bytes: u64,
    pub total_new_bytes: u64,
    pub total_bytes_saved: i64,
    pub average_percentage_saved: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[CompressionResult]) -> Self {
        let mut summary = BatchSummary {
            total_files: results.len(),
            ..Default::default()
        };
        let mut percentage_sum = 0.0;

        for result in results {
            if let JobOutcome::Compressed {
                new_size,
                percentage_saved,
                ..
            } = result.outcome
            {
                summary.succeeded_count += 1;
                summary.total_original_bytes += result.original_size;
                summary.total_new_bytes += new_size;
                percentage_sum += percentage_saved;
            }
        }

        summary.total_bytes_saved =
            summary.total_original_bytes as i64 - summary.total_new_bytes as i64;
        if summary.succeeded_count > 0 {
            summary.average_percentage_saved = percentage_sum / summary.succeeded_count as f64;
        }
        summary
    }

    pub fn failed_count(&self) -> usize {
        self.total_files - self.succeeded_count
    }
}

/// Percentage of `original_size` saved, 0 for empty originals.
pub fn percentage_saved(original_size: u64, bytes_saved: i64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    bytes_saved as f64 / original_size as f64 * 100.0
}

/// True if the path carries a `.png` extension, in any letter case.
pub fn is_png_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PNG_EXTENSION))
        .unwrap_or(false)
}

/// `dir/photo.png` -> `dir/photo_compressed.png`
pub fn default_output_path(input_path: &Path) -> PathBuf {
    let file_name = compressed_file_name(input_path);
    match input_path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// `photo.png` placed into `output_dir` as `photo_compressed.png`.
pub fn output_path_in(output_dir: &Path, input_path: &Path) -> PathBuf {
    output_dir.join(compressed_file_name(input_path))
}

fn compressed_file_name(input_path: &Path) -> OsString {
    let mut name = input_path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(COMPRESSED_SUFFIX);
    if let Some(ext) = input_path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}
