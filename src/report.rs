//! Console and JSON front ends for the progress event stream.

use crate::constants::{ERROR_PREFIX, PROGRESS_BAR_TEMPLATE, PROGRESS_CHARS, SUCCESS_PREFIX};
use crate::events::{EventSink, ProgressEvent};
use crate::model::{BatchSummary, CompressionResult};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use tracing::warn;

/// Prints one line per job event above an indicatif progress bar.
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new(show_bar: bool) -> Self {
        let bar = ProgressBar::new(0);
        if show_bar {
            bar.set_style(
                ProgressStyle::with_template(PROGRESS_BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars(PROGRESS_CHARS),
            );
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    fn line(&self, text: String) {
        self.bar.suspend(|| println!("{text}"));
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total_jobs } => {
                self.bar.set_length(total_jobs as u64);
            }
            ProgressEvent::JobStarted { input_path } => {
                self.line(format!("Processing: {}", display_name(&input_path)));
            }
            ProgressEvent::JobProgress { .. } => {}
            ProgressEvent::JobCompleted { result, .. } => {
                self.line(completed_line(&result));
                self.bar.inc(1);
            }
            ProgressEvent::JobFailed {
                input_path,
                error_message,
                ..
            } => {
                self.line(format!(
                    "{ERROR_PREFIX} Error: {error_message} - {}",
                    display_name(&input_path)
                ));
                self.bar.inc(1);
            }
            ProgressEvent::BatchCompleted { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }
}

/// Writes every event as one JSON object per line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: ProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to serialize progress event"),
        }
    }
}

pub fn print_summary(summary: &BatchSummary) {
    println!("\nCompression Summary:");
    println!(
        "Files processed successfully: {}/{}",
        summary.succeeded_count, summary.total_files
    );
    println!(
        "Total size reduction: {} bytes ({:.1}% average)",
        summary.total_bytes_saved, summary.average_percentage_saved
    );
    if summary.total_bytes_saved > 0 {
        println!(
            "{SUCCESS_PREFIX} Saved {} across {} files",
            format_file_size(summary.total_bytes_saved.unsigned_abs()),
            summary.succeeded_count
        );
    }
}

fn completed_line(result: &CompressionResult) -> String {
    format!(
        "Compressed: {} - {} → {} bytes ({:.1}% saved)",
        display_name(&result.input_path),
        result.original_size,
        result.new_size().unwrap_or_default(),
        result.percentage_saved().unwrap_or_default()
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Binary-unit size string, e.g. `512 B` or `1.2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
