use crate::codec::{Codec, OxipngCodec};
use crate::config::CompressionLevel;
use crate::constants::LOADED_PROGRESS_PERCENT;
use crate::error::{CompressionError, Result};
use crate::events::{EventSink, ProgressEvent};
use crate::model::{CompressionJob, CompressionResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Shared flag that stops jobs which have not yet started writing.
///
/// Checked when a job starts and again before its output is written; work
/// already inside the codec runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Compresses one file end to end: load, normalize, encode, write, measure.
///
/// Every failure is returned as a failed [`CompressionResult`] and reported
/// with a `JobFailed` event; nothing is propagated to the caller.
pub fn compress_file(
    job: CompressionJob,
    codec: &dyn Codec,
    sink: &dyn EventSink,
    cancel: Option<&CancellationToken>,
) -> CompressionResult {
    let mut original_size = 0;

    let outcome = check_cancelled(cancel).and_then(|()| {
        sink.emit(ProgressEvent::JobStarted {
            input_path: job.input_path.clone(),
        });
        run_steps(&job, codec, sink, cancel, &mut original_size)
    });

    match outcome {
        Ok(new_size) => {
            debug!(
                input = %job.input_path.display(),
                original_size,
                new_size,
                "compressed"
            );
            let result =
                CompressionResult::succeeded(job.input_path, job.output_path, original_size, new_size);
            sink.emit(ProgressEvent::JobCompleted {
                result: result.clone(),
                overall_progress: None,
            });
            result
        }
        Err(e) => {
            warn!(input = %job.input_path.display(), error = %e, "compression failed");
            let error_message = e.to_string();
            sink.emit(ProgressEvent::JobFailed {
                input_path: job.input_path.clone(),
                error_message: error_message.clone(),
                overall_progress: None,
            });
            CompressionResult::failed(
                job.input_path,
                Some(job.output_path),
                original_size,
                error_message,
            )
        }
    }
}

/// [`compress_file`] with the default codec and no cancellation.
pub fn compress_image(
    input_path: impl Into<PathBuf>,
    output_path: Option<PathBuf>,
    level: CompressionLevel,
    sink: &dyn EventSink,
) -> CompressionResult {
    let job = CompressionJob::new(input_path, output_path, level);
    compress_file(job, &OxipngCodec::new(), sink, None)
}

fn run_steps(
    job: &CompressionJob,
    codec: &dyn Codec,
    sink: &dyn EventSink,
    cancel: Option<&CancellationToken>,
    original_size: &mut u64,
) -> Result<u64> {
    let input = &job.input_path;
    let metadata =
        fs::metadata(input).map_err(|_| CompressionError::InputNotFound(input.clone()))?;
    if !metadata.is_file() {
        return Err(CompressionError::InputNotFound(input.clone()));
    }
    *original_size = metadata.len();

    if job.output_path == *input {
        return Err(CompressionError::OutputCollision {
            output: job.output_path.clone(),
            first_input: input.clone(),
        });
    }

    let mut source = codec.read(input)?;
    if !source.is_png() {
        debug!(input = %input.display(), format = ?source.format, "normalizing to RGBA PNG");
        source = codec.normalize(source)?;
    }
    sink.emit(ProgressEvent::JobProgress {
        input_path: input.clone(),
        percent_complete: LOADED_PROGRESS_PERCENT,
    });

    let compressed = codec.encode(&source.data, job.level)?;

    check_cancelled(cancel)?;
    write_output(&job.output_path, &compressed)?;

    Ok(fs::metadata(&job.output_path)?.len())
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(CompressionError::Cancelled),
        _ => Ok(()),
    }
}

/// Writes through a temp file in the destination directory so a failed write
/// never leaves a truncated PNG behind.
fn write_output(output_path: &Path, data: &[u8]) -> Result<()> {
    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(data)?;
    temp.persist(output_path).map_err(|e| CompressionError::Io(e.error))?;
    Ok(())
}
