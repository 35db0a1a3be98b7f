use crate::codec::{Codec, OxipngCodec};
use crate::compressor::{compress_file, CancellationToken};
use crate::config::BatchOptions;
use crate::error::{CompressionError, Result};
use crate::events::{EventSink, ProgressEvent};
use crate::model::{is_png_file, output_path_in, BatchSummary, CompressionJob, CompressionResult};
use rayon::prelude::*;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Results in input order plus the derived summary.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<CompressionResult>,
    pub summary: BatchSummary,
}

/// Fans a list of inputs out over a bounded worker pool.
pub struct BatchCoordinator<C = OxipngCodec> {
    codec: C,
    cancel: Option<CancellationToken>,
}

impl Default for BatchCoordinator<OxipngCodec> {
    fn default() -> Self {
        Self::new(OxipngCodec::new())
    }
}

impl<C: Codec> BatchCoordinator<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Runs every input to a terminal result and blocks until all are done.
    ///
    /// Only configuration problems return `Err`, and they do so before any
    /// event is emitted. Per-file failures are reported as failed results.
    /// `results` follows input order; events arrive in completion order,
    /// bracketed by `BatchStarted` and `BatchCompleted`.
    pub fn run_batch<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        options: &BatchOptions,
        sink: &dyn EventSink,
    ) -> Result<BatchReport> {
        options.validate()?;
        let workers = options.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("png-squeeze-{i}"))
            .build()
            .map_err(|e| CompressionError::ThreadPool(e.to_string()))?;

        let total_jobs = inputs.len();
        let start_time = Instant::now();
        info!(total_jobs, workers, level = %options.level, "batch started");
        sink.emit(ProgressEvent::BatchStarted { total_jobs });

        let tracker = ProgressTracker::new(sink, total_jobs);
        let slots = plan_jobs(inputs, options, &tracker);

        let results: Vec<CompressionResult> = pool.install(|| {
            slots
                .into_par_iter()
                .map(|slot| match slot {
                    Slot::Rejected(result) => result,
                    Slot::Scheduled(job) => self.run_job(job, &tracker),
                })
                .collect()
        });

        let summary = BatchSummary::from_results(&results);
        info!(
            succeeded = summary.succeeded_count,
            total = summary.total_files,
            bytes_saved = summary.total_bytes_saved,
            elapsed = ?start_time.elapsed(),
            "batch completed"
        );
        sink.emit(ProgressEvent::BatchCompleted {
            results: results.clone(),
        });

        Ok(BatchReport { results, summary })
    }

    fn run_job(&self, job: CompressionJob, tracker: &ProgressTracker<'_>) -> CompressionResult {
        let input_path = job.input_path.clone();
        let output_path = job.output_path.clone();
        let job_events = JobEvents::new(tracker);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            compress_file(job, &self.codec, &job_events, self.cancel.as_ref())
        }));

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let error = CompressionError::WorkerPanicked(panic_message(payload.as_ref()));
                let error_message = error.to_string();
                job_events.emit(ProgressEvent::JobFailed {
                    input_path: input_path.clone(),
                    error_message: error_message.clone(),
                    overall_progress: None,
                });
                CompressionResult::failed(input_path, Some(output_path), 0, error_message)
            }
        }
    }
}

/// Runs a batch with the default oxipng-backed codec.
pub fn run_batch<P: AsRef<Path>>(
    inputs: &[P],
    options: &BatchOptions,
    sink: &dyn EventSink,
) -> Result<BatchReport> {
    BatchCoordinator::new(OxipngCodec::new()).run_batch(inputs, options, sink)
}

enum Slot {
    Rejected(CompressionResult),
    Scheduled(CompressionJob),
}

/// Resolves jobs in input order, turning non-PNG inputs and output path
/// collisions (with another output or with another input of the batch)
/// into failed results before anything is dispatched.
fn plan_jobs<P: AsRef<Path>>(
    inputs: &[P],
    options: &BatchOptions,
    tracker: &ProgressTracker<'_>,
) -> Vec<Slot> {
    let batch_inputs: HashSet<&Path> = inputs.iter().map(|input| input.as_ref()).collect();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    inputs
        .iter()
        .map(|input| {
            let input = input.as_ref();
            if !is_png_file(input) {
                return Slot::Rejected(reject(
                    tracker,
                    input,
                    CompressionError::UnsupportedFormat(input.to_path_buf()),
                ));
            }

            let output = options
                .output_dir
                .as_deref()
                .map(|dir| output_path_in(dir, input));
            let job = CompressionJob::new(input, output, options.level);

            // Another input of this batch living at our output path would be
            // overwritten before (or while) it is read.
            if batch_inputs.contains(job.output_path.as_path()) {
                return Slot::Rejected(reject(
                    tracker,
                    input,
                    CompressionError::OutputCollision {
                        first_input: job.output_path.clone(),
                        output: job.output_path,
                    },
                ));
            }

            match claimed.entry(job.output_path.clone()) {
                Entry::Occupied(first) => Slot::Rejected(reject(
                    tracker,
                    input,
                    CompressionError::OutputCollision {
                        output: job.output_path,
                        first_input: first.get().clone(),
                    },
                )),
                Entry::Vacant(vacant) => {
                    vacant.insert(job.input_path.clone());
                    Slot::Scheduled(job)
                }
            }
        })
        .collect()
}

fn reject(tracker: &ProgressTracker<'_>, input: &Path, error: CompressionError) -> CompressionResult {
    debug!(input = %input.display(), error = %error, "rejected before dispatch");
    let error_message = error.to_string();
    tracker.finish(ProgressEvent::JobFailed {
        input_path: input.to_path_buf(),
        error_message: error_message.clone(),
        overall_progress: None,
    });
    CompressionResult::failed(input.to_path_buf(), None, 0, error_message)
}

/// Owns the completed-job counter for one batch.
///
/// The increment and the forward of the terminal event happen under one
/// lock, so observers see strictly increasing `overall_progress` values.
struct ProgressTracker<'a> {
    sink: &'a dyn EventSink,
    total: usize,
    completed: Mutex<usize>,
}

impl<'a> ProgressTracker<'a> {
    fn new(sink: &'a dyn EventSink, total: usize) -> Self {
        Self {
            sink,
            total,
            completed: Mutex::new(0),
        }
    }

    fn forward(&self, event: ProgressEvent) {
        self.sink.emit(event);
    }

    fn finish(&self, event: ProgressEvent) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *completed < self.total {
            *completed += 1;
        }
        let overall = *completed as f64 / self.total.max(1) as f64 * 100.0;
        self.sink.emit(event.with_overall_progress(overall));
    }
}

/// Per-job view of the tracker that lets exactly one terminal event through.
struct JobEvents<'t, 'a> {
    tracker: &'t ProgressTracker<'a>,
    finished: AtomicBool,
}

impl<'t, 'a> JobEvents<'t, 'a> {
    fn new(tracker: &'t ProgressTracker<'a>) -> Self {
        Self {
            tracker,
            finished: AtomicBool::new(false),
        }
    }
}

impl EventSink for JobEvents<'_, '_> {
    fn emit(&self, event: ProgressEvent) {
        if !event.is_terminal() {
            self.tracker.forward(event);
        } else if !self.finished.swap(true, Ordering::SeqCst) {
            self.tracker.finish(event);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SourceImage;
    use crate::config::CompressionLevel;
    use crate::events::{CollectingSink, NullSink};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Halves the file, counts calls and tracks peak concurrency.
    #[derive(Default)]
    struct FakeCodec {
        calls: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
        panic_on: Option<&'static str>,
    }

    impl Codec for FakeCodec {
        fn read(&self, path: &Path) -> Result<SourceImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(name) = self.panic_on {
                if path.file_name().and_then(|n| n.to_str()) == Some(name) {
                    panic!("codec exploded on {name}");
                }
            }
            Ok(SourceImage {
                format: ImageFormat::Png,
                data: fs::read(path)?,
            })
        }

        fn normalize(&self, source: SourceImage) -> Result<SourceImage> {
            Ok(source)
        }

        fn encode(&self, png: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(png[..png.len() / 2].to_vec())
        }
    }

    fn write_fake_files(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("img_{i:03}.png"));
                fs::write(&path, vec![7u8; 100 + i]).unwrap();
                path
            })
            .collect()
    }

    fn write_png(path: &Path) {
        let img = RgbaImage::from_fn(40, 40, |x, y| Rgba([(x * 6) as u8, (y * 6) as u8, 200, 255]));
        DynamicImage::ImageRgba8(img)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn options(workers: usize) -> BatchOptions {
        BatchOptions::new(None, None, Some(workers)).unwrap()
    }

    #[test]
    fn test_non_png_rejected_without_codec_call() {
        let temp_dir = TempDir::new().unwrap();
        let jpg = temp_dir.path().join("photo.jpg");
        fs::write(&jpg, b"jpeg bytes").unwrap();

        let coordinator = BatchCoordinator::new(FakeCodec::default());
        let report = coordinator.run_batch(&[&jpg], &options(2), &NullSink).unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(!report.results[0].success());
        assert_eq!(report.results[0].error_message(), Some("not a PNG file"));
        assert_eq!(coordinator.codec().calls.load(Ordering::SeqCst), 0);
        assert!(!temp_dir.path().join("photo_compressed.jpg").exists());
    }

    #[test]
    fn test_partial_failure_isolation() {
        let temp_dir = TempDir::new().unwrap();
        let mut inputs = Vec::new();
        for name in ["a.png", "b.png", "missing.png", "c.png"] {
            let path = temp_dir.path().join(name);
            if name != "missing.png" {
                write_png(&path);
            }
            inputs.push(path);
        }

        let report = run_batch(&inputs, &options(4), &NullSink).unwrap();

        assert_eq!(report.results.len(), 4);
        for (result, input) in report.results.iter().zip(&inputs) {
            assert_eq!(&result.input_path, input);
        }
        assert!(report.results[0].success());
        assert!(report.results[1].success());
        assert_eq!(report.results[2].error_message(), Some("input not found"));
        assert!(report.results[3].success());
        assert_eq!(report.summary.succeeded_count, 3);
        assert_eq!(report.summary.total_files, 4);
    }

    #[test]
    fn test_hundred_jobs_eight_workers() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_fake_files(temp_dir.path(), 100);
        let sink = CollectingSink::new();

        let coordinator = BatchCoordinator::new(FakeCodec::default());
        let report = coordinator.run_batch(&inputs, &options(8), &sink).unwrap();

        assert_eq!(report.results.len(), 100);
        let seen: HashSet<_> = report.results.iter().map(|r| r.input_path.clone()).collect();
        assert_eq!(seen.len(), 100);
        for (result, input) in report.results.iter().zip(&inputs) {
            assert_eq!(&result.input_path, input);
            assert!(result.success());
        }
        assert!(coordinator.codec().peak.load(Ordering::SeqCst) <= 8);

        let events = sink.into_events();
        let progress: Vec<f64> = events
            .iter()
            .filter(|e| e.is_terminal())
            .map(|e| e.overall_progress().unwrap())
            .collect();
        assert_eq!(progress.len(), 100);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.last().copied(), Some(100.0));
    }

    #[test]
    fn test_event_stream_is_bracketed() {
        let temp_dir = TempDir::new().unwrap();
        let mut inputs = write_fake_files(temp_dir.path(), 5);
        inputs.insert(2, temp_dir.path().join("notes.txt"));
        let sink = CollectingSink::new();

        let report = BatchCoordinator::new(FakeCodec::default())
            .run_batch(&inputs, &options(3), &sink)
            .unwrap();

        let events = sink.into_events();
        assert!(matches!(events.first(), Some(ProgressEvent::BatchStarted { total_jobs: 6 })));
        match events.last() {
            Some(ProgressEvent::BatchCompleted { results }) => assert_eq!(results, &report.results),
            other => panic!("unexpected last event: {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 6);
        assert_eq!(report.results[2].error_message(), Some("not a PNG file"));
    }

    #[test]
    fn test_output_dir_placement() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("icon.png");
        write_png(&input);
        let out_dir = temp_dir.path().join("out");

        let options = BatchOptions::new(Some(out_dir.clone()), Some(3), Some(1)).unwrap();
        let report = run_batch(&[&input], &options, &NullSink).unwrap();

        let expected = out_dir.join("icon_compressed.png");
        assert_eq!(report.results[0].output_path.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_duplicate_basenames_do_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a/shot.png");
        let second = temp_dir.path().join("b/shot.png");
        for path in [&first, &second] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, vec![1u8; 64]).unwrap();
        }
        let out_dir = temp_dir.path().join("out");
        let options = BatchOptions::new(Some(out_dir), None, Some(2)).unwrap();

        let coordinator = BatchCoordinator::new(FakeCodec::default());
        let report = coordinator.run_batch(&[&first, &second], &options, &NullSink).unwrap();

        assert!(report.results[0].success());
        assert!(!report.results[1].success());
        assert!(report.results[1]
            .error_message()
            .unwrap()
            .contains("already used by"));
        assert_eq!(coordinator.codec().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_output_over_another_input_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("a.png");
        let earlier_output = temp_dir.path().join("a_compressed.png");
        fs::write(&original, vec![1u8; 64]).unwrap();
        fs::write(&earlier_output, vec![2u8; 48]).unwrap();
        let options = BatchOptions::new(None, None, Some(1)).unwrap();

        let coordinator = BatchCoordinator::new(FakeCodec::default());
        let report = coordinator
            .run_batch(&[&original, &earlier_output], &options, &NullSink)
            .unwrap();

        assert!(!report.results[0].success());
        assert!(report.results[0]
            .error_message()
            .unwrap()
            .contains("already used by"));
        assert!(report.results[1].success());
        assert_eq!(report.results[1].original_size, 48);
        assert_eq!(fs::read(&earlier_output).unwrap(), vec![2u8; 48]);
        assert_eq!(coordinator.codec().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_workers_is_configuration_error() {
        let sink = CollectingSink::new();
        let options = BatchOptions {
            max_workers: Some(0),
            ..Default::default()
        };

        let result = run_batch(&["a.png"], &options, &sink);

        assert!(matches!(result, Err(CompressionError::InvalidWorkerCount(0))));
        assert!(sink.into_events().is_empty());
    }

    #[test]
    fn test_panicking_job_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_fake_files(temp_dir.path(), 4);
        let codec = FakeCodec {
            panic_on: Some("img_001.png"),
            ..Default::default()
        };
        let sink = CollectingSink::new();

        let report = BatchCoordinator::new(codec)
            .run_batch(&inputs, &options(2), &sink)
            .unwrap();

        assert_eq!(report.summary.succeeded_count, 3);
        let failed = &report.results[1];
        assert!(failed.error_message().unwrap().contains("codec exploded"));
        let terminal = sink.events().iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal, 4);
    }

    #[test]
    fn test_cancelled_batch_still_reports_every_job() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_fake_files(temp_dir.path(), 3);
        let token = CancellationToken::new();
        token.cancel();

        let coordinator = BatchCoordinator::new(FakeCodec::default()).with_cancellation(token);
        let report = coordinator.run_batch(&inputs, &options(2), &NullSink).unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(report
            .results
            .iter()
            .all(|r| r.error_message() == Some("cancelled")));
        assert_eq!(coordinator.codec().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_batch() {
        let sink = CollectingSink::new();
        let inputs: Vec<PathBuf> = Vec::new();

        let report = run_batch(&inputs, &options(1), &sink).unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.summary.average_percentage_saved, 0.0);
        assert_eq!(sink.into_events().len(), 2);
    }
}
