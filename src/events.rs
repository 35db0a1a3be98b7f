//! Progress events and the sinks that consume them.
//!
//! The batch coordinator only ever talks to `&dyn EventSink`, so the same run
//! can drive the console printer, a JSON stream, a test collector or a UI
//! thread fed through [`ChannelSink`].

use crate::model::CompressionResult;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        total_jobs: usize,
    },
    JobStarted {
        input_path: PathBuf,
    },
    JobProgress {
        input_path: PathBuf,
        percent_complete: f64,
    },
    JobCompleted {
        result: CompressionResult,
        /// Filled in by the batch coordinator; `None` for standalone jobs.
        overall_progress: Option<f64>,
    },
    JobFailed {
        input_path: PathBuf,
        error_message: String,
        overall_progress: Option<f64>,
    },
    BatchCompleted {
        results: Vec<CompressionResult>,
    },
}

impl ProgressEvent {
    /// True for the single per-job event that closes a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::JobCompleted { .. } | ProgressEvent::JobFailed { .. }
        )
    }

    pub fn input_path(&self) -> Option<&PathBuf> {
        match self {
            ProgressEvent::JobStarted { input_path }
            | ProgressEvent::JobProgress { input_path, .. }
            | ProgressEvent::JobFailed { input_path, .. } => Some(input_path),
            ProgressEvent::JobCompleted { result, .. } => Some(&result.input_path),
            ProgressEvent::BatchStarted { .. } | ProgressEvent::BatchCompleted { .. } => None,
        }
    }

    pub fn overall_progress(&self) -> Option<f64> {
        match self {
            ProgressEvent::JobCompleted {
                overall_progress, ..
            }
            | ProgressEvent::JobFailed {
                overall_progress, ..
            } => *overall_progress,
            _ => None,
        }
    }

    pub(crate) fn with_overall_progress(self, progress: f64) -> Self {
        match self {
            ProgressEvent::JobCompleted { result, .. } => ProgressEvent::JobCompleted {
                result,
                overall_progress: Some(progress),
            },
            ProgressEvent::JobFailed {
                input_path,
                error_message,
                ..
            } => ProgressEvent::JobFailed {
                input_path,
                error_message,
                overall_progress: Some(progress),
            },
            other => other,
        }
    }
}

/// Consumer of progress events. Called concurrently from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> EventSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Forwards events over a channel, for front ends that run the batch on a
/// background thread and drain events on their own loop.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    pub fn unbounded() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A closed receiver means the front end went away; the batch still finishes.
        let _ = self.sender.send(event);
    }
}
