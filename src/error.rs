use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("input not found")]
    InputNotFound(PathBuf),

    #[error("not a PNG file")]
    UnsupportedFormat(PathBuf),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("PNG optimization error: {0}")]
    Optimize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output path {} already used by {}", output.display(), first_input.display())]
    OutputCollision { output: PathBuf, first_input: PathBuf },

    #[error("cancelled")]
    Cancelled,

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Invalid compression level: {0}. Must be between 1 and 9")]
    InvalidLevel(u8),

    #[error("Invalid worker count: {0}. Must be at least 1")]
    InvalidWorkerCount(usize),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Invalid glob pattern {0}")]
    Glob(String),
}

impl CompressionError {
    /// Errors in this class abort a whole batch before any job is dispatched.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CompressionError::InvalidLevel(_)
                | CompressionError::InvalidWorkerCount(_)
                | CompressionError::ThreadPool(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
