use crate::constants::{DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};
use crate::error::{CompressionError, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// PNG compression effort, 1 (fastest) to 9 (smallest output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub fn new(level: u8) -> Result<Self> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CompressionError::InvalidLevel(level));
        }
        Ok(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL)
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = CompressionError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated parameters for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub output_dir: Option<PathBuf>,
    pub level: CompressionLevel,
    pub max_workers: Option<usize>,
}

impl BatchOptions {
    pub fn new(
        output_dir: Option<PathBuf>,
        level: Option<u8>,
        max_workers: Option<usize>,
    ) -> Result<Self> {
        let level = match level {
            Some(level) => CompressionLevel::new(level)?,
            None => CompressionLevel::default(),
        };

        if let Some(0) = max_workers {
            return Err(CompressionError::InvalidWorkerCount(0));
        }

        Ok(Self {
            output_dir,
            level,
            max_workers,
        })
    }

    /// Re-checks invariants for options assembled by hand rather than via `new`.
    pub fn validate(&self) -> Result<()> {
        CompressionLevel::new(self.level.get())?;
        if let Some(0) = self.max_workers {
            return Err(CompressionError::InvalidWorkerCount(0));
        }
        Ok(())
    }

    /// Number of pool threads, falling back to the available CPU count.
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}
