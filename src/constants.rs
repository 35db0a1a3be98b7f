pub const DEFAULT_LEVEL: u8 = 6;
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 9;

/// Highest oxipng preset; levels above it only raise deflate effort.
pub const MAX_OXIPNG_PRESET: u8 = 6;
pub const LIBDEFLATER_LEVEL_OFFSET: u8 = 3;
pub const ZOPFLI_ITERATIONS: u8 = 15;

pub const PNG_EXTENSION: &str = "png";
pub const COMPRESSED_SUFFIX: &str = "_compressed";

/// Percent reported by `JobProgress` once the source is loaded and normalized.
pub const LOADED_PROGRESS_PERCENT: f64 = 50.0;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
pub const PROGRESS_CHARS: &str = "#>-";

// Common output message prefixes
pub const SUCCESS_PREFIX: &str = "✅";
pub const WARNING_PREFIX: &str = "⚠️";
pub const ERROR_PREFIX: &str = "❌";
pub const INFO_PREFIX: &str = "📋";
