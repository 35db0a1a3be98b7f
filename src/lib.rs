pub mod batch;
pub mod cli;
pub mod codec;
pub mod compressor;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod events;
pub mod logger;
pub mod model;
pub mod report;

pub use batch::{run_batch, BatchCoordinator, BatchReport};
pub use codec::{Codec, OxipngCodec, SourceImage};
pub use compressor::{compress_file, compress_image, CancellationToken};
pub use config::{BatchOptions, CompressionLevel};
pub use error::{CompressionError, Result};
pub use events::{ChannelSink, CollectingSink, EventSink, NullSink, ProgressEvent};
pub use model::{
    default_output_path, is_png_file, output_path_in, BatchSummary, CompressionJob,
    CompressionResult, JobOutcome,
};
