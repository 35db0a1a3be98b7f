use crate::constants::{DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "png-squeeze",
    about = "Compress PNG images in parallel with negligible quality loss",
    long_about = "png-squeeze losslessly re-encodes PNG files to reduce their size. \
                  Inputs can be files, directories or glob patterns; every file is \
                  processed on a bounded worker pool and one bad file never stops the batch.",
    version,
    after_help = "EXAMPLES:\n  \
    png-squeeze screenshot.png\n  \
    png-squeeze ./assets -r -o ./compressed -l 9\n  \
    png-squeeze \"./icons/*.png\" -j 4 --json"
)]
pub struct Args {
    #[arg(
        required = true,
        help = "Input PNG files, directories or glob patterns",
        long_help = "One or more PNG files, directories containing PNG files, or glob patterns. \
                     Directories are scanned for files with a .png extension."
    )]
    pub input: Vec<String>,

    #[arg(
        short = 'o',
        long,
        help = "Output directory for compressed images",
        long_help = "Directory that receives <name>_compressed.png for every input. \
                     If omitted, each compressed file is written beside its source."
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        default_value_t = DEFAULT_LEVEL,
        value_parser = clap::value_parser!(u8).range(MIN_LEVEL as i64..=MAX_LEVEL as i64),
        help = "Compression level (1-9, default: 6)",
        long_help = "Optimization effort from 1 (fastest) to 9 (smallest output, uses Zopfli). \
                     Higher levels take longer but never change pixel data."
    )]
    pub level: u8,

    #[arg(
        short = 'r',
        long,
        help = "Process subdirectories recursively",
        long_help = "Descend into subdirectories when an input is a directory; \
                     otherwise only its immediate files are scanned."
    )]
    pub recursive: bool,

    #[arg(
        short = 'j',
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Number of parallel workers (default: auto)",
        long_help = "Maximum number of files compressed at once. \
                     If not specified, uses the number of CPU cores."
    )]
    pub workers: Option<u64>,

    #[arg(long, help = "Print progress events as JSON lines")]
    pub json: bool,

    #[arg(short = 'q', long, conflicts_with = "verbose", help = "Only log errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, help = "Enable debug logging")]
    pub verbose: bool,
}
