use anyhow::{Context, Result};
use clap::Parser;
use png_squeeze::cli::Args;
use png_squeeze::constants::{INFO_PREFIX, WARNING_PREFIX};
use png_squeeze::discovery::{collect_png_files, contains_png, png_count};
use png_squeeze::events::EventSink;
use png_squeeze::logger::{init_logging, Verbosity};
use png_squeeze::report::{print_summary, ConsoleSink, JsonLinesSink};
use png_squeeze::{run_batch, BatchOptions};

fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    let options = BatchOptions::new(
        args.output.clone(),
        Some(args.level),
        args.workers.map(|w| w as usize),
    )
    .context("invalid batch configuration")?;

    let files = collect_png_files(&args.input, args.recursive)
        .context("failed to expand input paths")?;

    if !contains_png(&files) {
        println!("{WARNING_PREFIX}  No PNG files found!");
        return Ok(());
    }

    if !args.json {
        println!("{INFO_PREFIX} Found {} PNG files to process", png_count(&files));
    }

    let sink: Box<dyn EventSink> = if args.json {
        Box::new(JsonLinesSink)
    } else {
        Box::new(ConsoleSink::new(!verbosity.is_quiet()))
    };

    let report = run_batch(&files, &options, sink.as_ref()).context("batch compression failed")?;

    if !args.json {
        print_summary(&report.summary);
    }

    Ok(())
}
