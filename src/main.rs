use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use rs_aggregate::{run_pipeline, PipelineConfig};

/// Computes per-key min/mean/max over a `key;value` measurements file.
#[derive(Parser, Debug)]
#[command(name = "aggregate", version)]
struct Args {
    /// Path to the input file, one `key;value` record per line.
    input: PathBuf,

    /// Records per batch handed to a worker.
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Worker thread count; defaults to the available parallelism.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("aggregate: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    let lines = run_pipeline(&args.input, &config)
        .with_context(|| format!("aggregating {}", args.input.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for line in &lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}
