//! Streaming `key;value` aggregation: per distinct key, the minimum,
//! mean, and maximum of every value in a large delimited text file.
//!
//! The pipeline is a single-shot, strictly forward flow: a batch reader
//! splits the input into line-aligned batches, a bounded worker pool
//! folds each batch into an independent partial aggregate, the partials
//! are merged through an associative commutative operator, and the merged
//! state is finalized and rendered sorted by key. The first I/O failure
//! or malformed record fails the whole run; nothing partial is emitted.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use log::info;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod format;
pub mod reader;
pub mod record;
pub mod scheduler;

pub use aggregate::{fold_batch, merge_partial, PartialAggregate, Stats};
pub use config::PipelineConfig;
pub use error::AggregateError;
pub use format::{finalize, render, FinalStats};
pub use reader::{Batch, BatchReader};
pub use record::{parse_record, MalformedKind, Record};

/// Aggregates the file at `path` and returns the formatted output lines,
/// sorted by key. An empty input is an empty, successful result.
pub fn run_pipeline(path: &Path, config: &PipelineConfig) -> Result<Vec<String>, AggregateError> {
    let started = Instant::now();
    let file = File::open(path)?;
    let reader = BatchReader::new(BufReader::new(file), config.batch_size);
    let merged = scheduler::run(reader, config)?;
    info!(
        "aggregated {} keys with {} workers in {:.3?}",
        merged.len(),
        config.workers,
        started.elapsed()
    );
    let entries = finalize(merged);
    Ok(render(&entries))
}
