use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use crate::aggregate::{fold_batch, merge_partial, PartialAggregate};
use crate::config::PipelineConfig;
use crate::error::AggregateError;
use crate::reader::{Batch, BatchReader};

/// Runs the parallel phase of the pipeline: a single producer feeding a
/// bounded batch queue, `config.workers` folding workers, and a serial
/// merge of their partials on the calling thread.
///
/// Partials arrive in whatever order workers finish; the merge operator is
/// associative and commutative, so the result does not depend on it. On
/// the first error no new batches are dispatched, in-flight batches drain
/// unfolded, and the error tied to the lowest input line number is the one
/// returned.
pub fn run<R>(
    reader: BatchReader<R>,
    config: &PipelineConfig,
) -> Result<PartialAggregate, AggregateError>
where
    R: BufRead + Send + 'static,
{
    let worker_count = config.workers.max(1);
    let (batch_tx, batch_rx) = bounded::<Batch>(config.queue_capacity.max(1));
    let (result_tx, result_rx) = bounded::<Result<PartialAggregate, AggregateError>>(worker_count);
    let cancel = Arc::new(AtomicBool::new(false));

    let producer = {
        let cancel = Arc::clone(&cancel);
        thread::spawn(move || produce(reader, batch_tx, &cancel))
    };

    let workers: Vec<_> = (0..worker_count)
        .map(|_| {
            let batch_rx = batch_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = Arc::clone(&cancel);
            thread::spawn(move || consume(batch_rx, result_tx, &cancel))
        })
        .collect();
    // only worker clones remain; the result channel closes once they exit
    drop(batch_rx);
    drop(result_tx);

    let (merged, partials, first_error) = merge_results(result_rx, &cancel);

    let produced = producer.join().expect("batch producer panicked");
    for worker in workers {
        worker.join().expect("aggregation worker panicked");
    }
    debug!("merged {partials} partial aggregates, {} keys", merged.len());

    if let Some(err) = first_error {
        return Err(err);
    }
    // a read failure at stream position N follows every batch produced
    // before it, so a record-level error (handled above) always refers to
    // an earlier line and takes precedence
    produced?;
    Ok(merged)
}

/// Producer loop: pull batches off the reader and push them into the
/// bounded queue, blocking when it is full. Stops at end of input, on
/// cancellation, or on the first read error, which it carries back.
fn produce<R: BufRead>(
    reader: BatchReader<R>,
    batch_tx: Sender<Batch>,
    cancel: &AtomicBool,
) -> Result<(), AggregateError> {
    let mut dispatched = 0u64;
    for batch in reader {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let batch = batch?;
        if batch_tx.send(batch).is_err() {
            break;
        }
        dispatched += 1;
    }
    debug!("dispatched {dispatched} batches");
    Ok(())
}

/// Worker loop: fold each batch into its own partial and hand it off.
/// After cancellation the loop keeps receiving so the producer is never
/// left blocked on a full queue, but batches are dropped unfolded.
fn consume(
    batch_rx: Receiver<Batch>,
    result_tx: Sender<Result<PartialAggregate, AggregateError>>,
    cancel: &AtomicBool,
) {
    while let Ok(batch) = batch_rx.recv() {
        if cancel.load(Ordering::Relaxed) {
            continue;
        }
        let result = fold_batch(&batch);
        if result.is_err() {
            cancel.store(true, Ordering::Relaxed);
        }
        if result_tx.send(result).is_err() {
            break;
        }
    }
}

/// Drains completed partials, folding them into one accumulator. Errors
/// trigger cancellation; when several arrive, the lowest line number wins.
fn merge_results(
    result_rx: Receiver<Result<PartialAggregate, AggregateError>>,
    cancel: &AtomicBool,
) -> (PartialAggregate, u64, Option<AggregateError>) {
    let mut merged = PartialAggregate::default();
    let mut partials = 0u64;
    let mut first_error: Option<AggregateError> = None;
    for result in result_rx.iter() {
        match result {
            Ok(partial) => {
                if first_error.is_none() {
                    merge_partial(&mut merged, partial);
                    partials += 1;
                }
            }
            Err(err) => {
                cancel.store(true, Ordering::Relaxed);
                let earlier = first_error
                    .as_ref()
                    .map_or(true, |held| err.line() < held.line());
                if earlier {
                    first_error = Some(err);
                }
            }
        }
    }
    (merged, partials, first_error)
}
