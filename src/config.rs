use std::thread;

/// Records per batch handed to a worker.
pub const DEFAULT_BATCH_SIZE: usize = 1 << 16;

/// Pending-batch queue capacity, as a multiple of the worker count. Peak
/// memory is bounded by `queue_capacity * batch_size` records in flight.
const QUEUE_FACTOR: usize = 4;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism().map(usize::from).unwrap_or(1);
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers,
            queue_capacity: workers * QUEUE_FACTOR,
        }
    }
}

impl PipelineConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the worker count and re-derives the queue capacity from it.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.queue_capacity = self.workers * QUEUE_FACTOR;
        self
    }
}
