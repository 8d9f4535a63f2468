//! Bounded worker pool for per-frame work.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{MediaError, MediaResult};

/// Build a pool of exactly `workers` threads.
///
/// Work submitted through [`ThreadPool::install`] with indexed parallel
/// iterators collects results in input order, whatever order workers
/// finish in.
pub fn build_pool(workers: usize) -> MediaResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("tlapse-worker-{i}"))
        .build()
        .map_err(|e| MediaError::internal(format!("Failed to build worker pool: {e}")))
}
