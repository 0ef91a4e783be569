//! Worker pool used by the batch drivers.
//!
//! By default work runs on Rayon's global pool, which is built once per
//! process with one thread per available hardware thread. A dedicated pool
//! with a fixed thread count can be built for callers that want to pin the
//! degree of parallelism.

use std::fmt;
use std::sync::Arc;

use rayon::{Scope, ThreadPool, ThreadPoolBuilder};

use crate::error::{FastcalcError, Result};

/// Handle to the threads that execute batch chunks.
///
/// Cloning is cheap; clones share the same threads.
#[derive(Clone, Default)]
pub struct WorkerPool {
    dedicated: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// The process-wide Rayon pool.
    pub fn global() -> Self {
        WorkerPool { dedicated: None }
    }

    /// A pool of exactly `threads` workers.
    ///
    /// Meant for tuning and for exercising fixed worker counts in tests; the
    /// `batch_*` functions never use it and run on [`WorkerPool::global`].
    ///
    /// # Errors
    ///
    /// [`FastcalcError::Pool`] if `threads` is zero or the OS refuses to
    /// spawn the threads.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(FastcalcError::Pool(
                "a worker pool needs at least one thread".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fastcalc-worker-{i}"))
            .build()
            .map_err(|e| FastcalcError::Pool(e.to_string()))?;

        tracing::debug!(threads, "built dedicated worker pool");

        Ok(WorkerPool {
            dedicated: Some(Arc::new(pool)),
        })
    }

    /// Number of worker threads; the concurrency degree used for chunking.
    pub fn thread_count(&self) -> usize {
        match &self.dedicated {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Runs `op` with a scope whose spawned tasks all finish before this
    /// returns.
    pub fn scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&Scope<'scope>) -> R + Send,
        R: Send,
    {
        match &self.dedicated {
            Some(pool) => pool.scope(op),
            None => rayon::scope(op),
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("dedicated", &self.dedicated.is_some())
            .field("threads", &self.thread_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_global_pool_matches_rayon() {
        let pool = WorkerPool::global();
        assert_eq!(pool.thread_count(), rayon::current_num_threads());
        assert!(pool.thread_count() >= 1);
    }

    #[test]
    fn test_dedicated_pool_thread_count() {
        let pool = WorkerPool::with_threads(3).unwrap();
        assert_eq!(pool.thread_count(), 3);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            WorkerPool::with_threads(0),
            Err(FastcalcError::Pool(_))
        ));
    }

    #[test]
    fn test_scope_joins_all_tasks() {
        let pool = WorkerPool::with_threads(2).unwrap();
        let counter = AtomicUsize::new(0);
        pool.scope(|s| {
            for _ in 0..16 {
                s.spawn(|_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
            }
        });
        assert_eq!(counter.load(Ordering::Relaxed), 16);
    }
}
