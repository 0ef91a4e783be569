//! Batch drivers for the scalar operations.
//!
//! A batch call takes caller-owned operand buffers and writes one value and
//! one [`ErrorCode`] per index into caller-owned output buffers. Inputs
//! shorter than [`PARALLEL_THRESHOLD`] are evaluated in a plain loop on the
//! calling thread. Longer inputs are split into one contiguous chunk per
//! worker and every chunk runs as a task on the [`WorkerPool`]; the call
//! returns once all chunks have finished.
//!
//! Chunking never changes results: index `i` always receives exactly what the
//! scalar operation returns for the operands at `i`. The one exception is a
//! chunk whose kernel panics, in which case every index of that chunk is set
//! to NaN with [`ErrorCode::InvalidArgument`] and all other chunks are kept.
//! A sequential call is a single chunk covering the whole range.
//!
//! ```rust
//! use fastcalc::{batch_sqrt, safe_sqrt, ErrorCode};
//!
//! let xs: Vec<f64> = (0..20_000).map(|i| i as f64 - 10.0).collect();
//! let mut values = vec![0.0; xs.len()];
//! let mut codes = vec![ErrorCode::Success; xs.len()];
//!
//! batch_sqrt(&xs, &mut values, &mut codes).unwrap();
//!
//! assert_eq!(codes[0], ErrorCode::DomainError);
//! assert_eq!(values[26], 4.0);
//! assert_eq!(values[12_345], safe_sqrt(xs[12_345]).value);
//! ```

use std::any::Any;
use std::mem;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use crate::cache::MathCache;
use crate::error::{validation_error, ErrorCode, Outcome, Result};
use crate::ops::{kinetic_energy, power_cached, sqrt_cached};
use crate::pool::WorkerPool;
use crate::simd::{prefetch_read, Backend};
use crate::utils::all_aligned;
use crate::{CACHE_LINE_DOUBLES, CHUNK_SKEW, PARALLEL_THRESHOLD};

/// Tuning knobs for a [`Dispatcher`].
///
/// None of these affect results, only how the work is partitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Inputs shorter than this run sequentially.
    pub parallel_threshold: usize,
    /// Number of chunks a parallel call is split into.
    pub workers: usize,
    /// Extra elements given to every odd chunk.
    pub chunk_skew: usize,
    /// Backend whose lane width and alignment drive the chunk inner loop.
    pub backend: Backend,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            parallel_threshold: PARALLEL_THRESHOLD,
            workers: WorkerPool::global().thread_count(),
            chunk_skew: CHUNK_SKEW,
            backend: Backend::detect(),
        }
    }
}

impl DispatchConfig {
    /// Overrides the chunk count, clamped to at least one.
    ///
    /// A tuning and testing knob: the `batch_*` functions always split by
    /// the detected hardware concurrency. Results do not depend on it.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    pub fn with_chunk_skew(mut self, chunk_skew: usize) -> Self {
        self.chunk_skew = chunk_skew;
        self
    }

    /// Uses `backend` when it is available on this machine, the scalar
    /// grouping otherwise.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = if backend.is_available() {
            backend
        } else {
            Backend::Scalar
        };
        self
    }
}

/// Splits batch calls into chunks and runs them on a [`WorkerPool`].
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
    pool: WorkerPool,
}

impl Dispatcher {
    /// A dispatcher running on the global pool.
    pub fn new(config: DispatchConfig) -> Self {
        Dispatcher {
            config,
            pool: WorkerPool::global(),
        }
    }

    /// A dispatcher on `pool`, one chunk per pool thread.
    pub fn on_pool(pool: WorkerPool) -> Self {
        let config = DispatchConfig::default().with_workers(pool.thread_count());
        Dispatcher { config, pool }
    }

    /// The process-wide dispatcher behind the `batch_*` functions.
    pub fn shared() -> &'static Dispatcher {
        static SHARED: OnceLock<Dispatcher> = OnceLock::new();
        SHARED.get_or_init(Dispatcher::default)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Whether a call of length `len` takes the parallel path.
    #[inline(always)]
    pub fn is_parallel(&self, len: usize) -> bool {
        len >= self.config.parallel_threshold
    }

    /// Chunk ranges a parallel call of length `len` is split into.
    ///
    /// The ranges are contiguous, disjoint, and cover `0..len`. Each worker
    /// gets `len / workers` indices, the last chunk also takes the remainder,
    /// and odd chunks are widened by the configured skew (capped at half a
    /// chunk) at the expense of their right neighbour.
    pub fn plan(&self, len: usize) -> Vec<Range<usize>> {
        let workers = self.config.workers.max(1).min(len.max(1));
        let base = len / workers;
        let skew = self.config.chunk_skew.min(base / 2);

        let mut chunks = Vec::with_capacity(workers);
        let mut start = 0;
        for t in 0..workers {
            let end = if t == workers - 1 {
                len
            } else {
                let widen = if t % 2 == 1 { skew } else { 0 };
                ((t + 1) * base + widen).clamp(start, len)
            };
            chunks.push(start..end);
            start = end;
        }
        chunks
    }

    /// Element-wise [`crate::safe_power`].
    ///
    /// # Errors
    ///
    /// [`crate::FastcalcError::Validation`] if the four buffers differ in
    /// length. Per-element faults are reported through `codes`.
    pub fn power(
        &self,
        bases: &[f64],
        exponents: &[f64],
        values: &mut [f64],
        codes: &mut [ErrorCode],
    ) -> Result<()> {
        self.map_binary(bases, exponents, values, codes, power_cached)
    }

    /// Element-wise [`crate::safe_sqrt`].
    pub fn sqrt(&self, xs: &[f64], values: &mut [f64], codes: &mut [ErrorCode]) -> Result<()> {
        self.map_unary(xs, values, codes, sqrt_cached)
    }

    /// Element-wise [`crate::kinetic_energy`].
    pub fn kinetic_energy(
        &self,
        masses: &[f64],
        velocities: &[f64],
        values: &mut [f64],
        codes: &mut [ErrorCode],
    ) -> Result<()> {
        self.map_binary(masses, velocities, values, codes, |_, m, v| {
            kinetic_energy(m, v)
        })
    }

    /// Runs a one-operand kernel over `xs`.
    pub fn map_unary<F>(
        &self,
        xs: &[f64],
        values: &mut [f64],
        codes: &mut [ErrorCode],
        op: F,
    ) -> Result<()>
    where
        F: Fn(&MathCache, f64) -> Outcome<f64> + Sync,
    {
        self.map_binary(xs, xs, values, codes, |cache, x, _| op(cache, x))
    }

    /// Runs a two-operand kernel over `a` and `b`.
    ///
    /// `op` receives the lookup tables of the execution context it runs in.
    /// A panic in `op` never reaches the caller: it invalidates the chunk it
    /// happened in, or the whole range on the sequential path.
    pub fn map_binary<F>(
        &self,
        a: &[f64],
        b: &[f64],
        values: &mut [f64],
        codes: &mut [ErrorCode],
        op: F,
    ) -> Result<()>
    where
        F: Fn(&MathCache, f64, f64) -> Outcome<f64> + Sync,
    {
        let len = a.len();
        if b.len() != len || values.len() != len || codes.len() != len {
            return Err(validation_error(format!(
                "batch buffers must have equal lengths, got operands {}/{}, values {}, codes {}",
                len,
                b.len(),
                values.len(),
                codes.len()
            )));
        }

        if !self.is_parallel(len) {
            tracing::trace!(len, "sequential batch");
            run_chunk(MathCache::shared(), 0, self.config.backend, a, b, values, codes, &op);
            return Ok(());
        }

        let plan = self.plan(len);
        let backend = self.config.backend;
        tracing::debug!(len, chunks = plan.len(), backend = %backend, "parallel batch");

        let op = &op;
        self.pool.scope(move |s| {
            let mut values_rest = values;
            let mut codes_rest = codes;

            for range in plan {
                let (values_chunk, values_tail) = mem::take(&mut values_rest).split_at_mut(range.len());
                let (codes_chunk, codes_tail) = mem::take(&mut codes_rest).split_at_mut(range.len());
                values_rest = values_tail;
                codes_rest = codes_tail;

                let a_chunk = &a[range.clone()];
                let b_chunk = &b[range.clone()];

                s.spawn(move |_| {
                    let cache = MathCache::new();
                    run_chunk(
                        &cache,
                        range.start,
                        backend,
                        a_chunk,
                        b_chunk,
                        values_chunk,
                        codes_chunk,
                        op,
                    )
                });
            }
        });

        Ok(())
    }
}

/// Evaluates one chunk, or the whole range on the sequential path.
#[allow(clippy::too_many_arguments)]
fn run_chunk<F>(
    cache: &MathCache,
    start: usize,
    backend: Backend,
    a: &[f64],
    b: &[f64],
    values: &mut [f64],
    codes: &mut [ErrorCode],
    op: &F,
) where
    F: Fn(&MathCache, f64, f64) -> Outcome<f64>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        eval_chunk(cache, backend, a, b, values, codes, op);
    }));

    if let Err(payload) = outcome {
        tracing::warn!(
            start,
            len = values.len(),
            reason = panic_message(payload.as_ref()),
            "batch chunk failed, marking it invalid"
        );
        values.fill(f64::NAN);
        codes.fill(ErrorCode::InvalidArgument);
    }
}

/// Lane-grouped evaluation when every buffer is aligned, scalar otherwise.
///
/// Grouping only changes the traversal: each element is still evaluated by
/// `op` on its own, so domain and overflow checks stay per element.
fn eval_chunk<F>(
    cache: &MathCache,
    backend: Backend,
    a: &[f64],
    b: &[f64],
    values: &mut [f64],
    codes: &mut [ErrorCode],
    op: &F,
) where
    F: Fn(&MathCache, f64, f64) -> Outcome<f64>,
{
    let lane = backend.lane_width();
    let aligned = all_aligned(
        &[
            a.as_ptr().cast(),
            b.as_ptr().cast(),
            values.as_ptr().cast(),
            codes.as_ptr().cast(),
        ],
        backend.alignment(),
    );

    let grouped = if aligned { a.len() - a.len() % lane } else { 0 };

    let (a_head, a_tail) = a.split_at(grouped);
    let (b_head, b_tail) = b.split_at(grouped);
    let (values_head, values_tail) = values.split_at_mut(grouped);
    let (codes_head, codes_tail) = codes.split_at_mut(grouped);

    for (((a_group, b_group), values_group), codes_group) in a_head
        .chunks_exact(lane)
        .zip(b_head.chunks_exact(lane))
        .zip(values_head.chunks_exact_mut(lane))
        .zip(codes_head.chunks_exact_mut(lane))
    {
        prefetch_read(a_group.as_ptr().wrapping_add(CACHE_LINE_DOUBLES));
        prefetch_read(b_group.as_ptr().wrapping_add(CACHE_LINE_DOUBLES));

        eval_into(cache, a_group, b_group, values_group, codes_group, op);
    }

    eval_into(cache, a_tail, b_tail, values_tail, codes_tail, op);
}

#[inline(always)]
fn eval_into<F>(
    cache: &MathCache,
    a: &[f64],
    b: &[f64],
    values: &mut [f64],
    codes: &mut [ErrorCode],
    op: &F,
) where
    F: Fn(&MathCache, f64, f64) -> Outcome<f64>,
{
    for (((&x, &y), value), code) in a.iter().zip(b).zip(values.iter_mut()).zip(codes.iter_mut()) {
        let outcome = op(cache, x, y);
        *value = outcome.value;
        *code = outcome.code;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Element-wise [`crate::safe_power`] over caller-owned buffers.
///
/// # Errors
///
/// [`crate::FastcalcError::Validation`] if the buffers differ in length.
pub fn batch_power(
    bases: &[f64],
    exponents: &[f64],
    values: &mut [f64],
    codes: &mut [ErrorCode],
) -> Result<()> {
    Dispatcher::shared().power(bases, exponents, values, codes)
}

/// Element-wise [`crate::safe_sqrt`] over caller-owned buffers.
pub fn batch_sqrt(xs: &[f64], values: &mut [f64], codes: &mut [ErrorCode]) -> Result<()> {
    Dispatcher::shared().sqrt(xs, values, codes)
}

/// Element-wise [`crate::kinetic_energy`] over caller-owned buffers.
pub fn batch_kinetic_energy(
    masses: &[f64],
    velocities: &[f64],
    values: &mut [f64],
    codes: &mut [ErrorCode],
) -> Result<()> {
    Dispatcher::shared().kinetic_energy(masses, velocities, values, codes)
}
