//! Overflow-aware scalar math with SIMD and Rayon accelerated batch variants.
//!
//! `fastcalc` evaluates power, square root, factorial and kinetic energy with
//! explicit domain and overflow policies. Every evaluation produces a value
//! together with an [`ErrorCode`]; faults never unwind across the API.
//!
//! Large inputs go through the batch drivers in [`batch`], which split the
//! index range across the Rayon worker pool and write into caller-owned
//! result and error-code buffers.
//!
//! ```rust
//! use fastcalc::{batch_power, safe_power, ErrorCode};
//!
//! let r = safe_power(2.0, 10.0);
//! assert_eq!(r.value, 1024.0);
//! assert_eq!(r.code, ErrorCode::Success);
//!
//! let bases = vec![2.0, -8.0, 0.0];
//! let exps = vec![3.0, 0.5, -1.0];
//! let mut values = vec![0.0; 3];
//! let mut codes = vec![ErrorCode::Success; 3];
//! batch_power(&bases, &exps, &mut values, &mut codes).unwrap();
//!
//! assert_eq!(values[0], 8.0);
//! assert_eq!(codes[1], ErrorCode::DomainError);
//! assert_eq!(codes[2], ErrorCode::DivisionByZero);
//! ```

pub mod batch;
pub mod cache;
pub mod error;
pub mod ops;
pub mod pool;
pub mod simd;
pub mod utils;

pub use batch::{batch_kinetic_energy, batch_power, batch_sqrt, DispatchConfig, Dispatcher};
pub use cache::MathCache;
pub use error::{ErrorCode, FastcalcError, Outcome, Result};
pub use ops::{kinetic_energy, safe_factorial, safe_power, safe_sqrt};
pub use pool::WorkerPool;
pub use simd::{vector_add, Backend, SimdAdd};

/// Inputs shorter than this run sequentially on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Size in bytes of one cache line.
pub const CACHE_LINE_SIZE: usize = 64;

/// Number of `f64` values in one cache line.
pub const CACHE_LINE_DOUBLES: usize = CACHE_LINE_SIZE / std::mem::size_of::<f64>();

/// Elements added to every odd chunk so neighbouring workers do not start on
/// the same cache-line phase.
pub const CHUNK_SKEW: usize = CACHE_LINE_DOUBLES * 2;

/// How far ahead, in elements, the add kernel prefetches.
pub const PREFETCH_DISTANCE: usize = CACHE_LINE_DOUBLES * 2;
