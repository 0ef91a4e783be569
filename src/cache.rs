//! Precomputed lookup tables for small factorials and square roots.
//!
//! A [`MathCache`] is a plain value: build one per execution context and
//! share it by reference. Nothing in it changes after construction, so it is
//! `Sync` without any locking.

use std::sync::OnceLock;

use num::{CheckedMul, NumCast, PrimInt};

/// Largest `n` whose factorial fits in an `i64`.
pub const MAX_FACTORIAL: usize = 20;

/// Largest integer whose square root is tabulated.
pub const MAX_CACHED_SQRT: usize = 100;

/// Computes `n!` in `T`, returning `None` as soon as a partial product
/// overflows.
///
/// ```rust
/// use fastcalc::cache::checked_factorial;
///
/// assert_eq!(checked_factorial::<i64>(20), Some(2_432_902_008_176_640_000));
/// assert_eq!(checked_factorial::<i64>(21), None);
/// assert_eq!(checked_factorial::<u8>(5), Some(120));
/// assert_eq!(checked_factorial::<u8>(6), None);
/// ```
pub fn checked_factorial<T>(n: u32) -> Option<T>
where
    T: PrimInt + CheckedMul,
{
    let mut acc = T::one();
    for i in 2..=n {
        let factor = <T as NumCast>::from(i)?;
        acc = acc.checked_mul(&factor)?;
    }
    Some(acc)
}

/// Sizes of the precomputed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub factorial_entries: usize,
    pub sqrt_entries: usize,
}

/// Factorials `0!..=20!` and square roots of `0..=100`.
#[derive(Debug, Clone)]
pub struct MathCache {
    factorials: [i64; MAX_FACTORIAL + 1],
    sqrts: [f64; MAX_CACHED_SQRT + 1],
}

impl MathCache {
    pub fn new() -> Self {
        let mut factorials = [1i64; MAX_FACTORIAL + 1];
        for (n, slot) in factorials.iter_mut().enumerate() {
            // Every entry up to MAX_FACTORIAL fits in i64.
            *slot = checked_factorial::<i64>(n as u32).unwrap_or(-1);
        }

        let mut sqrts = [0.0f64; MAX_CACHED_SQRT + 1];
        for (n, slot) in sqrts.iter_mut().enumerate() {
            *slot = (n as f64).sqrt();
        }

        MathCache { factorials, sqrts }
    }

    /// The process-wide instance used by the scalar entry points.
    pub fn shared() -> &'static MathCache {
        static SHARED: OnceLock<MathCache> = OnceLock::new();
        SHARED.get_or_init(MathCache::new)
    }

    /// `n!` for `0 <= n <= 20`, `None` outside the table.
    #[inline(always)]
    pub fn factorial(&self, n: i32) -> Option<i64> {
        usize::try_from(n)
            .ok()
            .and_then(|n| self.factorials.get(n).copied())
    }

    /// `sqrt(n)` from the table for `0 <= n <= 100`, computed otherwise.
    #[inline(always)]
    pub fn cached_sqrt(&self, n: i64) -> f64 {
        usize::try_from(n)
            .ok()
            .and_then(|i| self.sqrts.get(i).copied())
            .unwrap_or_else(|| (n as f64).sqrt())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            factorial_entries: self.factorials.len(),
            sqrt_entries: self.sqrts.len(),
        }
    }
}

impl Default for MathCache {
    fn default() -> Self {
        Self::new()
    }
}
