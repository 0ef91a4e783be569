//! Scalar safe operations.
//!
//! Each operation takes plain numbers and returns an [`Outcome`]: the value
//! plus the [`ErrorCode`] describing any fault. Domain and overflow checks are
//! applied per call, so these are also the per-element kernels used by the
//! batch drivers.
//!
//! The `*_cached` variants take the lookup tables explicitly; the `safe_*`
//! wrappers use [`MathCache::shared`].

use crate::cache::MathCache;
use crate::error::{ErrorCode, Outcome};

/// Tolerance under which an exponent counts as an integer.
pub const INTEGRAL_TOLERANCE: f64 = 1e-12;

/// Magnitude above which a general power result is clamped.
pub const OVERFLOW_LIMIT: f64 = 1e300;

/// Non-zero magnitude below which a general power result is clamped.
pub const UNDERFLOW_LIMIT: f64 = 1e-300;

/// Largest exponent handled by repeated squaring.
pub const MAX_SQUARING_EXPONENT: i64 = 64;

#[inline(always)]
fn is_small_integral(x: f64) -> bool {
    x >= 0.0 && x <= crate::cache::MAX_CACHED_SQRT as f64 && x == x.floor()
}

/// `base` raised to `exponent`, see [`safe_power`].
pub fn power_cached(cache: &MathCache, base: f64, exponent: f64) -> Outcome<f64> {
    if exponent == 0.0 {
        return Outcome::ok(1.0);
    }
    if exponent == 1.0 {
        return Outcome::ok(base);
    }
    if exponent == 2.0 {
        return Outcome::ok(base * base);
    }
    if exponent == 0.5 {
        if base < 0.0 {
            return Outcome::fault(f64::NAN, ErrorCode::DomainError);
        }
        if is_small_integral(base) {
            return Outcome::ok(cache.cached_sqrt(base as i64));
        }
        let root = base.sqrt();
        if root.is_infinite() {
            return Outcome::fault(root, ErrorCode::OverflowError);
        }
        return Outcome::ok(root);
    }

    if (exponent - exponent.floor()).abs() < INTEGRAL_TOLERANCE {
        let int_exp = exponent as i64;

        match int_exp {
            3 => return Outcome::ok(base * base * base),
            4 => {
                let sq = base * base;
                return Outcome::ok(sq * sq);
            }
            -1 => {
                if base == 0.0 {
                    return Outcome::fault(f64::NAN, ErrorCode::DivisionByZero);
                }
                return Outcome::ok(1.0 / base);
            }
            -2 => {
                if base == 0.0 {
                    return Outcome::fault(f64::NAN, ErrorCode::DivisionByZero);
                }
                return Outcome::ok(1.0 / (base * base));
            }
            1..=MAX_SQUARING_EXPONENT => return power_by_squaring(base, int_exp as u64),
            _ => {}
        }
    }

    if base < 0.0 && exponent % 1.0 != 0.0 {
        return Outcome::fault(f64::NAN, ErrorCode::DomainError);
    }

    clamp_general(base.powf(exponent))
}

/// Exponentiation by squaring on `|base|`, sign restored for odd `n`.
///
/// Every product goes through a fused multiply-add. The first product that
/// is not finite stops the loop and is returned as the partial value.
fn power_by_squaring(base: f64, n: u64) -> Outcome<f64> {
    let negative_base = base < 0.0;
    let odd_exponent = n % 2 == 1;

    let mut result = 1.0f64;
    let mut current = base.abs();
    let mut n = n;

    while n > 0 {
        if n & 1 == 1 {
            result = result.mul_add(current, 0.0);
            if !result.is_finite() {
                return Outcome::fault(result, ErrorCode::OverflowError);
            }
        }
        current = current.mul_add(current, 0.0);
        if !current.is_finite() {
            return Outcome::fault(current, ErrorCode::OverflowError);
        }
        n >>= 1;
    }

    if negative_base && odd_exponent {
        result = -result;
    }
    Outcome::ok(result)
}

fn clamp_general(result: f64) -> Outcome<f64> {
    if result.abs() > OVERFLOW_LIMIT {
        Outcome::fault(OVERFLOW_LIMIT.copysign(result), ErrorCode::OverflowError)
    } else if result.abs() < UNDERFLOW_LIMIT && result != 0.0 {
        Outcome::fault(UNDERFLOW_LIMIT.copysign(result), ErrorCode::UnderflowError)
    } else if result.is_nan() {
        Outcome::fault(result, ErrorCode::RangeError)
    } else {
        Outcome::ok(result)
    }
}

/// Square root of `x`, see [`safe_sqrt`].
pub fn sqrt_cached(cache: &MathCache, x: f64) -> Outcome<f64> {
    if x < 0.0 {
        return Outcome::fault(f64::NAN, ErrorCode::DomainError);
    }
    if x == 0.0 {
        return Outcome::ok(0.0);
    }
    if is_small_integral(x) {
        return Outcome::ok(cache.cached_sqrt(x as i64));
    }

    let root = x.sqrt();
    if root.is_infinite() {
        Outcome::fault(root, ErrorCode::OverflowError)
    } else {
        Outcome::ok(root)
    }
}

/// `n!` as an `i64`, see [`safe_factorial`].
pub fn factorial_cached(cache: &MathCache, n: i32) -> Outcome<i64> {
    if n < 0 {
        return Outcome::fault(-1, ErrorCode::DomainError);
    }
    match cache.factorial(n) {
        Some(value) => Outcome::ok(value),
        // 21! and beyond do not fit in an i64.
        None => Outcome::fault(-1, ErrorCode::OverflowError),
    }
}

/// Overflow-aware power.
///
/// - `exponent == 0` gives `1.0` for every base, zero included.
/// - `exponent == 0.5` rejects negative bases and reads small integral bases
///   from the square-root table.
/// - Integral exponents up to 64 use repeated squaring; the first non-finite
///   product reports [`ErrorCode::OverflowError`].
/// - `0^-1` and `0^-2` report [`ErrorCode::DivisionByZero`].
/// - A negative base with a fractional exponent reports
///   [`ErrorCode::DomainError`].
/// - Otherwise the result of `powf` is clamped to `±1e300` (overflow) or
///   `±1e-300` (underflow), and NaN reports [`ErrorCode::RangeError`].
///
/// ```rust
/// use fastcalc::{safe_power, ErrorCode};
///
/// assert_eq!(safe_power(0.0, 0.0).value, 1.0);
/// assert_eq!(safe_power(-2.0, 3.0).value, -8.0);
/// assert_eq!(safe_power(-2.0, 0.5).code, ErrorCode::DomainError);
/// assert_eq!(safe_power(10.0, 400.0).value, 1e300);
/// ```
#[inline]
pub fn safe_power(base: f64, exponent: f64) -> Outcome<f64> {
    power_cached(MathCache::shared(), base, exponent)
}

/// Square root that rejects negative input.
///
/// ```rust
/// use fastcalc::{safe_sqrt, ErrorCode};
///
/// assert_eq!(safe_sqrt(16.0).value, 4.0);
/// assert_eq!(safe_sqrt(-1.0).code, ErrorCode::DomainError);
/// ```
#[inline]
pub fn safe_sqrt(x: f64) -> Outcome<f64> {
    sqrt_cached(MathCache::shared(), x)
}

/// Factorial of `n`, `-1` with a fault code outside `0..=20`.
///
/// ```rust
/// use fastcalc::{safe_factorial, ErrorCode};
///
/// assert_eq!(safe_factorial(5).value, 120);
/// assert_eq!(safe_factorial(21).code, ErrorCode::OverflowError);
/// ```
#[inline]
pub fn safe_factorial(n: i32) -> Outcome<i64> {
    factorial_cached(MathCache::shared(), n)
}

/// `0.5 * mass * velocity^2`, rejecting negative inputs.
///
/// ```rust
/// use fastcalc::kinetic_energy;
///
/// assert_eq!(kinetic_energy(2.0, 3.0).value, 9.0);
/// ```
#[inline]
pub fn kinetic_energy(mass: f64, velocity: f64) -> Outcome<f64> {
    if mass < 0.0 || velocity < 0.0 {
        return Outcome::fault(f64::NAN, ErrorCode::DomainError);
    }

    let energy = (0.5 * mass).mul_add(velocity, 0.0) * velocity;
    if energy.is_infinite() {
        Outcome::fault(energy, ErrorCode::OverflowError)
    } else {
        Outcome::ok(energy)
    }
}
