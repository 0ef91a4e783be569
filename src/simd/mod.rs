//! Vectorized element-wise kernels.
//!
//! A [`Backend`] names one instruction set the add kernel can run on. The
//! widest one the CPU supports is picked once at runtime by
//! [`Backend::detect`]; every backend processes full lanes with aligned loads
//! and stores when all buffers sit on its alignment boundary, unaligned ones
//! otherwise, and finishes the tail either with masked lanes (AVX-512) or a
//! scalar loop.
//!
//! | Backend | f64 lanes | Alignment | Tail |
//! |---------|-----------|-----------|------|
//! | AVX-512F | 8 | 64 bytes | masked load/store |
//! | AVX2 | 4 | 32 bytes | scalar |
//! | NEON | 2 | 16 bytes | scalar |
//! | Scalar | 4 (grouping only) | 32 bytes | scalar |

use std::fmt;
use std::sync::OnceLock;

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;

#[cfg(all(target_arch = "x86_64", avx512))]
pub(crate) mod avx512;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

pub(crate) mod scalar;

pub mod traits;

pub use traits::SimdAdd;

use crate::error::{validation_error, Result};

/// Instruction set used by the vectorized kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Avx512,
    Avx2,
    Neon,
    Scalar,
}

impl Backend {
    /// All backends, widest first.
    pub const ALL: [Backend; 4] = [
        Backend::Avx512,
        Backend::Avx2,
        Backend::Neon,
        Backend::Scalar,
    ];

    /// The widest backend this build and this CPU both support.
    ///
    /// Detection runs once per process.
    pub fn detect() -> Backend {
        static DETECTED: OnceLock<Backend> = OnceLock::new();

        *DETECTED.get_or_init(|| {
            let backend = Backend::ALL
                .into_iter()
                .find(|backend| backend.is_available())
                .unwrap_or(Backend::Scalar);
            tracing::debug!(backend = %backend, "selected SIMD backend");
            backend
        })
    }

    /// Whether the kernel for this backend was compiled in and the CPU can
    /// execute it.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Avx512 => avx512_available(),
            Backend::Avx2 => avx2_available(),
            Backend::Neon => cfg!(target_arch = "aarch64"),
            Backend::Scalar => true,
        }
    }

    /// Number of `f64` values processed per vector step.
    pub const fn lane_width(self) -> usize {
        match self {
            Backend::Avx512 => 8,
            Backend::Avx2 => 4,
            Backend::Neon => 2,
            Backend::Scalar => 4,
        }
    }

    /// Byte boundary required for the aligned load/store path.
    pub const fn alignment(self) -> usize {
        match self {
            Backend::Avx512 => 64,
            Backend::Avx2 => 32,
            Backend::Neon => 16,
            Backend::Scalar => 32,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Backend::Avx512 => "avx512",
            Backend::Avx2 => "avx2",
            Backend::Neon => "neon",
            Backend::Scalar => "scalar",
        }
    }

    /// Runs the add kernel. The backend must be available.
    #[inline(always)]
    pub(crate) fn add(self, a: &[f64], b: &[f64], out: &mut [f64]) {
        debug_assert!(self.is_available(), "backend {self} is not available");
        debug_assert_eq!(a.len(), out.len());
        debug_assert_eq!(b.len(), out.len());

        match self {
            #[cfg(all(target_arch = "x86_64", avx512))]
            // SAFETY: availability checked by the caller via `is_available`.
            Backend::Avx512 => unsafe { avx512::add(a, b, out) },
            #[cfg(target_arch = "x86_64")]
            // SAFETY: as above.
            Backend::Avx2 => unsafe { avx2::add(a, b, out) },
            #[cfg(target_arch = "aarch64")]
            Backend::Neon => neon::add(a, b, out),
            _ => scalar::add(a, b, out),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn avx512_available() -> bool {
    #[cfg(all(target_arch = "x86_64", avx512))]
    {
        std::arch::is_x86_feature_detected!("avx512f")
    }
    #[cfg(not(all(target_arch = "x86_64", avx512)))]
    {
        false
    }
}

fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// Hints the CPU to pull the cache line holding `ptr` into L1.
///
/// `ptr` may point past the end of a buffer: prefetch never faults.
#[inline(always)]
pub(crate) fn prefetch_read<T>(ptr: *const T) {
    #[cfg(target_arch = "x86_64")]
    {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        // SAFETY: prefetch is a hint and cannot fault on any address.
        unsafe { _mm_prefetch(ptr as *const i8, _MM_HINT_T0) };
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = ptr;
    }
}

fn check_lengths(a: &[f64], b: &[f64], out: &[f64]) -> Result<()> {
    if a.len() != b.len() || a.len() != out.len() {
        return Err(validation_error(format!(
            "vector add needs equal lengths, got a={}, b={}, out={}",
            a.len(),
            b.len(),
            out.len()
        )));
    }
    Ok(())
}

/// Element-wise `out[i] = a[i] + b[i]` on the detected backend.
///
/// # Errors
///
/// [`crate::FastcalcError::Validation`] if the three buffers differ in length.
///
/// ```rust
/// use fastcalc::vector_add;
///
/// let a = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let b = [10.0, 20.0, 30.0, 40.0, 50.0];
/// let mut out = [0.0; 5];
/// vector_add(&a, &b, &mut out).unwrap();
/// assert_eq!(out, [11.0, 22.0, 33.0, 44.0, 55.0]);
/// ```
pub fn vector_add(a: &[f64], b: &[f64], out: &mut [f64]) -> Result<()> {
    vector_add_with(Backend::detect(), a, b, out)
}

/// [`vector_add`] on a specific backend, falling back to the scalar kernel
/// when `backend` is not available on this machine.
pub fn vector_add_with(backend: Backend, a: &[f64], b: &[f64], out: &mut [f64]) -> Result<()> {
    check_lengths(a, b, out)?;

    let backend = if backend.is_available() {
        backend
    } else {
        Backend::Scalar
    };
    backend.add(a, b, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::AlignedBuffer;

    fn reference(a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }

    #[test]
    fn test_detected_backend_is_available() {
        let backend = Backend::detect();
        assert!(backend.is_available());
        assert!(Backend::Scalar.is_available());
    }

    #[test]
    fn test_every_backend_matches_scalar_reference() {
        for backend in Backend::ALL.into_iter().filter(|b| b.is_available()) {
            for len in [0usize, 1, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 63, 64, 65, 1000] {
                let a: Vec<f64> = (0..len).map(|i| i as f64 * 0.5).collect();
                let b: Vec<f64> = (0..len).map(|i| 1.0 - i as f64).collect();
                let mut out = vec![f64::NAN; len];

                vector_add_with(backend, &a, &b, &mut out).unwrap();
                assert_eq!(out, reference(&a, &b), "backend {backend}, len {len}");
            }
        }
    }

    #[test]
    fn test_aligned_and_offset_buffers() {
        let len = 103;
        for backend in Backend::ALL.into_iter().filter(|b| b.is_available()) {
            let align = backend.alignment();
            let a = AlignedBuffer::from_slice(&(0..len + 1).map(|i| i as f64).collect::<Vec<_>>(), align).unwrap();
            let b = AlignedBuffer::from_slice(&vec![2.5; len + 1], align).unwrap();
            let mut out = AlignedBuffer::<f64>::zeroed(len + 1, align).unwrap();

            // Aligned path.
            vector_add_with(backend, &a[..len], &b[..len], &mut out[..len]).unwrap();
            assert_eq!(&out[..len], reference(&a[..len], &b[..len]).as_slice());

            // Shifted by one element: never aligned for vector widths > 8 bytes.
            vector_add_with(backend, &a[1..], &b[1..], &mut out[1..]).unwrap();
            assert_eq!(&out[1..], reference(&a[1..], &b[1..]).as_slice());
        }
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut out = vec![0.0; 3];
        assert!(vector_add(&[1.0, 2.0, 3.0], &[1.0, 2.0], &mut out).is_err());
        assert!(vector_add(&[1.0, 2.0], &[1.0, 2.0], &mut out).is_err());
    }
}
