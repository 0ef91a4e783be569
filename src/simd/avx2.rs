//! AVX2 add kernel over 256-bit registers (4 × f64).

use std::arch::x86_64::*;

use crate::simd::prefetch_read;
use crate::utils::is_aligned;
use crate::PREFETCH_DISTANCE;

/// AVX2 memory alignment requirement in bytes.
pub(crate) const AVX_ALIGNMENT: usize = 32;

/// Number of f64 elements in one 256-bit register.
pub(crate) const LANE_COUNT: usize = 4;

/// `out[i] = a[i] + b[i]` four lanes at a time, scalar tail.
///
/// # Safety
///
/// The CPU must support AVX2, and `a`, `b` must be at least `out.len()` long.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn add(a: &[f64], b: &[f64], out: &mut [f64]) {
    let size = out.len();
    let nb_lanes = size - (size % LANE_COUNT);

    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let pc = out.as_mut_ptr();

    let aligned = is_aligned(pa, AVX_ALIGNMENT)
        && is_aligned(pb, AVX_ALIGNMENT)
        && is_aligned(pc as *const f64, AVX_ALIGNMENT);

    let mut i = 0;
    if aligned {
        while i < nb_lanes {
            prefetch_read(pa.wrapping_add(i + PREFETCH_DISTANCE));
            prefetch_read(pb.wrapping_add(i + PREFETCH_DISTANCE));

            let va = _mm256_load_pd(pa.add(i));
            let vb = _mm256_load_pd(pb.add(i));
            _mm256_store_pd(pc.add(i), _mm256_add_pd(va, vb));
            i += LANE_COUNT;
        }
    } else {
        while i < nb_lanes {
            prefetch_read(pa.wrapping_add(i + PREFETCH_DISTANCE));
            prefetch_read(pb.wrapping_add(i + PREFETCH_DISTANCE));

            let va = _mm256_loadu_pd(pa.add(i));
            let vb = _mm256_loadu_pd(pb.add(i));
            _mm256_storeu_pd(pc.add(i), _mm256_add_pd(va, vb));
            i += LANE_COUNT;
        }
    }

    for j in nb_lanes..size {
        *pc.add(j) = *pa.add(j) + *pb.add(j);
    }
}
