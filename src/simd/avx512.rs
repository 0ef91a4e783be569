//! AVX-512F add kernel over 512-bit registers (8 × f64).
//!
//! Unlike the AVX2 kernel the remainder is not finished with a scalar loop:
//! a lane mask covers the last `len % 8` elements so the tail is one more
//! vector step with masked load and store.

use std::arch::x86_64::*;

use crate::simd::prefetch_read;
use crate::utils::is_aligned;
use crate::PREFETCH_DISTANCE;

/// AVX-512 memory alignment requirement in bytes.
pub(crate) const AVX512_ALIGNMENT: usize = 64;

/// Number of f64 elements in one 512-bit register.
pub(crate) const LANE_COUNT: usize = 8;

/// # Safety
///
/// The CPU must support AVX-512F, and `a`, `b` must be at least `out.len()`
/// long.
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn add(a: &[f64], b: &[f64], out: &mut [f64]) {
    let size = out.len();
    let nb_lanes = size - (size % LANE_COUNT);
    let remaining = size - nb_lanes;

    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let pc = out.as_mut_ptr();

    let aligned = is_aligned(pa, AVX512_ALIGNMENT)
        && is_aligned(pb, AVX512_ALIGNMENT)
        && is_aligned(pc as *const f64, AVX512_ALIGNMENT);

    let mut i = 0;
    if aligned {
        while i < nb_lanes {
            prefetch_read(pa.wrapping_add(i + PREFETCH_DISTANCE));
            prefetch_read(pb.wrapping_add(i + PREFETCH_DISTANCE));

            let va = _mm512_load_pd(pa.add(i));
            let vb = _mm512_load_pd(pb.add(i));
            _mm512_store_pd(pc.add(i), _mm512_add_pd(va, vb));
            i += LANE_COUNT;
        }
    } else {
        while i < nb_lanes {
            prefetch_read(pa.wrapping_add(i + PREFETCH_DISTANCE));
            prefetch_read(pb.wrapping_add(i + PREFETCH_DISTANCE));

            let va = _mm512_loadu_pd(pa.add(i));
            let vb = _mm512_loadu_pd(pb.add(i));
            _mm512_storeu_pd(pc.add(i), _mm512_add_pd(va, vb));
            i += LANE_COUNT;
        }
    }

    if remaining > 0 {
        // remaining < 8, so the shift stays inside the u8 mask.
        let mask: __mmask8 = (1u8 << remaining) - 1;
        let va = _mm512_maskz_loadu_pd(mask, pa.add(nb_lanes));
        let vb = _mm512_maskz_loadu_pd(mask, pb.add(nb_lanes));
        _mm512_mask_storeu_pd(pc.add(nb_lanes), mask, _mm512_add_pd(va, vb));
    }
}
