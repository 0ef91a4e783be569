//! NEON add kernel over 128-bit registers (2 × f64).
//!
//! NEON loads have no separate aligned form, so there is a single lane loop.

use std::arch::aarch64::*;

/// Number of f64 elements in one 128-bit register.
pub(crate) const LANE_COUNT: usize = 2;

#[inline(always)]
pub(crate) fn add(a: &[f64], b: &[f64], out: &mut [f64]) {
    let size = out.len();
    let nb_lanes = size - (size % LANE_COUNT);

    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let pc = out.as_mut_ptr();

    let mut i = 0;
    while i < nb_lanes {
        // SAFETY: i + 2 <= nb_lanes <= len of all three buffers; NEON is
        // always present on aarch64.
        unsafe {
            let va = vld1q_f64(pa.add(i));
            let vb = vld1q_f64(pb.add(i));
            vst1q_f64(pc.add(i), vaddq_f64(va, vb));
        }
        i += LANE_COUNT;
    }

    super::scalar::add(&a[nb_lanes..size], &b[nb_lanes..size], &mut out[nb_lanes..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_lengths_finish_tail() {
        for len in [1usize, 3, 5, 9, 101] {
            let a: Vec<f64> = (0..len).map(|i| i as f64).collect();
            let b: Vec<f64> = (0..len).map(|i| 0.25 * i as f64).collect();
            let mut out = vec![f64::NAN; len];

            add(&a, &b, &mut out);

            for i in 0..len {
                assert_eq!(out[i], a[i] + b[i], "len {len}, index {i}");
            }
        }
    }
}
