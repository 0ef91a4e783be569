use rayon::prelude::*;

use crate::error::{validation_error, Result};
use crate::simd::Backend;
use crate::PARALLEL_THRESHOLD;

/// Elements per Rayon task in [`SimdAdd::par_simd_add`]; a multiple of every
/// lane width so only the final task has a tail.
pub const PARALLEL_ADD_CHUNK: usize = 4096;

/// Element-wise addition with scalar, SIMD, and parallel SIMD variants.
///
/// ```rust
/// use fastcalc::SimdAdd;
///
/// let a: Vec<f64> = (0..1000).map(|i| i as f64).collect();
/// let b: Vec<f64> = (0..1000).map(|i| (i * 2) as f64).collect();
///
/// let sum = a.as_slice().simd_add(b.as_slice()).unwrap();
/// assert_eq!(sum[10], 30.0);
/// assert_eq!(sum, a.as_slice().scalar_add(b.as_slice()).unwrap());
/// ```
pub trait SimdAdd<Rhs = Self> {
    type Output;

    fn simd_add(self, rhs: Rhs) -> Self::Output;
    fn par_simd_add(self, rhs: Rhs) -> Self::Output;
    fn scalar_add(self, rhs: Rhs) -> Self::Output;
}

fn check_same_length(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(validation_error(format!(
            "input slices must have same length, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

impl<'b> SimdAdd<&'b [f64]> for &[f64] {
    type Output = Result<Vec<f64>>;

    fn simd_add(self, rhs: &'b [f64]) -> Self::Output {
        check_same_length(self, rhs)?;

        let mut out = vec![0.0; self.len()];
        Backend::detect().add(self, rhs, &mut out);
        Ok(out)
    }

    fn par_simd_add(self, rhs: &'b [f64]) -> Self::Output {
        if self.len() < PARALLEL_THRESHOLD {
            return self.simd_add(rhs);
        }
        check_same_length(self, rhs)?;

        let backend = Backend::detect();
        let mut out = vec![0.0; self.len()];

        out.par_chunks_mut(PARALLEL_ADD_CHUNK)
            .zip(self.par_chunks(PARALLEL_ADD_CHUNK))
            .zip(rhs.par_chunks(PARALLEL_ADD_CHUNK))
            .for_each(|((c_chunk, a_chunk), b_chunk)| {
                backend.add(a_chunk, b_chunk, c_chunk);
            });

        Ok(out)
    }

    fn scalar_add(self, rhs: &'b [f64]) -> Self::Output {
        check_same_length(self, rhs)?;

        Ok(self.iter().zip(rhs.iter()).map(|(x, y)| x + y).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FastcalcError;

    #[test]
    fn test_variants_agree() {
        for len in [1usize, 7, 64, PARALLEL_THRESHOLD - 1, PARALLEL_THRESHOLD + 5, 50_001] {
            let a: Vec<f64> = (0..len).map(|i| (i as f64).sin()).collect();
            let b: Vec<f64> = (0..len).map(|i| (i as f64) * 1e-3).collect();

            let scalar = a.as_slice().scalar_add(b.as_slice()).unwrap();
            let simd = a.as_slice().simd_add(b.as_slice()).unwrap();
            let par = a.as_slice().par_simd_add(b.as_slice()).unwrap();

            assert_eq!(scalar, simd, "len {len}");
            assert_eq!(scalar, par, "len {len}");
        }
    }

    #[test]
    fn test_mismatched_lengths() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0];
        for result in [
            a.as_slice().scalar_add(b.as_slice()),
            a.as_slice().simd_add(b.as_slice()),
            a.as_slice().par_simd_add(b.as_slice()),
        ] {
            assert!(matches!(result, Err(FastcalcError::Validation { .. })));
        }
    }

    #[test]
    fn test_empty_inputs() {
        let empty: &[f64] = &[];
        assert!(empty.simd_add(empty).unwrap().is_empty());
        assert!(empty.par_simd_add(empty).unwrap().is_empty());
    }
}
