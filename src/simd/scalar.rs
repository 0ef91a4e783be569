/// Portable add kernel: `out[i] = a[i] + b[i]`.
#[inline(always)]
pub(crate) fn add(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((c, x), y) in out.iter_mut().zip(a).zip(b) {
        *c = x + y;
    }
}
