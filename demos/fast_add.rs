use fastcalc::utils::AlignedBuffer;
use fastcalc::{vector_add, Backend, SimdAdd};

fn main() -> fastcalc::Result<()> {
    let backend = Backend::detect();
    println!("Detected backend: {backend} ({} lanes)", backend.lane_width());

    // Example 1: Basic vector addition
    let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let b = vec![8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];

    println!("Vector A: {:?}", a);
    println!("Vector B: {:?}", b);

    let result = a.as_slice().simd_add(b.as_slice())?;
    println!("A + B = {:?}", result);

    // Example 2: Aligned buffers take the aligned load/store loop
    let size = 10_000;
    let large_a = AlignedBuffer::from_slice(&(0..size).map(|i| i as f64).collect::<Vec<_>>(), backend.alignment())?;
    let large_b = AlignedBuffer::from_slice(&vec![0.5; size], backend.alignment())?;
    let mut out = AlignedBuffer::<f64>::zeroed(size, backend.alignment())?;

    println!("\nAligned vector addition (size: {})", size);
    let start = std::time::Instant::now();
    vector_add(&large_a, &large_b, &mut out)?;
    println!("Completed in: {:?}, last = {}", start.elapsed(), out[size - 1]);

    // Example 3: Parallel addition splits the work across the Rayon pool
    let huge: Vec<f64> = (0..2_000_000).map(|i| i as f64).collect();
    let start = std::time::Instant::now();
    let sum = huge.as_slice().par_simd_add(huge.as_slice())?;
    println!("\nParallel addition of {} elements in {:?}", sum.len(), start.elapsed());

    // Example 4: Mismatched lengths are rejected, not truncated
    match [1.0, 2.0].as_slice().simd_add([1.0].as_slice()) {
        Ok(sum) => println!("\nUnexpected success: {:?}", sum),
        Err(e) => println!("\nRejected: {}", e),
    }

    Ok(())
}
