//! Walks through every public operation and prints the results.
//!
//! Set `RUST_LOG=fastcalc=debug` to see backend detection and chunk dispatch.

use std::time::Instant;

use fastcalc::{
    batch_kinetic_energy, batch_power, batch_sqrt, kinetic_energy, safe_factorial, safe_power,
    safe_sqrt, vector_add, Backend, Dispatcher, ErrorCode, MathCache, Result, SimdAdd,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BATCH_LEN: usize = 1_000_000;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        backend = %Backend::detect(),
        workers = Dispatcher::shared().config().workers,
        "fastcalc demo"
    );

    scalar_operations();
    batch_operations()?;
    vector_addition()?;

    Ok(())
}

fn scalar_operations() {
    println!("Scalar operations");
    for (base, exponent) in [
        (2.0, 10.0),
        (-2.0, 3.0),
        (16.0, 0.5),
        (0.0, -1.0),
        (-8.0, 1.0 / 3.0),
        (10.0, 400.0),
        (10.0, -400.0),
        (1.0001, 64.0),
    ] {
        let r = safe_power(base, exponent);
        println!("  power({base}, {exponent}) = {} [{}]", r.value, r.code);
    }

    for x in [25.0, 2.0, -4.0] {
        let r = safe_sqrt(x);
        println!("  sqrt({x}) = {} [{}]", r.value, r.code);
    }

    for n in [0, 5, 20, 21, -3] {
        let r = safe_factorial(n);
        println!("  factorial({n}) = {} [{}]", r.value, r.code);
    }

    for (m, v) in [(2.0, 3.0), (1e200, 1e100), (-1.0, 2.0)] {
        let r = kinetic_energy(m, v);
        println!("  kinetic_energy({m}, {v}) = {} [{}]", r.value, r.code);
    }

    let stats = MathCache::shared().stats();
    println!(
        "  cache: {} factorials, {} square roots",
        stats.factorial_entries, stats.sqrt_entries
    );
}

fn batch_operations() -> Result<()> {
    println!("\nBatch operations over {BATCH_LEN} elements");

    let bases: Vec<f64> = (0..BATCH_LEN).map(|i| (i % 200) as f64 - 100.0).collect();
    let exponents: Vec<f64> = (0..BATCH_LEN).map(|i| (i % 7) as f64 - 2.0).collect();
    let mut values = vec![0.0; BATCH_LEN];
    let mut codes = vec![ErrorCode::Success; BATCH_LEN];

    let start = Instant::now();
    batch_power(&bases, &exponents, &mut values, &mut codes)?;
    println!("  power: {:?}, {}", start.elapsed(), summarize(&codes));

    let start = Instant::now();
    batch_sqrt(&bases, &mut values, &mut codes)?;
    println!("  sqrt: {:?}, {}", start.elapsed(), summarize(&codes));

    let velocities: Vec<f64> = (0..BATCH_LEN).map(|i| (i % 50) as f64).collect();
    let start = Instant::now();
    batch_kinetic_energy(&bases, &velocities, &mut values, &mut codes)?;
    println!("  kinetic_energy: {:?}, {}", start.elapsed(), summarize(&codes));

    Ok(())
}

fn vector_addition() -> Result<()> {
    println!("\nVector addition");

    let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
    let b = [9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
    let mut out = [0.0; 9];
    vector_add(&a, &b, &mut out)?;
    println!("  {a:?} + {b:?} = {out:?}");

    let large: Vec<f64> = (0..BATCH_LEN).map(|i| i as f64).collect();
    let start = Instant::now();
    let sum = large.as_slice().par_simd_add(large.as_slice())?;
    println!("  parallel add of {} elements: {:?}", sum.len(), start.elapsed());

    Ok(())
}

fn summarize(codes: &[ErrorCode]) -> String {
    let mut counts = [0usize; 8];
    for &code in codes {
        counts[code.as_i32() as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .filter_map(|(i, n)| {
            ErrorCode::try_from(i as i32)
                .ok()
                .map(|code| format!("{code}: {n}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
