//! Batch evaluation with per-element fault codes.
//!
//! Faults never abort a batch: every index gets a value and an [`ErrorCode`],
//! and only malformed calls (buffers of different lengths) return an error.

use fastcalc::{
    batch_power, DispatchConfig, Dispatcher, ErrorCode, FastcalcError, Outcome, WorkerPool,
};

fn main() -> fastcalc::Result<()> {
    // Example 1: Mixed valid and invalid inputs in one batch
    let bases = [2.0, -2.0, 0.0, 16.0, -8.0, 10.0, 10.0];
    let exponents = [10.0, 3.0, -1.0, 0.5, 0.5, 400.0, -400.0];
    let mut values = [0.0; 7];
    let mut codes = [ErrorCode::Success; 7];

    batch_power(&bases, &exponents, &mut values, &mut codes)?;
    for i in 0..bases.len() {
        let outcome = Outcome { value: values[i], code: codes[i] };
        match outcome.into_result() {
            Ok(v) => println!("{}^{} = {}", bases[i], exponents[i], v),
            Err(code) => println!("{}^{} failed: {} (sentinel {})", bases[i], exponents[i], code, values[i]),
        }
    }

    // Example 2: Malformed calls are rejected up front
    let mut short = [0.0; 3];
    match batch_power(&bases, &exponents, &mut short, &mut codes) {
        Ok(()) => println!("\nUnexpected success"),
        Err(FastcalcError::Validation { message }) => println!("\nValidation error: {}", message),
        Err(e) => println!("\nOther error: {}", e),
    }

    // Example 3: A dedicated pool with explicit chunking
    let pool = WorkerPool::with_threads(4)?;
    let dispatcher = Dispatcher::on_pool(pool);
    let len = 100_000;
    println!("\nChunk plan for {} elements on 4 workers:", len);
    for range in dispatcher.plan(len) {
        println!("  {:?}", range);
    }

    let xs: Vec<f64> = (0..len).map(|i| i as f64 - 10.0).collect();
    let mut values = vec![0.0; len];
    let mut codes = vec![ErrorCode::Success; len];
    dispatcher.sqrt(&xs, &mut values, &mut codes)?;
    let faults = codes.iter().filter(|c| !c.is_success()).count();
    println!("sqrt: {} faults, sqrt({}) = {}", faults, xs[len - 1], values[len - 1]);

    // Example 4: Forcing the parallel path for a short input
    let forced = Dispatcher::new(DispatchConfig::default().with_threshold(0).with_workers(2));
    let mut values = [0.0; 4];
    let mut codes = [ErrorCode::Success; 4];
    forced.kinetic_energy(&[1.0, 2.0, -1.0, 4.0], &[2.0, 2.0, 2.0, 0.5], &mut values, &mut codes)?;
    println!("\nkinetic energy: {:?} {:?}", values, codes);

    Ok(())
}
