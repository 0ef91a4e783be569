//! Batch results must equal the scalar operation at every index, whatever the
//! input length, worker count, or chunk layout.

use fastcalc::utils::AlignedBuffer;
use fastcalc::{
    batch_kinetic_energy, batch_power, batch_sqrt, kinetic_energy, safe_power, safe_sqrt, Backend,
    DispatchConfig, Dispatcher, ErrorCode, Outcome, WorkerPool, PARALLEL_THRESHOLD,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SPECIAL_EXPONENTS: &[f64] = &[0.0, 1.0, 2.0, 0.5, 3.0, 4.0, -1.0, -2.0, 64.0, 65.0, 400.0, -310.0];

/// Bases and exponents hitting every branch of `safe_power`, valid and not.
fn power_inputs(len: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bases = Vec::with_capacity(len);
    let mut exponents = Vec::with_capacity(len);

    for _ in 0..len {
        let base = match rng.random_range(0..10) {
            0 => 0.0,
            1 => rng.random_range(0..=120) as f64,
            2 => -(rng.random_range(1..=50) as f64),
            3 => rng.random_range(-1e200..1e200),
            4 => f64::NAN,
            _ => rng.random_range(-100.0..100.0),
        };
        let exponent = match rng.random_range(0..6) {
            0 | 1 => SPECIAL_EXPONENTS[rng.random_range(0..SPECIAL_EXPONENTS.len())],
            2 => rng.random_range(-70..=70) as f64,
            3 => rng.random_range(-5.0..5.0),
            _ => rng.random_range(-400.0..400.0),
        };
        bases.push(base);
        exponents.push(exponent);
    }
    (bases, exponents)
}

fn unary_inputs(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| match rng.random_range(0..5) {
            0 => rng.random_range(0..=100) as f64,
            1 => -rng.random_range(0.0..1e3),
            2 => 0.0,
            _ => rng.random_range(0.0..1e12),
        })
        .collect()
}

fn same_value(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

fn assert_matches(values: &[f64], codes: &[ErrorCode], expected: impl Fn(usize) -> Outcome<f64>) {
    for i in 0..values.len() {
        let e = expected(i);
        assert_eq!(codes[i], e.code, "code mismatch at index {i}");
        assert!(
            same_value(values[i], e.value),
            "value mismatch at index {i}: {} vs {}",
            values[i],
            e.value
        );
    }
}

fn run_power(d: &Dispatcher, bases: &[f64], exps: &[f64]) -> (Vec<f64>, Vec<ErrorCode>) {
    let mut values = vec![0.0; bases.len()];
    let mut codes = vec![ErrorCode::Success; bases.len()];
    d.power(bases, exps, &mut values, &mut codes).unwrap();
    (values, codes)
}

#[test]
fn test_power_equivalence_across_lengths() {
    for (seed, len) in [1usize, 2, 3, 7, 64, 1_000, 9_999, 10_000, 10_001, 65_537]
        .into_iter()
        .enumerate()
    {
        let (bases, exps) = power_inputs(len, seed as u64);
        let mut values = vec![0.0; len];
        let mut codes = vec![ErrorCode::Success; len];

        batch_power(&bases, &exps, &mut values, &mut codes).unwrap();
        assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));
    }
}

#[test]
fn test_power_equivalence_one_million() {
    let len = 1_000_000;
    let (bases, exps) = power_inputs(len, 42);
    let mut values = vec![0.0; len];
    let mut codes = vec![ErrorCode::Success; len];

    batch_power(&bases, &exps, &mut values, &mut codes).unwrap();
    assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));
}

#[test]
fn test_power_equivalence_across_worker_counts() {
    let len = 50_003;
    let (bases, exps) = power_inputs(len, 99);

    for workers in [1, 2, 3, 4, 7, 8, 13, 32] {
        for skew in [0, 16, 1_000] {
            let config = DispatchConfig::default()
                .with_workers(workers)
                .with_chunk_skew(skew);
            let (values, codes) = run_power(&Dispatcher::new(config), &bases, &exps);
            assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));
        }
    }
}

#[test]
fn test_power_equivalence_on_dedicated_pools() {
    let len = 30_000;
    let (bases, exps) = power_inputs(len, 5);

    for threads in [1, 2, 5] {
        let d = Dispatcher::on_pool(WorkerPool::with_threads(threads).unwrap());
        assert_eq!(d.config().workers, threads);
        let (values, codes) = run_power(&d, &bases, &exps);
        assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));
    }
}

#[test]
fn test_power_equivalence_for_every_backend_grouping() {
    let len = 20_000;
    let (bases, exps) = power_inputs(len, 17);

    for backend in Backend::ALL {
        let config = DispatchConfig::default().with_workers(4).with_backend(backend);
        let (values, codes) = run_power(&Dispatcher::new(config), &bases, &exps);
        assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));
    }
}

#[test]
fn test_aligned_buffers_take_grouped_path() {
    let len = 40_000;
    let (bases, exps) = power_inputs(len, 23);
    let align = 64;

    let bases = AlignedBuffer::from_slice(&bases, align).unwrap();
    let exps = AlignedBuffer::from_slice(&exps, align).unwrap();
    let mut values = AlignedBuffer::<f64>::zeroed(len, align).unwrap();
    let mut codes = AlignedBuffer::<ErrorCode>::zeroed(len, align).unwrap();

    // Some chunks start aligned and run grouped, others take the scalar loop.
    let d = Dispatcher::new(DispatchConfig::default().with_workers(5).with_chunk_skew(8));
    d.power(&bases, &exps, &mut values, &mut codes).unwrap();
    assert_matches(&values, &codes, |i| safe_power(bases[i], exps[i]));

    // Same data one element off the boundary.
    d.power(&bases[1..], &exps[1..], &mut values[1..], &mut codes[1..])
        .unwrap();
    assert_matches(&values[1..], &codes[1..], |i| safe_power(bases[i + 1], exps[i + 1]));
}

#[test]
fn test_threshold_boundary_lengths() {
    let d = Dispatcher::default();
    assert!(!d.is_parallel(9_999));
    assert!(d.is_parallel(10_000));
    assert_eq!(PARALLEL_THRESHOLD, 10_000);

    let (bases, exps) = power_inputs(10_000, 77);

    let (seq_values, seq_codes) = run_power(&d, &bases[..9_999], &exps[..9_999]);
    let (par_values, par_codes) = run_power(&d, &bases, &exps);

    assert_matches(&seq_values, &seq_codes, |i| safe_power(bases[i], exps[i]));
    assert_matches(&par_values, &par_codes, |i| safe_power(bases[i], exps[i]));
    for i in 0..9_999 {
        assert_eq!(seq_codes[i], par_codes[i]);
        assert!(same_value(seq_values[i], par_values[i]));
    }
}

#[test]
fn test_sqrt_equivalence() {
    for len in [5, 9_999, 10_000, 123_456] {
        let xs = unary_inputs(len, len as u64);
        let mut values = vec![0.0; len];
        let mut codes = vec![ErrorCode::Success; len];

        batch_sqrt(&xs, &mut values, &mut codes).unwrap();
        assert_matches(&values, &codes, |i| safe_sqrt(xs[i]));
    }
}

#[test]
fn test_kinetic_energy_equivalence() {
    for len in [5, 9_999, 10_000, 123_456] {
        let masses = unary_inputs(len, 1 + len as u64);
        let velocities: Vec<f64> = unary_inputs(len, 2 + len as u64)
            .into_iter()
            .map(|v| if v > 1e6 { v * 1e150 } else { v })
            .collect();
        let mut values = vec![0.0; len];
        let mut codes = vec![ErrorCode::Success; len];

        batch_kinetic_energy(&masses, &velocities, &mut values, &mut codes).unwrap();
        assert_matches(&values, &codes, |i| kinetic_energy(masses[i], velocities[i]));
    }
}

#[test]
fn test_failed_chunk_only_affects_its_own_range() {
    let len = 40_000;
    let d = Dispatcher::new(DispatchConfig::default().with_workers(6));
    let plan = d.plan(len);
    let failing = 3;
    let trigger = plan[failing].end - 1;

    let (bases, exps) = power_inputs(len, 8);
    let mut values = vec![0.0; len];
    let mut codes = vec![ErrorCode::Success; len];

    d.map_binary(&bases, &exps, &mut values, &mut codes, |cache, b, e| {
        if b.to_bits() == bases[trigger].to_bits() && e.to_bits() == exps[trigger].to_bits() {
            panic!("simulated worker failure");
        }
        fastcalc::ops::power_cached(cache, b, e)
    })
    .unwrap();

    for (chunk, range) in plan.iter().enumerate() {
        let poisoned = (range.start..range.end)
            .any(|i| bases[i].to_bits() == bases[trigger].to_bits() && exps[i].to_bits() == exps[trigger].to_bits());
        for i in range.clone() {
            if chunk == failing || poisoned {
                assert_eq!(codes[i], ErrorCode::InvalidArgument, "index {i}");
                assert!(values[i].is_nan());
            } else {
                let e = safe_power(bases[i], exps[i]);
                assert_eq!(codes[i], e.code, "index {i}");
                assert!(same_value(values[i], e.value));
            }
        }
    }
}
