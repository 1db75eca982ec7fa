//! Benchmarks for factorbeta-math operations.
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use factorbeta_math::{least_squares, ols};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn random_array(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|_| rng.r#gen::<f64>() * 0.1 - 0.05))
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.r#gen::<f64>() * 0.04 - 0.02)
}

fn bench_least_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("least_squares");
    group.sample_size(50);

    for (n_obs, n_cols) in [(60, 2), (252, 2), (252, 10), (504, 20)] {
        group.throughput(Throughput::Elements((n_obs * n_cols) as u64));
        group.bench_with_input(
            BenchmarkId::new("obs_cols", format!("{n_obs}x{n_cols}")),
            &(n_obs, n_cols),
            |b, &(n_obs, n_cols)| {
                let mut rng = StdRng::seed_from_u64(7);
                let y = random_array(&mut rng, n_obs);
                let x = random_matrix(&mut rng, n_obs, n_cols);

                b.iter(|| least_squares(black_box(&y), black_box(&x)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_ols(c: &mut Criterion) {
    let mut group = c.benchmark_group("ols");

    // One security against a typical factor set over a one-year window
    for n_factors in [1, 5, 9, 15] {
        group.bench_with_input(BenchmarkId::from_parameter(n_factors), &n_factors, |b, &k| {
            let mut rng = StdRng::seed_from_u64(11);
            let y = random_array(&mut rng, 252);
            let x = random_matrix(&mut rng, 252, k);

            b.iter(|| ols(black_box(&y), black_box(&x)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_least_squares, bench_ols);

criterion_main!(benches);
