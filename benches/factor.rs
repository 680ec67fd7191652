use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use ildl::config::Config;
use ildl::factor::factorize;
use ildl::solver::matrix::builder::MatrixBuilder;
use ildl::solver::matrix::csc::CscMatrix;
use std::hint::black_box;

/// A pentadiagonal, diagonally dominant symmetric matrix of size `n`. Grows the same way
/// across benchmark cases so the reported throughput numbers are comparable, mirroring the
/// fixed-matrix-set benchmarking pattern the teacher's `benches/klu_analyze.rs` uses with its
/// real `.mtx` corpus, substituted here with a synthetic generator since no such corpus ships
/// in this crate.
fn pentadiagonal(n: usize) -> CscMatrix {
    let mut b = MatrixBuilder::new(n, n);
    for i in 0..n {
        b.push(i, i, 8.0).unwrap();
    }
    for i in 0..n - 1 {
        b.push(i, i + 1, -1.0).unwrap();
    }
    for i in 0..n.saturating_sub(2) {
        b.push(i, i + 2, 0.25).unwrap();
    }
    b.build_csc().unwrap()
}

fn bench_factorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("ildl/factorize");
    let config = Config::default();

    for &n in &[64usize, 256, 1024, 4096] {
        let a = pentadiagonal(n);
        let nnz = a.nnz();
        group.throughput(Throughput::Elements(nnz as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &a, |bencher, a| {
            bencher.iter_batched(
                || (),
                |()| {
                    let result = factorize(black_box(a), 1.0, &config).expect("factorize");
                    black_box(result);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_factorize_skew(c: &mut Criterion) {
    let mut group = c.benchmark_group("ildl/factorize_skew");
    let config = Config::default();

    for &n in &[64usize, 256, 1024] {
        let mut b = MatrixBuilder::new(n, n);
        for i in 0..n - 1 {
            b.push(i, i + 1, 1.0).unwrap();
        }
        let a = b.build_csc().unwrap();
        let nnz = a.nnz();
        group.throughput(Throughput::Elements(nnz as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &a, |bencher, a| {
            bencher.iter_batched(
                || (),
                |()| {
                    let result = factorize(black_box(a), -1.0, &config).expect("factorize");
                    black_box(result);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(factor, bench_factorize, bench_factorize_skew);
criterion_main!(factor);
