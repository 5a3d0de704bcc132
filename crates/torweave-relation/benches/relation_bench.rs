//! Benchmarks for the pair relation.
//!
//! Measures performance of:
//! - Single-pair reads on a populated relation
//! - Full-row related-index scans
//! - The O(n^2) build pass a consensus performs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use torweave_relation::PairMatrix;

/// Deterministically populate ~2% of pairs.
fn populated(n: usize) -> PairMatrix {
    let mut m = PairMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if (i * 31 + j * 17) % 50 == 0 {
                m.set(i, j, true).unwrap();
            }
        }
    }
    m
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains");

    for &n in &[100usize, 1000, 5000] {
        let m = populated(n);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(n), &m, |b, m| {
            b.iter(|| m.contains(black_box(n / 3), black_box(n / 2)))
        });
    }
    group.finish();
}

fn bench_row_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_scan");

    for &n in &[100usize, 1000, 5000] {
        let m = populated(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &m, |b, m| {
            b.iter(|| m.related_indices(black_box(n / 2)).unwrap().count())
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    for &n in &[100usize, 1000] {
        group.throughput(Throughput::Elements((n * (n - 1) / 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| populated(black_box(n)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_contains, bench_row_scan, bench_build);
criterion_main!(benches);
