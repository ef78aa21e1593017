//! Triangulation construction benchmarks for the planar and spherical solvers.
//!
//! ```bash
//! cargo bench --bench triangulation_creation
//! ```

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use orthtree_delaunay::prelude::*;
use std::hint::black_box;

const COUNTS: &[usize] = &[100, 1_000, 10_000];

fn bench_planar(c: &mut Criterion) {
    let mut group = c.benchmark_group("planar_delaunay");
    group.sample_size(20);
    for &count in COUNTS {
        let points = generate_random_points_seeded::<2>(count, (-100.0, 100.0), 7)
            .expect("benchmark range is valid");
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("solve", count), &points, |b, points| {
            b.iter(|| black_box(PlanarDelaunay::new().solve(points).expect("random input")));
        });
    }
    group.finish();
}

fn bench_spherical(c: &mut Criterion) {
    let mut group = c.benchmark_group("spherical_delaunay");
    group.sample_size(20);
    for &count in COUNTS {
        let points = generate_random_lat_lon_seeded(count, 11);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("solve", count), &points, |b, points| {
            b.iter(|| black_box(SphericalDelaunay::new().solve(points).expect("random input")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_planar, bench_spherical);
criterion_main!(benches);
