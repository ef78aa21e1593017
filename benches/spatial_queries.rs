//! Spatial index benchmarks: bulk insertion, sphere queries and nearest-member
//! queries over seeded random point sets.
//!
//! ```bash
//! cargo bench --bench spatial_queries
//! ```

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use orthtree_delaunay::core::spatial_index::{SpatialIndex, SpatialIndexConfigBuilder};
use orthtree_delaunay::geometry::util::generate_random_points_seeded;
use std::hint::black_box;

const COUNTS: &[usize] = &[1_000, 10_000];
const BOUNDS: (f64, f64) = (0.0, 100.0);

fn build_index<const D: usize>(points: &[[f64; D]], fast_removals: bool) -> SpatialIndex<usize, D> {
    let config = SpatialIndexConfigBuilder::default()
        .lower_bounds([BOUNDS.0; D])
        .upper_bounds([BOUNDS.1; D])
        .fast_removals(fast_removals)
        .build()
        .expect("benchmark bounds are valid");
    let mut index = SpatialIndex::new(config).expect("benchmark configuration is valid");
    for (i, p) in points.iter().enumerate() {
        index.insert(*p, i).expect("generated points are finite");
    }
    index
}

macro_rules! benchmark_dimension {
    ($dim:literal, $func_name:ident, $seed:literal) => {
        fn $func_name(c: &mut Criterion) {
            let mut group = c.benchmark_group(concat!("spatial_index_", stringify!($dim), "d"));

            for &count in COUNTS {
                let points =
                    generate_random_points_seeded::<$dim>(count, BOUNDS, $seed + count as u64)
                        .expect("benchmark range is valid");
                let queries = generate_random_points_seeded::<$dim>(100, BOUNDS, $seed)
                    .expect("benchmark range is valid");
                group.throughput(Throughput::Elements(count as u64));

                group.bench_with_input(BenchmarkId::new("insert", count), &points, |b, points| {
                    b.iter(|| black_box(build_index(points, false)));
                });

                let index = build_index(&points, true);
                group.bench_with_input(
                    BenchmarkId::new("members_in_sphere", count),
                    &queries,
                    |b, queries| {
                        b.iter(|| {
                            for q in queries {
                                black_box(index.members_in_sphere(10.0, *q).expect("valid query"));
                            }
                        });
                    },
                );
                group.bench_with_input(
                    BenchmarkId::new("nearest_member", count),
                    &queries,
                    |b, queries| {
                        b.iter(|| {
                            for q in queries {
                                black_box(index.nearest_member(*q).expect("valid query"));
                            }
                        });
                    },
                );
                group.bench_with_input(
                    BenchmarkId::new("remove_reinsert", count),
                    &points,
                    |b, points| {
                        let mut index = build_index(points, true);
                        b.iter(|| {
                            for i in 0..100 {
                                index.remove(&i).expect("index is consistent");
                            }
                            for (i, p) in points.iter().enumerate().take(100) {
                                index.insert(*p, i).expect("generated points are finite");
                            }
                        });
                    },
                );
            }
            group.finish();
        }
    };
}

benchmark_dimension!(2, benchmark_spatial_index_2d, 42);
benchmark_dimension!(3, benchmark_spatial_index_3d, 123);

criterion_group!(
    benches,
    benchmark_spatial_index_2d,
    benchmark_spatial_index_3d
);
criterion_main!(benches);
