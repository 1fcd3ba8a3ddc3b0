use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

use bipersist::complex::SimplexTree;
use bipersist::matrix::SparseBinaryMatrix;

// splitmix-style mixer; deterministic inputs without an RNG dependency
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// The dimension-2 boundary matrix of a Rips bifiltration on `n` points
/// with pseudo-random times and distances.
fn rips_triangle_boundary(n: usize) -> SparseBinaryMatrix {
    let (num_x, num_y) = (4u32, 8u32);
    let times: Vec<u32> = (0..n).map(|i| mix(i as u64) as u32 % num_x).collect();
    let distances: Vec<u32> = (0..n * (n - 1) / 2)
        .map(|k| mix(0xabcd ^ k as u64) as u32 % num_y)
        .collect();

    let mut tree =
        SimplexTree::build_rips(&times, &distances, 2, num_x as usize, num_y as usize).unwrap();
    tree.update_global_indexes();
    tree.update_dim_indexes(2).unwrap();
    tree.boundary_matrix(2).unwrap().mat
}

fn bench_col_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("col_reduce");
    for &n in &[15usize, 30, 45] {
        let boundary = rips_triangle_boundary(n);
        group.bench_with_input(BenchmarkId::new("rips_d2", n), &boundary, |b, m| {
            b.iter_batched(
                || m.clone(),
                |mut m| {
                    m.col_reduce().unwrap();
                    m
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_col_reduce);
criterion_main!(benches);
