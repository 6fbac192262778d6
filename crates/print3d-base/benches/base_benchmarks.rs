//! Benchmarks for base generation.
//!
//! Run with: cargo bench -p print3d-base
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p print3d-base -- --save-baseline main
//! 2. After changes: cargo bench -p print3d-base -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use print3d_base::{BaseBuilder, solidify, voxel_remesh};
use print3d_toolbox::{Mesh, MeshObject, Vertex};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Dome of quads over a square footprint, closed with a flat bottom.
fn create_dome(size: f64, resolution: u32) -> Mesh {
    let mut mesh = Mesh::new();
    let n = resolution;
    let step = size / n as f64;
    let half = size / 2.0;

    for j in 0..=n {
        for i in 0..=n {
            let x = i as f64 * step - half;
            let y = j as f64 * step - half;
            let r2 = (x * x + y * y) / (half * half);
            let z = 1.0 + (1.0 - r2).max(0.0) * half;
            mesh.vertices.push(Vertex::from_coords(x, y, z));
        }
    }
    let row = n + 1;
    for j in 0..n {
        for i in 0..n {
            let a = j * row + i;
            mesh.faces.push(vec![a, a + 1, a + row + 1, a + row]);
        }
    }
    mesh
}

fn bench_solidify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Solidify");

    for resolution in [16, 32, 64, 128] {
        let sheet = create_dome(10.0, resolution);
        group.throughput(Throughput::Elements(sheet.face_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("dome", resolution),
            &sheet,
            |b, sheet| b.iter(|| solidify(black_box(sheet), 0.7)),
        );
    }

    group.finish();
}

fn bench_remesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoxelRemesh");
    group.sample_size(10);

    let (slab, _) = solidify(&create_dome(10.0, 32), 0.7);
    for voxel in [0.6, 0.3, 0.15] {
        group.bench_with_input(BenchmarkId::new("dome", voxel), &voxel, |b, &voxel| {
            b.iter(|| voxel_remesh(black_box(&slab), voxel, 50_000_000))
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("BaseBuilder");
    group.sample_size(10);

    for size in [5.0, 10.0, 20.0] {
        let object = MeshObject::new("dome", create_dome(size, 32));
        group.bench_with_input(BenchmarkId::new("dome", size), &object, |b, object| {
            b.iter(|| BaseBuilder::new(black_box(object)).build())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solidify, bench_remesh, bench_build);
criterion_main!(benches);
