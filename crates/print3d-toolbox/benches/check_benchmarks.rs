//! Benchmarks for the checks and the clean pipeline.
//!
//! Run with: cargo bench -p print3d-toolbox
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p print3d-toolbox -- --save-baseline main
//! 2. After changes: cargo bench -p print3d-toolbox -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use print3d_toolbox::checks::{CheckKind, run_check};
use print3d_toolbox::{CleanParams, Mesh, MeshObject, PrintSettings, Vertex, clean_non_manifold};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// UV sphere of quads with triangle fans at the poles.
fn create_uv_sphere(rings: u32, segments: u32) -> Mesh {
    let mut mesh = Mesh::new();
    let tau = std::f64::consts::TAU;
    let pi = std::f64::consts::PI;

    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
    for r in 1..rings {
        let theta = pi * r as f64 / rings as f64;
        for s in 0..segments {
            let phi = tau * s as f64 / segments as f64;
            mesh.vertices.push(Vertex::from_coords(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ));
        }
    }
    let south = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, -1.0));

    let ring = |r: u32, s: u32| 1 + r * segments + (s % segments);
    for s in 0..segments {
        mesh.faces.push(vec![0, ring(0, s), ring(0, s + 1)]);
    }
    for r in 0..rings - 2 {
        for s in 0..segments {
            mesh.faces.push(vec![
                ring(r, s),
                ring(r + 1, s),
                ring(r + 1, s + 1),
                ring(r, s + 1),
            ]);
        }
    }
    for s in 0..segments {
        mesh.faces
            .push(vec![south, ring(rings - 2, s + 1), ring(rings - 2, s)]);
    }
    mesh
}

fn test_cases() -> Vec<(&'static str, Mesh)> {
    vec![
        ("sphere_8x16", create_uv_sphere(8, 16)),
        ("sphere_16x32", create_uv_sphere(16, 32)),
        ("sphere_32x64", create_uv_sphere(32, 64)),
        ("sphere_64x128", create_uv_sphere(64, 128)),
    ]
}

// =============================================================================
// Check Benchmarks
// =============================================================================

fn bench_checks(c: &mut Criterion) {
    let settings = PrintSettings {
        thickness_min: 0.05,
        ..Default::default()
    };

    for kind in CheckKind::ALL {
        let mut group = c.benchmark_group(format!("Check/{}", kind));
        for (name, mesh) in test_cases() {
            group.throughput(Throughput::Elements(mesh.face_count() as u64));
            let object = MeshObject::new(name, mesh);
            group.bench_with_input(BenchmarkId::new("run", name), &object, |b, object| {
                b.iter(|| run_check(kind, black_box(object), &settings))
            });
        }
        group.finish();
    }
}

// =============================================================================
// Repair Benchmarks
// =============================================================================

fn bench_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("Clean");

    for (name, mut mesh) in test_cases() {
        // open the sphere at the north pole
        let segments = mesh.faces.iter().take_while(|f| f.len() == 3).count();
        mesh.faces.drain(0..segments);
        group.throughput(Throughput::Elements(mesh.face_count() as u64));

        group.bench_with_input(BenchmarkId::new("non_manifold", name), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| clean_non_manifold(&mut mesh, &CleanParams::default()),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_checks, bench_clean);
criterion_main!(benches);
