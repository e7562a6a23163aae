use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cylseg_sac::normals::estimate_normals;
use cylseg_sac::sac::{segment_cylinder, SacParams};

/// Points and exact radial normals of a cylinder around the z axis.
fn make_cylinder(rings: usize, per_ring: usize) -> (Vec<[f64; 3]>, Vec<[f64; 3]>) {
    let radius = 0.05;
    let mut points = Vec::with_capacity(rings * per_ring);
    let mut normals = Vec::with_capacity(rings * per_ring);
    for ring in 0..rings {
        for k in 0..per_ring {
            let theta = k as f64 * std::f64::consts::TAU / per_ring as f64;
            points.push([
                radius * theta.cos(),
                radius * theta.sin(),
                ring as f64 * 0.02,
            ]);
            normals.push([theta.cos(), theta.sin(), 0.0]);
        }
    }
    (points, normals)
}

fn bench_estimate_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_normals");

    for rings in [20, 50].iter() {
        let (points, _) = make_cylinder(*rings, 12);
        group.throughput(criterion::Throughput::Elements(points.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("estimate_normals", points.len()),
            &points,
            |b, points| {
                b.iter(|| {
                    let normals = estimate_normals(black_box(points), 0.03);
                    black_box(normals);
                });
            },
        );
    }
}

fn bench_segment_cylinder(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_cylinder");
    group.sample_size(10);

    let params = SacParams {
        radius_limits: (0.0, 0.1),
        max_iterations: 1000,
        seed: Some(42),
        ..SacParams::default()
    };

    for rings in [20, 50].iter() {
        let (points, normals) = make_cylinder(*rings, 12);
        group.throughput(criterion::Throughput::Elements(points.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("segment_cylinder", points.len()),
            &(points, normals),
            |b, (points, normals)| {
                b.iter(|| {
                    let result = segment_cylinder(points, normals, &params).unwrap();
                    black_box(result);
                });
            },
        );
    }
}

criterion_group!(benches, bench_estimate_normals, bench_segment_cylinder);
criterion_main!(benches);
