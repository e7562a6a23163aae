use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cylseg_3d::linalg;

// scalar per-point reference implementation
fn transform_points3d_scalar(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    for (point_dst, point_src) in dst_points.iter_mut().zip(src_points.iter()) {
        for (i, row) in dst_r_src.iter().enumerate() {
            point_dst[i] = row[0] * point_src[0]
                + row[1] * point_src[1]
                + row[2] * point_src[2]
                + dst_t_src[i];
        }
    }
}

fn bench_transform_points3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_points3d");

    for num_points in [1000, 10000, 100000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        let parameter_string = format!("{}", num_points);

        let src_points = vec![[2.0, 2.0, 2.0]; *num_points];
        let rotation = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let translation = [1.0, 2.0, 3.0];
        let mut dst_points = vec![[0.0; 3]; src_points.len()];

        group.bench_with_input(
            BenchmarkId::new("transform_points3d", &parameter_string),
            &(&src_points, &rotation, &translation, &mut dst_points),
            |b, i| {
                let (src, rot, trans, mut dst) = (i.0, i.1, i.2, i.3.clone());
                b.iter(|| {
                    linalg::transform_points3d(src, rot, trans, &mut dst).unwrap();
                    black_box(());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("transform_points3d_scalar", &parameter_string),
            &(&src_points, &rotation, &translation, &mut dst_points),
            |b, i| {
                let (src, rot, trans, mut dst) = (i.0, i.1, i.2, i.3.clone());
                b.iter(|| {
                    transform_points3d_scalar(src, rot, trans, &mut dst);
                    black_box(());
                });
            },
        );
    }
}

fn bench_sym_eigen3(c: &mut Criterion) {
    let mut group = c.benchmark_group("sym_eigen3");

    let cov = [2.0, 1.0, 0.5, 2.0, 0.25, 5.0];

    group.bench_function(BenchmarkId::new("sym_eigen3", ""), |b| {
        b.iter(|| {
            let _ = linalg::sym_eigen3(black_box(&cov));
        });
    });
}

criterion_group!(benches, bench_transform_points3d, bench_sym_eigen3);
criterion_main!(benches);
