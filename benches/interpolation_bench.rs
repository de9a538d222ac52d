use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use globe_mesh::config::InterpolationOptions;
use globe_mesh::functionspace::{PointCloud, StructuredColumns};
use globe_mesh::interpolation::{Interpolation, KernelKind, StructuredGrid};

fn targets(n: usize) -> PointCloud {
    let mut rng = SmallRng::seed_from_u64(42);
    PointCloud::new(
        (0..n)
            .map(|_| [rng.gen_range(0.0..360.0), rng.gen_range(-90.0..90.0)])
            .collect(),
    )
}

fn bench_interpolation(c: &mut Criterion) {
    let fs = StructuredColumns::new(Arc::new(StructuredGrid::regular_lonlat(360, 181).unwrap()));
    let targets = targets(50_000);
    let mut src = fs.create_field::<f64>("t", 10, 1);
    for (v, k) in src.values_mut::<f64>().unwrap().iter_mut().zip(0u32..) {
        *v = f64::from(k % 97);
    }

    let mut group = c.benchmark_group("interpolation");
    for kernel in [KernelKind::Bilinear, KernelKind::Cubic, KernelKind::Nearest] {
        for matrix_free in [false, true] {
            let mut interp = Interpolation::new(&InterpolationOptions { kernel, matrix_free });
            let mode = if matrix_free { "matrix_free" } else { "matrix" };
            group.bench_with_input(BenchmarkId::new(format!("{kernel:?}/setup"), mode), &mode, |b, _| {
                b.iter(|| interp.setup(&fs, &targets).unwrap())
            });
            let mut dst = targets.create_field::<f64>("t", 10, 1);
            group.bench_with_input(BenchmarkId::new(format!("{kernel:?}/execute"), mode), &mode, |b, _| {
                b.iter(|| interp.execute_field(&src, &mut dst).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_interpolation);
criterion_main!(benches);
