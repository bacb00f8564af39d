use std::f64::consts::PI;

use criterion::{criterion_group, criterion_main, Criterion};
use mom_basis::{AngularEvents, MomentIndexSet};
use mom_calc::{IntegralMatrix, RawMoments};
use mom_core::RngHandle;
use rand::Rng;

fn uniform_events(n: usize, seed: u64) -> AngularEvents {
    let mut rng = RngHandle::from_seed(seed);
    let theta = (0..n).map(|_| rng.gen_range(-1.0_f64..1.0).acos()).collect();
    let phi = (0..n).map(|_| rng.gen_range(-PI..PI)).collect();
    let big_phi = (0..n).map(|_| rng.gen_range(-PI..PI)).collect();
    AngularEvents::new(theta, phi, big_phi).expect("finite angles")
}

fn bench_accumulation(c: &mut Criterion) {
    let indices = MomentIndexSet::for_max_spin(2);
    let events = uniform_events(50_000, 1);
    c.bench_function("accumulate_raw_moments", |b| {
        b.iter(|| {
            let _ = RawMoments::from_events(&indices, &events, 0.8).expect("raw moments");
        });
    });
}

fn bench_integral_matrix(c: &mut Criterion) {
    let indices = MomentIndexSet::for_max_spin(2);
    let accepted = uniform_events(50_000, 2);
    c.bench_function("integral_matrix_build", |b| {
        b.iter(|| {
            let _ = IntegralMatrix::build(&indices, &accepted, 0.8, 100_000).expect("integral matrix");
        });
    });
}

criterion_group!(benches, bench_accumulation, bench_integral_matrix);
criterion_main!(benches);
