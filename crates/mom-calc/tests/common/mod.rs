#![allow(dead_code)]

use std::f64::consts::PI;

use mom_basis::{AmplitudeSet, AmplitudeValue, AngularEvents};
use mom_core::{Complex64, RngHandle};
use rand::Rng;

/// Draws `n` events from `intensity` by accept–reject against `ceiling`.
pub fn sample_events(
    n: usize,
    seed: u64,
    ceiling: f64,
    intensity: impl Fn(f64, f64, f64) -> f64,
) -> AngularEvents {
    let mut rng = RngHandle::from_seed(seed);
    let (mut theta, mut phi, mut big_phi) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    while theta.len() < n {
        let t = rng.gen_range(-1.0_f64..1.0).acos();
        let p = rng.gen_range(-PI..PI);
        let b = rng.gen_range(-PI..PI);
        let value = intensity(t, p, b);
        assert!(value <= ceiling, "intensity {value} exceeds ceiling {ceiling}");
        if rng.gen_range(0.0..ceiling) < value {
            theta.push(t);
            phi.push(p);
            big_phi.push(b);
        }
    }
    AngularEvents::new(theta, phi, big_phi).expect("sampled angles are finite")
}

/// Uniform events over the full angular range.
pub fn uniform_events(n: usize, seed: u64) -> AngularEvents {
    sample_events(n, seed, 1.0, |_, _, _| 1.0)
}

/// Generates `n_generated` phase-space events and keeps those passing `efficiency`.
pub fn accepted_phase_space(
    n_generated: usize,
    seed: u64,
    efficiency: impl Fn(f64, f64, f64) -> f64,
) -> AngularEvents {
    let generated = uniform_events(n_generated, seed);
    let mut rng = RngHandle::from_seed(seed.wrapping_add(1));
    let picks: Vec<usize> = generated
        .iter()
        .enumerate()
        .filter(|(_, (t, p, b))| rng.gen_range(0.0..1.0) < efficiency(*t, *p, *b))
        .map(|(idx, _)| idx)
        .collect();
    generated.select(&picks).expect("indices in range")
}

/// Smooth detector efficiency between 0.2 and 0.9.
pub fn efficiency(theta: f64, phi: f64, _big_phi: f64) -> f64 {
    0.3 + 0.5 * theta.sin().powi(2) + 0.1 * phi.cos()
}

/// A single positive-reflectivity P_+1 wave.
pub fn single_p_wave() -> AmplitudeSet {
    AmplitudeSet::new([AmplitudeValue::new(1, 1, 1, Complex64::new(1.0, 0.0))]).expect("valid wave")
}
