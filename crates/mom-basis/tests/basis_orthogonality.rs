use std::f64::consts::PI;

use mom_basis::{AngularEvents, BasisEvaluator, MomentIndexSet};

/// Midpoint grid in cos θ and uniform grids in φ and Φ, with the cell volume.
fn quadrature_grid(n_cos: usize, n_phi: usize, n_big_phi: usize) -> (AngularEvents, f64) {
    let mut theta = Vec::new();
    let mut phi = Vec::new();
    let mut big_phi = Vec::new();
    for i in 0..n_cos {
        let cos_theta = -1.0 + (i as f64 + 0.5) * 2.0 / n_cos as f64;
        for j in 0..n_phi {
            for k in 0..n_big_phi {
                theta.push(cos_theta.acos());
                phi.push(-PI + j as f64 * 2.0 * PI / n_phi as f64);
                big_phi.push(-PI + k as f64 * 2.0 * PI / n_big_phi as f64);
            }
        }
    }
    let cell = (2.0 / n_cos as f64) * (2.0 * PI / n_phi as f64) * (2.0 * PI / n_big_phi as f64);
    (AngularEvents::new(theta, phi, big_phi).expect("grid"), cell)
}

#[test]
fn measured_and_physical_functions_are_biorthogonal() {
    let set = MomentIndexSet::new(2);
    let (grid, cell) = quadrature_grid(400, 16, 12);
    let evaluator = BasisEvaluator::new(&set, 0.7).expect("polarization");
    let (meas, phys) = evaluator.evaluate_pair(&grid, 0..grid.len()).expect("grid in range");
    let overlap = (&meas * phys.transpose()) * nalgebra::Complex::new(cell, 0.0);
    for row in 0..set.len() {
        for col in 0..set.len() {
            let expected = if row == col { 1.0 } else { 0.0 };
            let value = overlap[(row, col)];
            assert!(
                (value.re - expected).abs() < 1e-3 && value.im.abs() < 1e-3,
                "{} x {} -> {value}",
                set.get(row).expect("row"),
                set.get(col).expect("col"),
            );
        }
    }
}
