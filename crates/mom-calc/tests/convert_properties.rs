use mom_calc::{to_complex, to_real, AugmentedCovariance};
use mom_core::{max_abs_diff, CMatrix, Complex64};
use nalgebra::DMatrix;
use proptest::prelude::*;

fn real_matrix(max_n: usize) -> impl Strategy<Value = DMatrix<f64>> {
    (1..=max_n).prop_flat_map(|n| {
        prop::collection::vec(-10.0f64..10.0, 4 * n * n)
            .prop_map(move |data| DMatrix::from_vec(2 * n, 2 * n, data))
    })
}

fn symmetric(matrix: DMatrix<f64>) -> DMatrix<f64> {
    (&matrix + matrix.transpose()) * 0.5
}

fn complex_pair(max_n: usize) -> impl Strategy<Value = AugmentedCovariance> {
    (1..=max_n).prop_flat_map(|n| {
        prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), 2 * n * n).prop_map(move |data| {
            let values: Vec<Complex64> = data.into_iter().map(|(re, im)| Complex64::new(re, im)).collect();
            let hermitian = CMatrix::from_column_slice(n, n, &values[..n * n]);
            let pseudo = CMatrix::from_column_slice(n, n, &values[n * n..]);
            AugmentedCovariance::new(hermitian, pseudo).expect("square blocks")
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn real_to_complex_and_back(real in real_matrix(4)) {
        let back = to_real(&to_complex(&real).expect("even dimension"));
        let worst = real.iter().zip(back.iter()).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
        prop_assert!(worst < 1e-12);
    }

    #[test]
    fn complex_to_real_and_back(cov in complex_pair(4)) {
        let back = to_complex(&to_real(&cov)).expect("even dimension");
        prop_assert!(max_abs_diff(back.hermitian(), cov.hermitian()) < 1e-12);
        prop_assert!(max_abs_diff(back.pseudo(), cov.pseudo()) < 1e-12);
    }

    #[test]
    fn symmetric_real_covariance_gives_hermitian_and_symmetric_blocks(real in real_matrix(4)) {
        let cov = to_complex(&symmetric(real)).expect("even dimension");
        prop_assert!(cov.symmetry_deviation() < 1e-15);
    }
}

#[test]
fn single_moment_pseudo_covariance_carries_re_im_correlation() {
    // Perfectly correlated Re and Im with equal variance: h = (1 + i) x.
    let real = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
    let cov = to_complex(&real).expect("even dimension");
    assert_eq!(cov.hermitian()[(0, 0)], Complex64::new(2.0, 0.0));
    assert_eq!(cov.pseudo()[(0, 0)], Complex64::new(0.0, 2.0));
}
