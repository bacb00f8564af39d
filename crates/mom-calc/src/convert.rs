//! Conversion between the real 2n×2n covariance of (Re h, Im h) and the
//! complex (V_H, V_P) pair.
//!
//! The real layout is block-contiguous: rows and columns 0..n hold Re h,
//! rows and columns n..2n hold Im h.

use mom_core::{CMatrix, Complex64, ErrorInfo, MomError};
use nalgebra::DMatrix;

use crate::covariance::AugmentedCovariance;

/// Builds (V_H, V_P) from the real covariance of [Re h; Im h].
///
/// V_H = V_ReRe + V_ImIm + i (V_ImRe − V_ReIm) and
/// V_P = V_ReRe − V_ImIm + i (V_ImRe + V_ReIm).
pub fn to_complex(real: &DMatrix<f64>) -> Result<AugmentedCovariance, MomError> {
    let (rows, cols) = real.shape();
    if rows != cols || rows % 2 != 0 {
        return Err(MomError::Index(
            ErrorInfo::new("shape-mismatch", "real covariance must be square with even dimension")
                .with_context("rows", rows.to_string())
                .with_context("cols", cols.to_string()),
        ));
    }
    let n = rows / 2;
    let re_re = real.view((0, 0), (n, n));
    let re_im = real.view((0, n), (n, n));
    let im_re = real.view((n, 0), (n, n));
    let im_im = real.view((n, n), (n, n));
    let hermitian = CMatrix::from_fn(n, n, |a, b| {
        Complex64::new(re_re[(a, b)] + im_im[(a, b)], im_re[(a, b)] - re_im[(a, b)])
    });
    let pseudo = CMatrix::from_fn(n, n, |a, b| {
        Complex64::new(re_re[(a, b)] - im_im[(a, b)], im_re[(a, b)] + re_im[(a, b)])
    });
    AugmentedCovariance::new(hermitian, pseudo)
}

/// Recovers the real block covariance of [Re h; Im h] from (V_H, V_P).
pub fn to_real(covariance: &AugmentedCovariance) -> DMatrix<f64> {
    let n = covariance.dim();
    let hermitian = covariance.hermitian();
    let pseudo = covariance.pseudo();
    let mut out = DMatrix::zeros(2 * n, 2 * n);
    for a in 0..n {
        for b in 0..n {
            let (h, p) = (hermitian[(a, b)], pseudo[(a, b)]);
            out[(a, b)] = 0.5 * (h.re + p.re);
            out[(n + a, n + b)] = 0.5 * (h.re - p.re);
            out[(a, n + b)] = 0.5 * (p.im - h.im);
            out[(n + a, b)] = 0.5 * (p.im + h.im);
        }
    }
    out
}
