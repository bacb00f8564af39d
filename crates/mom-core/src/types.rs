use nalgebra::{Complex, ComplexField, DMatrix, DVector};

/// Complex double precision scalar used for every moment and basis value.
pub type Complex64 = Complex<f64>;

/// Dense complex matrix (integral matrices, covariance blocks, Jacobians).
pub type CMatrix = DMatrix<Complex64>;

/// Dense complex column vector (moment vectors).
pub type CVector = DVector<Complex64>;

/// Largest element-wise modulus of `a - b`; `f64::INFINITY` when shapes differ.
pub fn max_abs_diff(a: &CMatrix, b: &CMatrix) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).modulus())
        .fold(0.0, f64::max)
}
