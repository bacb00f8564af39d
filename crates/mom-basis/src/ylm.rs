//! Spherical harmonics Y_L^M.

use std::f64::consts::PI;

use mom_core::{Complex64, ErrorInfo, MomError};

fn triangle(l: u32, m: u32) -> usize {
    (l * (l + 1) / 2 + m) as usize
}

fn recursion_coeff(l: u32, m: u32) -> f64 {
    let l = l as f64;
    let m = m as f64;
    ((4.0 * l * l - 1.0) / (l * l - m * m)).sqrt()
}

/// All spherical harmonics Y_L^M(θ, φ) with 0 ≤ M ≤ L ≤ `max_l` at one point.
///
/// Orthonormal on the unit sphere, Condon–Shortley phase included. Values are
/// produced by the normalized associated-Legendre recursion, which stays
/// stable for the L ranges moment analyses use.
#[derive(Debug, Clone)]
pub struct SphericalHarmonics {
    max_l: u32,
    values: Vec<Complex64>,
}

impl SphericalHarmonics {
    /// Evaluates the table at polar angle `theta` and azimuth `phi` (radians).
    pub fn evaluate(max_l: u32, theta: f64, phi: f64) -> Self {
        let size = triangle(max_l, max_l) + 1;
        let mut legendre = vec![0.0; size];
        let x = theta.cos();
        let s = theta.sin().abs();
        let mut diagonal = (1.0 / (4.0 * PI)).sqrt();
        for m in 0..=max_l {
            if m > 0 {
                diagonal *= -(((2 * m + 1) as f64) / ((2 * m) as f64)).sqrt() * s;
            }
            legendre[triangle(m, m)] = diagonal;
            if m < max_l {
                legendre[triangle(m + 1, m)] = x * ((2 * m + 3) as f64).sqrt() * diagonal;
            }
            for l in (m + 2)..=max_l {
                let value = recursion_coeff(l, m)
                    * (x * legendre[triangle(l - 1, m)]
                        - legendre[triangle(l - 2, m)] / recursion_coeff(l - 1, m));
                legendre[triangle(l, m)] = value;
            }
        }

        let mut values = Vec::with_capacity(size);
        for l in 0..=max_l {
            for m in 0..=l {
                let (sin, cos) = (m as f64 * phi).sin_cos();
                values.push(Complex64::new(cos, sin) * legendre[triangle(l, m)]);
            }
        }
        Self { max_l, values }
    }

    /// Largest L held by the table.
    pub fn max_l(&self) -> u32 {
        self.max_l
    }

    /// Y_L^M, or `None` when `l > max_l` or `|m| > l`.
    ///
    /// Negative M follow Y_L^{-M} = (-1)^M conj(Y_L^M).
    pub fn get(&self, l: u32, m: i32) -> Option<Complex64> {
        (l <= self.max_l && m.unsigned_abs() <= l).then(|| self.value(l, m))
    }

    pub(crate) fn value(&self, l: u32, m: i32) -> Complex64 {
        let abs_m = m.unsigned_abs();
        debug_assert!(l <= self.max_l && abs_m <= l);
        let value = self.values[triangle(l, abs_m)];
        if m >= 0 {
            value
        } else if abs_m % 2 == 0 {
            value.conj()
        } else {
            -value.conj()
        }
    }
}

/// Evaluates a single spherical harmonic Y_l^m(θ, φ), validating the quantum numbers.
pub fn ylm(l: i32, m: i32, theta: f64, phi: f64) -> Result<Complex64, MomError> {
    if l < 0 || m.abs() > l {
        return Err(MomError::Index(
            ErrorInfo::new("invalid-ylm", "spherical harmonic requires 0 <= |m| <= l")
                .with_context("l", l.to_string())
                .with_context("m", m.to_string()),
        ));
    }
    Ok(SphericalHarmonics::evaluate(l as u32, theta, phi).value(l as u32, m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::ComplexField;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).modulus() < 1e-12
    }

    #[test]
    fn low_order_closed_forms() {
        let (theta, phi) = (0.7_f64, -1.3_f64);
        let (x, s) = (theta.cos(), theta.sin());
        let table = SphericalHarmonics::evaluate(2, theta, phi);
        let e = |m: f64| {
            let (sin, cos) = (m * phi).sin_cos();
            Complex64::new(cos, sin)
        };

        assert!(close(table.value(0, 0), Complex64::new((1.0 / (4.0 * PI)).sqrt(), 0.0)));
        assert!(close(table.value(1, 0), Complex64::new((3.0 / (4.0 * PI)).sqrt() * x, 0.0)));
        assert!(close(table.value(1, 1), e(1.0) * (-(3.0 / (8.0 * PI)).sqrt() * s)));
        assert!(close(table.value(2, 0), Complex64::new((5.0 / (16.0 * PI)).sqrt() * (3.0 * x * x - 1.0), 0.0)));
        assert!(close(table.value(2, 1), e(1.0) * (-(15.0 / (8.0 * PI)).sqrt() * s * x)));
        assert!(close(table.value(2, 2), e(2.0) * ((15.0 / (32.0 * PI)).sqrt() * s * s)));
    }

    #[test]
    fn negative_m_follows_conjugation_symmetry() {
        let table = SphericalHarmonics::evaluate(3, 2.1, 0.4);
        assert!(close(table.value(3, -1), -table.value(3, 1).conj()));
        assert!(close(table.value(3, -2), table.value(3, 2).conj()));
        assert!(table.get(4, 0).is_none());
        assert!(table.get(2, -3).is_none());
    }

    #[test]
    fn invalid_quantum_numbers_fail() {
        assert!(matches!(ylm(1, 2, 0.3, 0.1), Err(MomError::Index(_))));
        assert!(matches!(ylm(-1, 0, 0.3, 0.1), Err(MomError::Index(_))));
        assert!(ylm(4, -3, 0.3, 0.1).is_ok());
    }
}
