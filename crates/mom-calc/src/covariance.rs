//! Augmented covariance of a complex moment vector and its linear propagation.
//!
//! A complex vector h is fully described to second order by the Hermitian
//! covariance V_H = E[δh δh^H] and the pseudo-covariance V_P = E[δh δh^T].
//! The augmented matrix [[V_H, V_P], [conj V_P, conj V_H]] is the covariance
//! of the stacked vector [h; conj h].

use mom_core::{CMatrix, Complex64, ErrorInfo, MomError};
use serde::{Deserialize, Serialize};

fn shape_error(message: &str, expected: (usize, usize), actual: (usize, usize)) -> MomError {
    MomError::Index(
        ErrorInfo::new("shape-mismatch", message)
            .with_context("expected", format!("{}x{}", expected.0, expected.1))
            .with_context("actual", format!("{}x{}", actual.0, actual.1)),
    )
}

/// Hermitian covariance and pseudo-covariance of an n-dimensional complex vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AugmentedCovarianceRepr")]
pub struct AugmentedCovariance {
    hermitian: CMatrix,
    pseudo: CMatrix,
}

#[derive(Deserialize)]
struct AugmentedCovarianceRepr {
    hermitian: CMatrix,
    pseudo: CMatrix,
}

impl TryFrom<AugmentedCovarianceRepr> for AugmentedCovariance {
    type Error = MomError;

    fn try_from(repr: AugmentedCovarianceRepr) -> Result<Self, Self::Error> {
        Self::new(repr.hermitian, repr.pseudo)
    }
}

impl AugmentedCovariance {
    /// Pairs the two n×n blocks; both must be square and of equal size.
    pub fn new(hermitian: CMatrix, pseudo: CMatrix) -> Result<Self, MomError> {
        let n = hermitian.nrows();
        if hermitian.shape() != (n, n) {
            return Err(shape_error("Hermitian covariance must be square", (n, n), hermitian.shape()));
        }
        if pseudo.shape() != (n, n) {
            return Err(shape_error("pseudo-covariance must match the Hermitian block", (n, n), pseudo.shape()));
        }
        Ok(Self { hermitian, pseudo })
    }

    /// All-zero covariance of dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            hermitian: CMatrix::zeros(n, n),
            pseudo: CMatrix::zeros(n, n),
        }
    }

    /// Vector dimension n.
    pub fn dim(&self) -> usize {
        self.hermitian.nrows()
    }

    /// V_H = E[δh δh^H].
    pub fn hermitian(&self) -> &CMatrix {
        &self.hermitian
    }

    /// V_P = E[δh δh^T].
    pub fn pseudo(&self) -> &CMatrix {
        &self.pseudo
    }

    /// Materializes the 2n×2n augmented matrix.
    pub fn to_augmented(&self) -> CMatrix {
        let n = self.dim();
        let mut out = CMatrix::zeros(2 * n, 2 * n);
        out.view_mut((0, 0), (n, n)).copy_from(&self.hermitian);
        out.view_mut((0, n), (n, n)).copy_from(&self.pseudo);
        out.view_mut((n, 0), (n, n)).copy_from(&self.pseudo.conjugate());
        out.view_mut((n, n), (n, n)).copy_from(&self.hermitian.conjugate());
        out
    }

    /// Reads V_H and V_P back from the top block row of an augmented matrix.
    pub fn from_augmented(augmented: &CMatrix) -> Result<Self, MomError> {
        let (rows, cols) = augmented.shape();
        if rows != cols || rows % 2 != 0 {
            return Err(shape_error(
                "augmented covariance must be square with even dimension",
                (rows + rows % 2, rows + rows % 2),
                (rows, cols),
            ));
        }
        let n = rows / 2;
        Ok(Self {
            hermitian: augmented.view((0, 0), (n, n)).clone_owned(),
            pseudo: augmented.view((0, n), (n, n)).clone_owned(),
        })
    }

    /// Propagates through the linear map h' = J h + K conj(h).
    ///
    /// Uses V' = J_aug V_aug J_aug^H with J_aug = [[J, K], [conj K, conj J]].
    pub fn propagate(&self, jacobian: &CMatrix, conj_jacobian: &CMatrix) -> Result<Self, MomError> {
        let n = self.dim();
        let m = jacobian.nrows();
        if jacobian.ncols() != n {
            return Err(shape_error("Jacobian does not match the covariance", (m, n), jacobian.shape()));
        }
        if conj_jacobian.shape() != (m, n) {
            return Err(shape_error(
                "conjugate Jacobian does not match the Jacobian",
                (m, n),
                conj_jacobian.shape(),
            ));
        }
        let mut j_aug = CMatrix::zeros(2 * m, 2 * n);
        j_aug.view_mut((0, 0), (m, n)).copy_from(jacobian);
        j_aug.view_mut((0, n), (m, n)).copy_from(conj_jacobian);
        j_aug.view_mut((m, 0), (m, n)).copy_from(&conj_jacobian.conjugate());
        j_aug.view_mut((m, n), (m, n)).copy_from(&jacobian.conjugate());
        let propagated = &j_aug * self.to_augmented() * j_aug.adjoint();
        Self::from_augmented(&propagated)
    }

    /// Multiplies both blocks by a real factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            hermitian: self.hermitian.map(|v| v * factor),
            pseudo: self.pseudo.map(|v| v * factor),
        }
    }

    /// Covariance of `h / divisor`: V_H is divided by |divisor|², V_P by divisor².
    pub fn divided(&self, divisor: Complex64) -> Self {
        let (hermitian_divisor, pseudo_divisor) = (divisor.norm_sqr(), divisor * divisor);
        Self {
            hermitian: self.hermitian.map(|v| v / hermitian_divisor),
            pseudo: self.pseudo.map(|v| v / pseudo_divisor),
        }
    }

    /// Largest violation of V_H = V_H^H and V_P = V_P^T.
    pub fn symmetry_deviation(&self) -> f64 {
        let hermitian = mom_core::max_abs_diff(&self.hermitian, &self.hermitian.adjoint());
        let pseudo = mom_core::max_abs_diff(&self.pseudo, &self.pseudo.transpose());
        hermitian.max(pseudo)
    }

    /// Whether the augmented matrix has no eigenvalue below `-tolerance · max(1, max|λ|)`.
    pub fn is_positive_semidefinite(&self, tolerance: f64) -> bool {
        let augmented = self.to_augmented();
        let hermitian_part = (&augmented + augmented.adjoint()).map(|v| v * 0.5);
        let eigen = nalgebra::SymmetricEigen::new(hermitian_part);
        let largest = eigen.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let floor = -tolerance * largest.max(1.0);
        eigen.eigenvalues.iter().all(|&v| v >= floor)
    }
}
