//! Acceptance integral matrix from accepted phase-space events.

use std::f64::consts::PI;

use mom_basis::{AngularEvents, BasisEvaluator, MomentIndexSet, DEFAULT_CHUNK_SIZE};
use mom_core::{CMatrix, Complex64, ErrorInfo, MomError};
use nalgebra::linalg::Schur;
use nalgebra::ComplexField;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::opts::ConditioningOpts;

const SCHUR_EPS: f64 = 1e-14;
const SCHUR_MAX_ITER: usize = 10_000;

fn conditioning_error(code: &str, message: impl Into<String>) -> MomError {
    MomError::Conditioning(ErrorInfo::new(code, message))
}

fn format_spectrum(eigenvalues: &[Complex64], count: usize) -> String {
    eigenvalues
        .iter()
        .take(count)
        .map(|v| format!("{:.3e}", v.modulus()))
        .collect::<Vec<_>>()
        .join(",")
}

/// I_acc[k, j] = (8π² / M) Σ_accepted f_meas_k f_phys_j.
///
/// Its inverse maps measured moments onto physical ones, H_phys = I_acc⁻¹ H_meas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntegralMatrixRepr")]
pub struct IntegralMatrix {
    indices: MomentIndexSet,
    matrix: CMatrix,
}

#[derive(Deserialize)]
struct IntegralMatrixRepr {
    indices: MomentIndexSet,
    matrix: CMatrix,
}

impl TryFrom<IntegralMatrixRepr> for IntegralMatrix {
    type Error = MomError;

    fn try_from(repr: IntegralMatrixRepr) -> Result<Self, Self::Error> {
        Self::from_matrix(&repr.indices, repr.matrix)
    }
}

impl IntegralMatrix {
    /// Builds the matrix from accepted phase-space events out of `n_generated` generated ones.
    pub fn build(
        indices: &MomentIndexSet,
        accepted: &AngularEvents,
        polarization: f64,
        n_generated: usize,
    ) -> Result<Self, MomError> {
        if n_generated == 0 {
            return Err(MomError::Sample(ErrorInfo::new(
                "no-generated-events",
                "integral matrix needs a non-zero number of generated events",
            )));
        }
        if accepted.is_empty() {
            return Err(MomError::Sample(ErrorInfo::new(
                "no-accepted-events",
                "integral matrix needs accepted phase-space events",
            )));
        }
        if accepted.len() > n_generated {
            return Err(MomError::Sample(
                ErrorInfo::new("accepted-exceeds-generated", "more accepted than generated events")
                    .with_context("accepted", accepted.len().to_string())
                    .with_context("generated", n_generated.to_string()),
            ));
        }
        let evaluator = BasisEvaluator::new(indices, polarization)?;
        let n = indices.len();
        let partials = accepted
            .chunks(DEFAULT_CHUNK_SIZE)
            .into_par_iter()
            .map(|range| -> Result<CMatrix, MomError> {
                let (measured, physical) = evaluator.evaluate_pair(accepted, range)?;
                Ok(&measured * physical.transpose())
            })
            .collect::<Result<Vec<CMatrix>, MomError>>()?;
        let sum = partials
            .into_iter()
            .fold(CMatrix::zeros(n, n), |acc, part| acc + part);
        let matrix = sum.map(|v| v * (8.0 * PI * PI / n_generated as f64));
        let built = Self {
            indices: indices.clone(),
            matrix,
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(eigenvalues) = built.eigenvalues() {
                tracing::debug!(
                    moments = n,
                    accepted = accepted.len(),
                    generated = n_generated,
                    min_eigenvalue = eigenvalues.first().map(|v| v.modulus()).unwrap_or_default(),
                    max_eigenvalue = eigenvalues.last().map(|v| v.modulus()).unwrap_or_default(),
                    "built acceptance integral matrix"
                );
            }
        }
        Ok(built)
    }

    /// Wraps an externally supplied matrix after checking its shape.
    pub fn from_matrix(indices: &MomentIndexSet, matrix: CMatrix) -> Result<Self, MomError> {
        indices.ensure_len("integral matrix rows", matrix.nrows())?;
        indices.ensure_len("integral matrix columns", matrix.ncols())?;
        Ok(Self {
            indices: indices.clone(),
            matrix,
        })
    }

    /// Perfect acceptance.
    pub fn identity(indices: &MomentIndexSet) -> Self {
        Self {
            indices: indices.clone(),
            matrix: CMatrix::identity(indices.len(), indices.len()),
        }
    }

    /// Index set labelling rows and columns.
    pub fn indices(&self) -> &MomentIndexSet {
        &self.indices
    }

    /// The n×n matrix.
    pub fn matrix(&self) -> &CMatrix {
        &self.matrix
    }

    /// Complex eigenvalues sorted by ascending modulus.
    pub fn eigenvalues(&self) -> Result<Vec<Complex64>, MomError> {
        let schur = Schur::try_new(self.matrix.clone(), SCHUR_EPS, SCHUR_MAX_ITER)
            .ok_or_else(|| conditioning_error("eigen-not-converged", "Schur decomposition did not converge"))?;
        let mut eigenvalues: Vec<Complex64> = schur
            .eigenvalues()
            .ok_or_else(|| conditioning_error("eigen-not-converged", "Schur form is not triangular"))?
            .iter()
            .copied()
            .collect();
        eigenvalues.sort_by(|a, b| a.modulus().total_cmp(&b.modulus()));
        Ok(eigenvalues)
    }

    /// min|λ| / max|λ|; zero for the zero matrix.
    pub fn conditioning(&self) -> Result<f64, MomError> {
        let eigenvalues = self.eigenvalues()?;
        let largest = eigenvalues.last().map(|v| v.modulus()).unwrap_or_default();
        if largest == 0.0 {
            return Ok(0.0);
        }
        let smallest = eigenvalues.first().map(|v| v.modulus()).unwrap_or_default();
        Ok(smallest / largest)
    }

    /// Inverse, refused when the matrix is singular or ill-conditioned.
    pub fn inverse(&self, opts: &ConditioningOpts) -> Result<CMatrix, MomError> {
        let eigenvalues = self.eigenvalues()?;
        let largest = eigenvalues.last().map(|v| v.modulus()).unwrap_or_default();
        let smallest = eigenvalues.first().map(|v| v.modulus()).unwrap_or_default();
        let ratio = if largest > 0.0 { smallest / largest } else { 0.0 };
        if ratio < opts.min_relative_eigenvalue {
            return Err(conditioning_error(
                "ill-conditioned-acceptance",
                "acceptance integral matrix is singular or ill-conditioned",
            )
            .with_context("ratio", format!("{ratio:.3e}"))
            .with_context("smallest_eigenvalues", format_spectrum(&eigenvalues, 5))
            .with_context("largest_eigenvalue", format!("{largest:.3e}")));
        }
        self.matrix.clone().try_inverse().ok_or_else(|| {
            conditioning_error("singular-acceptance", "LU inversion of the integral matrix failed")
                .with_context("ratio", format!("{ratio:.3e}"))
        })
    }

    /// I_kj / sqrt(|I_kk| |I_jj|), zero where a diagonal entry vanishes.
    pub fn normalized(&self) -> CMatrix {
        let diagonal: Vec<f64> = self.matrix.diagonal().iter().map(|v| v.modulus()).collect();
        CMatrix::from_fn(self.matrix.nrows(), self.matrix.ncols(), |k, j| {
            let denom = (diagonal[k] * diagonal[j]).sqrt();
            if denom > 0.0 {
                self.matrix[(k, j)] / denom
            } else {
                Complex64::default()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serde::{from_json, to_json};

    #[test]
    fn zero_matrix_is_refused() {
        let indices = MomentIndexSet::new(0);
        let zero = IntegralMatrix::from_matrix(&indices, CMatrix::zeros(2, 2)).expect("shape");
        let err = zero.inverse(&ConditioningOpts::default()).expect_err("singular");
        assert!(matches!(err, MomError::Conditioning(_)));
        assert!(err.info().context.contains_key("smallest_eigenvalues"));
    }

    #[test]
    fn eigenvalues_are_sorted_by_modulus() {
        let indices = MomentIndexSet::new(0);
        let matrix = CMatrix::from_diagonal(&mom_core::CVector::from_vec(vec![
            Complex64::new(3.0, 0.0),
            Complex64::new(0.0, -0.5),
        ]));
        let integral = IntegralMatrix::from_matrix(&indices, matrix).expect("shape");
        let eigenvalues = integral.eigenvalues().expect("diagonal");
        assert!((eigenvalues[0] - Complex64::new(0.0, -0.5)).modulus() < 1e-12);
        assert!((integral.conditioning().expect("diagonal") - 0.5 / 3.0).abs() < 1e-12);
        let normalized = integral.normalized();
        assert!((normalized[(1, 1)] - Complex64::new(0.0, -1.0)).modulus() < 1e-12);
    }

    #[test]
    fn empty_or_inconsistent_samples_fail() {
        let indices = MomentIndexSet::new(1);
        let empty = AngularEvents::default();
        assert!(matches!(IntegralMatrix::build(&indices, &empty, 0.5, 10), Err(MomError::Sample(_))));
        let two = AngularEvents::new(vec![0.1, 0.2], vec![0.0, 0.0], vec![0.0, 0.0]).expect("valid");
        assert!(matches!(IntegralMatrix::build(&indices, &two, 0.5, 0), Err(MomError::Sample(_))));
        assert!(matches!(IntegralMatrix::build(&indices, &two, 0.5, 1), Err(MomError::Sample(_))));
        assert!(IntegralMatrix::from_matrix(&indices, CMatrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn decoding_checks_the_matrix_shape() {
        let indices = MomentIndexSet::new(0);
        let integral = IntegralMatrix::identity(&indices);
        let back: IntegralMatrix = from_json(&to_json(&integral).expect("encode")).expect("decode");
        assert_eq!(back, integral);

        let mut value = serde_json::to_value(&integral).expect("encode");
        value["matrix"] = serde_json::to_value(CMatrix::zeros(2, 3)).expect("encode");
        let err = from_json::<IntegralMatrix>(&value.to_string()).expect_err("non-square");
        assert!(matches!(err, MomError::Serde(_)));
    }
}
