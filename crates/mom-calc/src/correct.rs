//! Acceptance correction and normalization of raw moments.
//!
//! The stages are encoded in the type: a [`MomentCorrector<Uncorrected>`] can
//! only be corrected, and only a corrected one can be normalized into a
//! [`MomentResult`].

use std::marker::PhantomData;

use mom_basis::{AngularEvents, MomentIndexSet};
use mom_core::{CMatrix, CVector, Complex64, ErrorInfo, MomError};
use nalgebra::ComplexField;

use crate::accumulate::RawMoments;
use crate::bootstrap::bootstrap_replicas;
use crate::covariance::AugmentedCovariance;
use crate::integral::IntegralMatrix;
use crate::opts::{ConditioningOpts, CorrectionOpts, NormalizationOpts};
use crate::result::MomentResult;

/// Raw moments straight from the accumulator.
#[derive(Debug, Clone, Copy)]
pub struct Uncorrected;

/// Moments mapped through the inverse acceptance integral matrix.
#[derive(Debug, Clone, Copy)]
pub struct AcceptanceCorrected;

/// Moment vector and covariance moving through the correction stages.
#[derive(Debug, Clone)]
pub struct MomentCorrector<S> {
    indices: MomentIndexSet,
    values: CVector,
    covariance: AugmentedCovariance,
    n_events: usize,
    _stage: PhantomData<S>,
}

fn normalization_error(code: &str, message: &str, reference: Complex64) -> MomError {
    MomError::Normalization(
        ErrorInfo::new(code, message)
            .with_context("reference_re", format!("{:e}", reference.re))
            .with_context("reference_im", format!("{:e}", reference.im)),
    )
}

impl<S> MomentCorrector<S> {
    /// Index set ordering the moments.
    pub fn indices(&self) -> &MomentIndexSet {
        &self.indices
    }

    /// Current moment values.
    pub fn values(&self) -> &CVector {
        &self.values
    }

    /// Current augmented covariance.
    pub fn covariance(&self) -> &AugmentedCovariance {
        &self.covariance
    }

    /// Number of events behind the moments.
    pub fn n_events(&self) -> usize {
        self.n_events
    }
}

impl MomentCorrector<Uncorrected> {
    /// Starts the pipeline from accumulated raw moments.
    pub fn new(raw: RawMoments) -> Self {
        Self {
            indices: raw.indices().clone(),
            values: raw.values().clone(),
            covariance: raw.covariance().clone(),
            n_events: raw.n_events(),
            _stage: PhantomData,
        }
    }

    /// Applies H_phys = I_acc⁻¹ H_meas; `None` means perfect acceptance.
    pub fn correct(
        self,
        integral: Option<&IntegralMatrix>,
        opts: &ConditioningOpts,
    ) -> Result<MomentCorrector<AcceptanceCorrected>, MomError> {
        match integral {
            None => {
                tracing::debug!(moments = self.indices.len(), "no acceptance correction requested");
                Ok(self.into_stage())
            }
            Some(integral) => {
                self.indices.ensure_same(integral.indices())?;
                let inverse = integral
                    .inverse(opts)
                    .map_err(|err| err.with_context("stage", "acceptance-correction"))?;
                self.correct_with_inverse(&inverse)
            }
        }
    }

    /// Applies a precomputed inverse integral matrix.
    pub fn correct_with_inverse(
        self,
        inverse: &CMatrix,
    ) -> Result<MomentCorrector<AcceptanceCorrected>, MomError> {
        let n = self.indices.len();
        if inverse.shape() != (n, n) {
            return Err(MomError::Index(
                ErrorInfo::new("shape-mismatch", "inverse integral matrix does not match the moments")
                    .with_context("expected", format!("{n}x{n}"))
                    .with_context("actual", format!("{}x{}", inverse.nrows(), inverse.ncols())),
            ));
        }
        let values = inverse * &self.values;
        // H_phys depends on H_meas only, never on conj(H_meas), so the conjugate Jacobian is zero.
        let covariance = self.covariance.propagate(inverse, &CMatrix::zeros(n, n))?;
        tracing::debug!(moments = n, events = self.n_events, "applied acceptance correction");
        Ok(MomentCorrector {
            indices: self.indices,
            values,
            covariance,
            n_events: self.n_events,
            _stage: PhantomData,
        })
    }

    fn into_stage(self) -> MomentCorrector<AcceptanceCorrected> {
        MomentCorrector {
            indices: self.indices,
            values: self.values,
            covariance: self.covariance,
            n_events: self.n_events,
            _stage: PhantomData,
        }
    }
}

/// Checks that H_0(0, 0) is usable as the normalization reference.
pub(crate) fn check_reference(reference: Complex64, opts: &NormalizationOpts) -> Result<(), MomError> {
    let magnitude = reference.modulus();
    if !magnitude.is_finite() || magnitude < opts.min_reference_magnitude {
        return Err(normalization_error(
            "reference-underflow",
            "H_0(0, 0) is too small to normalize to",
            reference,
        ));
    }
    let relative_imaginary = reference.im.abs() / magnitude;
    if relative_imaginary > opts.max_relative_imaginary {
        return Err(normalization_error(
            "reference-not-real",
            "H_0(0, 0) has a large imaginary part",
            reference,
        )
        .with_context("relative_imaginary", format!("{relative_imaginary:e}")));
    }
    if relative_imaginary > opts.warn_relative_imaginary {
        tracing::warn!(
            relative_imaginary,
            reference_re = reference.re,
            reference_im = reference.im,
            "normalizing to a reference moment with non-negligible imaginary part"
        );
    }
    Ok(())
}

impl MomentCorrector<AcceptanceCorrected> {
    /// Divides by H_0(0, 0) so that the reference becomes one.
    ///
    /// The covariance follows the same scalar map, V_H / |ref|² and V_P / ref²;
    /// the uncertainty of the reference itself is not propagated.
    pub fn normalize(self, opts: &NormalizationOpts) -> Result<MomentResult, MomError> {
        let reference = self.values[self.indices.reference_index()];
        check_reference(reference, opts)?;
        let values = self.values.map(|v| v / reference);
        let covariance = self.covariance.divided(reference);
        MomentResult::new(self.indices, values, covariance)
    }

    /// Keeps the acceptance-corrected moments unnormalized.
    pub fn into_result(self) -> Result<MomentResult, MomError> {
        MomentResult::new(self.indices, self.values, self.covariance)
    }
}

/// Runs accumulation, correction, normalization and bootstrap for one sample.
pub fn calculate_moments(
    indices: &MomentIndexSet,
    data: &AngularEvents,
    polarization: f64,
    integral: Option<&IntegralMatrix>,
    opts: &CorrectionOpts,
) -> Result<MomentResult, MomError> {
    let inverse = match integral {
        Some(integral) => {
            indices.ensure_same(integral.indices())?;
            Some(
                integral
                    .inverse(&opts.conditioning)
                    .map_err(|err| err.with_context("stage", "acceptance-correction"))?,
            )
        }
        None => None,
    };
    let raw = RawMoments::from_events(indices, data, polarization)
        .map_err(|err| err.with_context("stage", "accumulation"))?;
    let corrector = MomentCorrector::new(raw);
    let corrected = match &inverse {
        Some(inverse) => corrector.correct_with_inverse(inverse)?,
        None => corrector.correct(None, &opts.conditioning)?,
    };
    let result = corrected
        .normalize(&opts.normalization)
        .map_err(|err| err.with_context("stage", "normalization"))?;
    if opts.bootstrap.samples == 0 {
        return Ok(result);
    }
    let replicas = bootstrap_replicas(
        indices,
        data,
        polarization,
        inverse.as_ref(),
        &opts.normalization,
        &opts.bootstrap,
    )
    .map_err(|err| err.with_context("stage", "bootstrap"))?;
    result.with_bootstrap(replicas)
}
