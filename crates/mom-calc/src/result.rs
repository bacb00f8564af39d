//! Final moment values, uncertainties and consistency diagnostics.

use mom_basis::{MomentIndexSet, QnMomentIndex};
use mom_core::{CVector, Complex64, MomError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::convert;
use crate::covariance::AugmentedCovariance;

/// One moment with its uncertainties and optional bootstrap replicas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentValue {
    /// Quantum numbers.
    pub qn: QnMomentIndex,
    /// Estimated value.
    pub value: Complex64,
    /// Standard deviation of the real part.
    pub uncert_re: f64,
    /// Standard deviation of the imaginary part.
    pub uncert_im: f64,
    /// Bootstrap replicas of the value, empty when resampling was disabled.
    #[serde(default)]
    pub bootstrap: Vec<Complex64>,
}

impl MomentValue {
    /// (value, σ) of the real part when `is_real`, else of the imaginary part.
    pub fn real_part(&self, is_real: bool) -> (f64, f64) {
        if is_real {
            (self.value.re, self.uncert_re)
        } else {
            (self.value.im, self.uncert_im)
        }
    }

    /// Bootstrap mean and standard deviation (ddof = 1) of the real or imaginary part.
    ///
    /// `None` with fewer than two replicas.
    pub fn bootstrap_estimate(&self, is_real: bool) -> Option<(f64, f64)> {
        if self.bootstrap.len() < 2 {
            return None;
        }
        let parts: Vec<f64> = self
            .bootstrap
            .iter()
            .map(|v| if is_real { v.re } else { v.im })
            .collect();
        let count = parts.len() as f64;
        let mean = parts.iter().sum::<f64>() / count;
        let variance = parts.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
        Some((mean, variance.sqrt()))
    }
}

/// Standardized residuals (estimate − truth) / σ of one moment.
///
/// A component is `None` when its σ vanishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pull {
    /// Quantum numbers.
    pub qn: QnMomentIndex,
    /// Pull of the real part.
    pub re: Option<f64>,
    /// Pull of the imaginary part.
    pub im: Option<f64>,
}

/// Physical moments with their augmented covariance, ordered by an index set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MomentResultRepr")]
pub struct MomentResult {
    indices: MomentIndexSet,
    values: CVector,
    covariance: AugmentedCovariance,
    bootstrap: Vec<CVector>,
}

#[derive(Deserialize)]
struct MomentResultRepr {
    indices: MomentIndexSet,
    values: CVector,
    covariance: AugmentedCovariance,
    #[serde(default)]
    bootstrap: Vec<CVector>,
}

impl TryFrom<MomentResultRepr> for MomentResult {
    type Error = MomError;

    fn try_from(repr: MomentResultRepr) -> Result<Self, Self::Error> {
        Self::new(repr.indices, repr.values, repr.covariance)?.with_bootstrap(repr.bootstrap)
    }
}

impl MomentResult {
    /// Assembles a result after checking every shape against `indices`.
    pub fn new(
        indices: MomentIndexSet,
        values: CVector,
        covariance: AugmentedCovariance,
    ) -> Result<Self, MomError> {
        indices.ensure_len("moment vector", values.len())?;
        indices.ensure_len("covariance", covariance.dim())?;
        Ok(Self {
            indices,
            values,
            covariance,
            bootstrap: Vec::new(),
        })
    }

    /// Exact values without uncertainty, e.g. moments computed from amplitudes.
    pub fn from_truth(indices: MomentIndexSet, values: CVector) -> Result<Self, MomError> {
        let n = indices.len();
        Self::new(indices, values, AugmentedCovariance::zeros(n))
    }

    /// Attaches bootstrap replicas; each must have one entry per moment.
    pub fn with_bootstrap(mut self, replicas: Vec<CVector>) -> Result<Self, MomError> {
        for replica in &replicas {
            self.indices.ensure_len("bootstrap replica", replica.len())?;
        }
        self.bootstrap = replicas;
        Ok(self)
    }

    /// Index set of the result.
    pub fn indices(&self) -> &MomentIndexSet {
        &self.indices
    }

    /// Moment values in flat-index order.
    pub fn values(&self) -> &CVector {
        &self.values
    }

    /// Augmented covariance (V_H, V_P).
    pub fn covariance(&self) -> &AugmentedCovariance {
        &self.covariance
    }

    /// Bootstrap replicas of the whole moment vector.
    pub fn bootstrap_replicas(&self) -> &[CVector] {
        &self.bootstrap
    }

    fn value_at(&self, flat: usize, qn: QnMomentIndex) -> MomentValue {
        let (re_re, im_im, _) = self.re_im_block(flat, flat);
        MomentValue {
            qn,
            value: self.values[flat],
            uncert_re: re_re.max(0.0).sqrt(),
            uncert_im: im_im.max(0.0).sqrt(),
            bootstrap: self.bootstrap.iter().map(|replica| replica[flat]).collect(),
        }
    }

    /// Value and uncertainties of one moment.
    pub fn value(&self, qn: &QnMomentIndex) -> Result<MomentValue, MomError> {
        let flat = self.indices.flat_index(qn)?;
        Ok(self.value_at(flat, *qn))
    }

    /// All moments in flat-index order.
    pub fn iter(&self) -> impl Iterator<Item = MomentValue> + '_ {
        self.indices
            .iter()
            .enumerate()
            .map(|(flat, qn)| self.value_at(flat, *qn))
    }

    fn re_im_block(&self, a: usize, b: usize) -> (f64, f64, f64) {
        let h = self.covariance.hermitian()[(a, b)];
        let p = self.covariance.pseudo()[(a, b)];
        (0.5 * (h.re + p.re), 0.5 * (h.re - p.re), 0.5 * (p.im - h.im))
    }

    /// (cov[Re_a, Re_b], cov[Im_a, Im_b], cov[Re_a, Im_b]).
    pub fn covariance_re_im(
        &self,
        a: &QnMomentIndex,
        b: &QnMomentIndex,
    ) -> Result<(f64, f64, f64), MomError> {
        let (fa, fb) = (self.indices.flat_index(a)?, self.indices.flat_index(b)?);
        Ok(self.re_im_block(fa, fb))
    }

    /// Real 2n×2n covariance of [Re h; Im h].
    pub fn covariance_real(&self) -> DMatrix<f64> {
        convert::to_real(&self.covariance)
    }

    /// Whether V_H is Hermitian and V_P symmetric within `tolerance`.
    pub fn check_symmetry(&self, tolerance: f64) -> bool {
        self.covariance.symmetry_deviation() <= tolerance
    }

    /// Whether the augmented covariance is positive semidefinite within `tolerance`.
    pub fn is_positive_semidefinite(&self, tolerance: f64) -> bool {
        self.covariance.is_positive_semidefinite(tolerance)
    }

    /// Pulls against a reference result over the same index set.
    pub fn pulls(&self, truth: &MomentResult) -> Result<Vec<Pull>, MomError> {
        self.indices.ensure_same(&truth.indices)?;
        let pull = |delta: f64, sigma: f64| (sigma > 0.0).then(|| delta / sigma);
        Ok(self
            .iter()
            .zip(truth.values.iter())
            .map(|(estimate, expected)| {
                let delta = estimate.value - expected;
                Pull {
                    qn: estimate.qn,
                    re: pull(delta.re, estimate.uncert_re),
                    im: pull(delta.im, estimate.uncert_im),
                }
            })
            .collect())
    }

    /// Values of one polarization component as (qn, value) pairs.
    pub fn component(&self, moment_index: u8) -> Vec<(QnMomentIndex, Complex64)> {
        self.indices
            .iter()
            .zip(self.values.iter())
            .filter(|(qn, _)| qn.moment_index() == moment_index)
            .map(|(qn, value)| (*qn, *value))
            .collect()
    }
}
