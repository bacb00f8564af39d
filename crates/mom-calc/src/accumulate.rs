//! Raw (acceptance-uncorrected) moments and their augmented covariance.

use std::f64::consts::PI;
use std::ops::Range;

use mom_basis::{AngularEvents, BasisEvaluator, MomentIndexSet, DEFAULT_CHUNK_SIZE};
use mom_core::{CMatrix, CVector, Complex64, ErrorInfo, MomError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::covariance::AugmentedCovariance;

fn column_ranges(n_events: usize, chunk: usize) -> Vec<Range<usize>> {
    (0..n_events)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(n_events))
        .collect()
}

/// Measured moments H_meas = 2π Σ f_meas with their augmented covariance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMomentsRepr")]
pub struct RawMoments {
    indices: MomentIndexSet,
    values: CVector,
    covariance: AugmentedCovariance,
    n_events: usize,
}

#[derive(Deserialize)]
struct RawMomentsRepr {
    indices: MomentIndexSet,
    values: CVector,
    covariance: AugmentedCovariance,
    n_events: usize,
}

impl TryFrom<RawMomentsRepr> for RawMoments {
    type Error = MomError;

    fn try_from(repr: RawMomentsRepr) -> Result<Self, Self::Error> {
        Self::from_parts(repr.indices, repr.values, repr.covariance, repr.n_events)
    }
}

impl RawMoments {
    /// Accumulates moments from an `n × N` matrix of measured basis values.
    ///
    /// The per-event reductions run over fixed chunks of events in parallel and
    /// are summed in chunk order, so results do not depend on the thread count.
    pub fn from_basis(indices: &MomentIndexSet, basis: &CMatrix) -> Result<Self, MomError> {
        indices.ensure_len("basis rows", basis.nrows())?;
        let n = indices.len();
        let n_events = basis.ncols();
        if n_events < 2 {
            return Err(MomError::Sample(
                ErrorInfo::new("too-few-events", "moment covariance needs at least two events")
                    .with_context("events", n_events.to_string()),
            ));
        }
        let ranges = column_ranges(n_events, DEFAULT_CHUNK_SIZE);

        let sum = ranges
            .par_iter()
            .map(|range| basis.columns(range.start, range.len()).column_sum())
            .collect::<Vec<CVector>>()
            .into_iter()
            .fold(CVector::zeros(n), |acc, part| acc + part);
        let mean = sum.map(|v| v / n_events as f64);

        let (hermitian_sum, pseudo_sum) = ranges
            .par_iter()
            .map(|range| {
                let mut centered = basis.columns(range.start, range.len()).clone_owned();
                for mut column in centered.column_iter_mut() {
                    column -= &mean;
                }
                (&centered * centered.adjoint(), &centered * centered.transpose())
            })
            .collect::<Vec<(CMatrix, CMatrix)>>()
            .into_iter()
            .fold(
                (CMatrix::zeros(n, n), CMatrix::zeros(n, n)),
                |(h_acc, p_acc), (h, p)| (h_acc + h, p_acc + p),
            );

        // Var(2π Σ f) = (2π)² N Var(f) with the unbiased per-event variance.
        let scale = (2.0 * PI).powi(2) * n_events as f64 / (n_events - 1) as f64;
        let covariance = AugmentedCovariance::new(hermitian_sum, pseudo_sum)?.scaled(scale);
        let values = sum.map(|v| v * (2.0 * PI));
        tracing::debug!(moments = n, events = n_events, "accumulated raw moments");
        Ok(Self {
            indices: indices.clone(),
            values,
            covariance,
            n_events,
        })
    }

    /// Evaluates f_meas for `events` and accumulates.
    pub fn from_events(
        indices: &MomentIndexSet,
        events: &AngularEvents,
        polarization: f64,
    ) -> Result<Self, MomError> {
        let basis = BasisEvaluator::new(indices, polarization)?.measured(events)?;
        Self::from_basis(indices, &basis)
    }

    /// Assembles raw moments from already known values, e.g. a deserialized record.
    pub fn from_parts(
        indices: MomentIndexSet,
        values: CVector,
        covariance: AugmentedCovariance,
        n_events: usize,
    ) -> Result<Self, MomError> {
        indices.ensure_len("moment vector", values.len())?;
        indices.ensure_len("covariance", covariance.dim())?;
        Ok(Self {
            indices,
            values,
            covariance,
            n_events,
        })
    }

    /// Index set the moments are ordered by.
    pub fn indices(&self) -> &MomentIndexSet {
        &self.indices
    }

    /// H_meas in flat-index order.
    pub fn values(&self) -> &CVector {
        &self.values
    }

    /// Augmented covariance of H_meas.
    pub fn covariance(&self) -> &AugmentedCovariance {
        &self.covariance
    }

    /// Number of events accumulated.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// H_meas at `flat`.
    pub fn value_at(&self, flat: usize) -> Option<Complex64> {
        self.values.get(flat).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::ComplexField;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn matches_direct_sample_covariance() {
        let indices = MomentIndexSet::new(0);
        let basis = CMatrix::from_row_slice(
            2,
            3,
            &[c(1.0, 0.0), c(2.0, 1.0), c(0.0, -1.0), c(0.5, 0.5), c(-1.0, 0.0), c(1.0, 2.0)],
        );
        let raw = RawMoments::from_basis(&indices, &basis).expect("three events");
        let two_pi = 2.0 * PI;
        assert!((raw.values()[0] - c(3.0, 0.0) * two_pi).modulus() < 1e-12);

        let mean0 = c(1.0, 0.0);
        let deviations0 = [c(0.0, 0.0), c(1.0, 1.0), c(-1.0, -1.0)];
        let var_h: f64 = deviations0.iter().map(|d| d.norm_sqr()).sum::<f64>() / 2.0;
        let var_p: Complex64 = deviations0.iter().map(|d| d * d).sum::<Complex64>() / 2.0;
        let expected_scale = two_pi * two_pi * 3.0;
        assert_eq!(basis.row(0).sum() / 3.0, mean0);
        assert!((raw.covariance().hermitian()[(0, 0)] - c(var_h * expected_scale, 0.0)).modulus() < 1e-9);
        assert!((raw.covariance().pseudo()[(0, 0)] - var_p * expected_scale).modulus() < 1e-9);
        assert!(raw.covariance().symmetry_deviation() < 1e-12);
    }

    #[test]
    fn fewer_than_two_events_is_an_error() {
        let indices = MomentIndexSet::new(0);
        let basis = CMatrix::from_element(2, 1, c(1.0, 0.0));
        assert!(matches!(RawMoments::from_basis(&indices, &basis), Err(MomError::Sample(_))));
    }

    #[test]
    fn decoding_rechecks_shapes() {
        let indices = MomentIndexSet::new(0);
        let basis = CMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(0.5, 0.0), c(0.0, 1.0), c(0.2, -0.1)]);
        let raw = RawMoments::from_basis(&indices, &basis).expect("two events");
        let mut value = serde_json::to_value(&raw).expect("encode");
        assert_eq!(serde_json::from_value::<RawMoments>(value.clone()).expect("decode"), raw);
        value["values"] = serde_json::to_value(CVector::zeros(5)).expect("encode");
        assert!(serde_json::from_value::<RawMoments>(value).is_err());
    }

    #[test]
    fn row_count_must_match_index_set() {
        let indices = MomentIndexSet::new(1);
        let basis = CMatrix::zeros(2, 10);
        assert!(matches!(RawMoments::from_basis(&indices, &basis), Err(MomError::Index(_))));
    }
}
