//! Measured and physical basis functions of the polarized moment expansion.
//!
//! With c_L = sqrt(4π / (2L + 1)) and τ(M) = 1 for M = 0, 2 otherwise:
//!
//! | i | f_meas                              | f_phys                               |
//! |---|-------------------------------------|--------------------------------------|
//! | 0 | c_L / (4π²) · Y*                    | 2π / c_L · τ(M) · Re Y               |
//! | 1 | c_L / (2π² P) · cos 2Φ · Y*         | 2π P / c_L · τ(M) · cos 2Φ · Re Y    |
//! | 2 | c_L / (2π² P) · sin 2Φ · Y*         | 2π P / c_L · 2i · sin 2Φ · Im Y      |
//!
//! The two families are biorthogonal, ∫ dΩ dΦ f_meas_k f_phys_j = δ_kj, so an
//! ideal detector yields the identity acceptance integral matrix. A sample drawn
//! from intensity I yields H_meas = 2π Σ_events f_meas, and the intensity is
//! recovered as I = (1 / 2π) Σ_j H_j f_phys_j.

use std::f64::consts::PI;
use std::ops::Range;

use mom_core::{CMatrix, Complex64, ErrorInfo, MomError};
use rayon::prelude::*;

use crate::events::AngularEvents;
use crate::index::{MomentIndexSet, QnMomentIndex};
use crate::ylm::SphericalHarmonics;

/// Which family of basis functions to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisKind {
    /// Functions summed over data to estimate moments.
    Measured,
    /// Functions that reconstruct the intensity from moments.
    Physical,
}

fn norm_factor(l: u32) -> f64 {
    (4.0 * PI / (2 * l + 1) as f64).sqrt()
}

fn measured_value(qn: &QnMomentIndex, y: Complex64, cos2: f64, sin2: f64, polarization: f64) -> Complex64 {
    let c_l = norm_factor(qn.l());
    match qn.moment_index() {
        0 => y.conj() * (c_l / (4.0 * PI * PI)),
        1 => y.conj() * (c_l * cos2 / (2.0 * PI * PI * polarization)),
        _ => y.conj() * (c_l * sin2 / (2.0 * PI * PI * polarization)),
    }
}

fn physical_value(qn: &QnMomentIndex, y: Complex64, cos2: f64, sin2: f64, polarization: f64) -> Complex64 {
    let c_l = norm_factor(qn.l());
    let tau = if qn.m() == 0 { 1.0 } else { 2.0 };
    match qn.moment_index() {
        0 => Complex64::new(2.0 * PI / c_l * tau * y.re, 0.0),
        1 => Complex64::new(2.0 * PI * polarization / c_l * tau * cos2 * y.re, 0.0),
        _ => Complex64::new(0.0, 2.0 * PI * polarization / c_l * 2.0 * sin2 * y.im),
    }
}

fn check_polarization(qn: &QnMomentIndex, polarization: f64) -> Result<(), MomError> {
    if !polarization.is_finite() || (qn.moment_index() > 0 && polarization == 0.0) {
        return Err(MomError::Index(
            ErrorInfo::new(
                "invalid-polarization",
                "polarized moments need a finite non-zero beam polarization",
            )
            .with_context("qn", qn.to_string())
            .with_context("polarization", polarization.to_string()),
        ));
    }
    Ok(())
}

fn evaluate_single(
    kind: BasisKind,
    qn: &QnMomentIndex,
    (theta, phi, big_phi): (f64, f64, f64),
    polarization: f64,
) -> Result<Complex64, MomError> {
    check_polarization(qn, polarization)?;
    if qn.m() > qn.l() || qn.moment_index() > 2 || (qn.moment_index() == 2 && qn.m() == 0) {
        return Err(MomError::Index(
            ErrorInfo::new("invalid-qn", "malformed moment quantum numbers")
                .with_context("qn", qn.to_string()),
        ));
    }
    let y = SphericalHarmonics::evaluate(qn.l(), theta, phi).value(qn.l(), qn.m() as i32);
    let (sin2, cos2) = (2.0 * big_phi).sin_cos();
    Ok(match kind {
        BasisKind::Measured => measured_value(qn, y, cos2, sin2, polarization),
        BasisKind::Physical => physical_value(qn, y, cos2, sin2, polarization),
    })
}

/// Measured basis function f_meas for one moment at one point (θ, φ, Φ).
pub fn measured_basis(
    qn: &QnMomentIndex,
    angles: (f64, f64, f64),
    polarization: f64,
) -> Result<Complex64, MomError> {
    evaluate_single(BasisKind::Measured, qn, angles, polarization)
}

/// Physical basis function f_phys for one moment at one point (θ, φ, Φ).
pub fn physical_basis(
    qn: &QnMomentIndex,
    angles: (f64, f64, f64),
    polarization: f64,
) -> Result<Complex64, MomError> {
    evaluate_single(BasisKind::Physical, qn, angles, polarization)
}

/// Evaluates basis functions for every moment of an index set over event samples.
///
/// Matrices are `n × N`: one row per moment in flat-index order, one column per event.
#[derive(Debug, Clone, Copy)]
pub struct BasisEvaluator<'a> {
    indices: &'a MomentIndexSet,
    polarization: f64,
}

impl<'a> BasisEvaluator<'a> {
    /// Validates the beam polarization once for the whole set.
    pub fn new(indices: &'a MomentIndexSet, polarization: f64) -> Result<Self, MomError> {
        if let Some(qn) = indices.iter().find(|qn| qn.moment_index() > 0) {
            check_polarization(qn, polarization)?;
        }
        if polarization.abs() > 1.0 {
            tracing::warn!(polarization, "beam polarization exceeds unity");
        }
        Ok(Self {
            indices,
            polarization,
        })
    }

    /// Index set the evaluator iterates over.
    pub fn indices(&self) -> &'a MomentIndexSet {
        self.indices
    }

    /// Beam polarization P.
    pub fn polarization(&self) -> f64 {
        self.polarization
    }

    fn fill_column(
        &self,
        (theta, phi, big_phi): (f64, f64, f64),
        measured: Option<&mut [Complex64]>,
        physical: Option<&mut [Complex64]>,
    ) {
        let harmonics = SphericalHarmonics::evaluate(self.indices.max_l(), theta, phi);
        let (sin2, cos2) = (2.0 * big_phi).sin_cos();
        if let Some(column) = measured {
            for (slot, qn) in column.iter_mut().zip(self.indices.iter()) {
                let y = harmonics.value(qn.l(), qn.m() as i32);
                *slot = measured_value(qn, y, cos2, sin2, self.polarization);
            }
        }
        if let Some(column) = physical {
            for (slot, qn) in column.iter_mut().zip(self.indices.iter()) {
                let y = harmonics.value(qn.l(), qn.m() as i32);
                *slot = physical_value(qn, y, cos2, sin2, self.polarization);
            }
        }
    }

    fn check_range(&self, events: &AngularEvents, range: &Range<usize>) -> Result<(), MomError> {
        if range.start > range.end || range.end > events.len() {
            return Err(MomError::Index(
                ErrorInfo::new("event-range", "event range exceeds the sample")
                    .with_context("start", range.start.to_string())
                    .with_context("end", range.end.to_string())
                    .with_context("len", events.len().to_string()),
            ));
        }
        Ok(())
    }

    fn event_at(events: &AngularEvents, idx: usize) -> (f64, f64, f64) {
        (events.theta()[idx], events.phi()[idx], events.big_phi()[idx])
    }

    /// Evaluates one basis family for the events in `range`.
    pub fn evaluate_range(
        &self,
        kind: BasisKind,
        events: &AngularEvents,
        range: Range<usize>,
    ) -> Result<CMatrix, MomError> {
        self.check_range(events, &range)?;
        let n = self.indices.len();
        let mut data = vec![Complex64::default(); n * range.len()];
        data.par_chunks_mut(n).enumerate().for_each(|(offset, column)| {
            let angles = Self::event_at(events, range.start + offset);
            match kind {
                BasisKind::Measured => self.fill_column(angles, Some(column), None),
                BasisKind::Physical => self.fill_column(angles, None, Some(column)),
            }
        });
        Ok(CMatrix::from_vec(n, range.len(), data))
    }

    /// Evaluates both families for the events in `range`, sharing the Y_L^M table.
    pub fn evaluate_pair(
        &self,
        events: &AngularEvents,
        range: Range<usize>,
    ) -> Result<(CMatrix, CMatrix), MomError> {
        self.check_range(events, &range)?;
        let n = self.indices.len();
        let mut measured = vec![Complex64::default(); n * range.len()];
        let mut physical = vec![Complex64::default(); n * range.len()];
        measured
            .par_chunks_mut(n)
            .zip(physical.par_chunks_mut(n))
            .enumerate()
            .for_each(|(offset, (meas, phys))| {
                let angles = Self::event_at(events, range.start + offset);
                self.fill_column(angles, Some(meas), Some(phys));
            });
        Ok((
            CMatrix::from_vec(n, range.len(), measured),
            CMatrix::from_vec(n, range.len(), physical),
        ))
    }

    /// f_meas for every moment and every event.
    pub fn measured(&self, events: &AngularEvents) -> Result<CMatrix, MomError> {
        self.evaluate_range(BasisKind::Measured, events, 0..events.len())
    }

    /// f_phys for every moment and every event.
    pub fn physical(&self, events: &AngularEvents) -> Result<CMatrix, MomError> {
        self.evaluate_range(BasisKind::Physical, events, 0..events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::ComplexField;

    #[test]
    fn zero_polarization_is_rejected_for_polarized_components() {
        let cos_moment = QnMomentIndex::new(1, 2, 1).expect("valid");
        let unpolarized = QnMomentIndex::new(0, 2, 1).expect("valid");
        let angles = (0.4, 0.2, 1.0);
        assert!(matches!(
            measured_basis(&cos_moment, angles, 0.0),
            Err(MomError::Index(_))
        ));
        assert!(measured_basis(&unpolarized, angles, 0.0).is_ok());
        let set = MomentIndexSet::new(1);
        assert!(BasisEvaluator::new(&set, 0.0).is_err());
    }

    #[test]
    fn batch_matches_single_point_evaluation() {
        let set = MomentIndexSet::new(2);
        let events = AngularEvents::new(vec![0.3, 2.0], vec![-1.0, 2.5], vec![0.7, -2.2]).expect("valid");
        let evaluator = BasisEvaluator::new(&set, 0.8).expect("valid polarization");
        let (meas, phys) = evaluator.evaluate_pair(&events, 0..2).expect("in range");
        assert_eq!(meas.shape(), (set.len(), 2));
        for (row, qn) in set.iter().enumerate() {
            for col in 0..2 {
                let angles = events.get(col).expect("event");
                let single_meas = measured_basis(qn, angles, 0.8).expect("valid");
                let single_phys = physical_basis(qn, angles, 0.8).expect("valid");
                assert!((meas[(row, col)] - single_meas).modulus() < 1e-14);
                assert!((phys[(row, col)] - single_phys).modulus() < 1e-14);
            }
        }
        assert!(evaluator.evaluate_range(BasisKind::Measured, &events, 1..3).is_err());
    }

    #[test]
    fn physical_functions_have_fixed_phase() {
        let set = MomentIndexSet::new(3);
        let angles = (1.1, 0.9, -0.4);
        for qn in set.iter() {
            let value = physical_basis(qn, angles, 0.6).expect("valid");
            match qn.moment_index() {
                2 => assert_eq!(value.re, 0.0),
                _ => assert_eq!(value.im, 0.0),
            }
        }
    }
}
