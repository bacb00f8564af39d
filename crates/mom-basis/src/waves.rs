//! Reflectivity-basis production amplitudes and the moments they imply.
//!
//! Given amplitudes [ε] ℓ m for reflectivities ε = ±1, the spin-density
//! elements ρ_0..ρ_2 and the moments H_i(L, M) follow in closed form. These
//! values serve as ground truth for input/output studies.

use std::collections::{BTreeMap, BTreeSet};

use mom_core::{CVector, Complex64, ErrorInfo, MomError};
use nalgebra::ComplexField;
use serde::{Deserialize, Serialize};

use crate::clebsch::clebsch_gordan;
use crate::index::MomentIndexSet;
use crate::ylm::SphericalHarmonics;

/// Default absolute tolerance (scaled by |H_0(0, 0)|) on structural zeros.
pub const DEFAULT_STRUCTURAL_TOLERANCE: f64 = 1e-12;

/// Quantum numbers of one partial wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaveIndex {
    /// Reflectivity ε = ±1.
    pub refl: i32,
    /// Spin ℓ.
    pub l: u32,
    /// Projection m, `|m| ≤ ℓ`.
    pub m: i32,
}

/// One complex production amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeValue {
    /// Wave the amplitude belongs to.
    pub wave: WaveIndex,
    /// Complex value.
    pub value: Complex64,
}

impl AmplitudeValue {
    /// Convenience constructor.
    pub fn new(refl: i32, l: u32, m: i32, value: Complex64) -> Self {
        Self {
            wave: WaveIndex { refl, l, m },
            value,
        }
    }
}

/// The moments H_0, H_1, H_2 at one (L, M).
pub type MomentTriple = [Complex64; 3];

fn wave_error(code: &str, message: &str, wave: &WaveIndex) -> MomError {
    MomError::Index(
        ErrorInfo::new(code, message)
            .with_context("refl", wave.refl.to_string())
            .with_context("l", wave.l.to_string())
            .with_context("m", wave.m.to_string()),
    )
}

fn parity(n: i32) -> f64 {
    if n.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Validated collection of production amplitudes; missing waves count as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeSet {
    amplitudes: BTreeMap<WaveIndex, Complex64>,
    tolerance: f64,
}

impl AmplitudeSet {
    /// Builds a set, rejecting bad reflectivities, |m| > ℓ and duplicate waves.
    pub fn new(amplitudes: impl IntoIterator<Item = AmplitudeValue>) -> Result<Self, MomError> {
        let mut map = BTreeMap::new();
        for amp in amplitudes {
            let wave = amp.wave;
            if wave.refl != 1 && wave.refl != -1 {
                return Err(wave_error("invalid-reflectivity", "reflectivity must be +1 or -1", &wave));
            }
            if wave.m.unsigned_abs() > wave.l {
                return Err(wave_error("invalid-projection", "|m| must not exceed the spin", &wave));
            }
            if map.insert(wave, amp.value).is_some() {
                return Err(wave_error("duplicate-wave", "wave listed twice", &wave));
            }
        }
        Ok(Self {
            amplitudes: map,
            tolerance: DEFAULT_STRUCTURAL_TOLERANCE,
        })
    }

    /// Overrides the tolerance used when checking structural zeros.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Amplitude of [refl] l m, zero when absent.
    pub fn amplitude(&self, refl: i32, l: u32, m: i32) -> Complex64 {
        self.amplitudes
            .get(&WaveIndex { refl, l, m })
            .copied()
            .unwrap_or_default()
    }

    /// Amplitudes in wave order.
    pub fn iter(&self) -> impl Iterator<Item = AmplitudeValue> + '_ {
        self.amplitudes
            .iter()
            .map(|(wave, value)| AmplitudeValue { wave: *wave, value: *value })
    }

    /// Largest spin ℓ present; zero for an empty set.
    pub fn max_spin(&self) -> u32 {
        self.amplitudes.keys().map(|wave| wave.l).max().unwrap_or(0)
    }

    fn spins(&self) -> BTreeSet<u32> {
        self.amplitudes.keys().map(|wave| wave.l).collect()
    }

    /// Spin-density elements (ρ_0, ρ_1, ρ_2) for reflectivity `refl`.
    pub fn spin_density(&self, refl: i32, l1: u32, m1: i32, l2: u32, m2: i32) -> MomentTriple {
        let eps = refl as f64;
        let a1 = self.amplitude(refl, l1, m1);
        let a1_neg = self.amplitude(refl, l1, -m1);
        let a2 = self.amplitude(refl, l2, m2);
        let a2_neg = self.amplitude(refl, l2, -m2);
        let cross_first = a1_neg * a2.conj() * parity(m1);
        let cross_second = a1 * a2_neg.conj() * parity(m2);
        let rho0 = a1 * a2.conj() + a1_neg * a2_neg.conj() * parity(m1 - m2);
        let rho1 = (cross_first + cross_second) * -eps;
        let rho2 = (cross_first - cross_second) * Complex64::new(0.0, -eps);
        [rho0, rho1, rho2]
    }

    /// Unnormalized moments H_0, H_1, H_2 at (L, M).
    pub fn moment_triple(&self, l: u32, m: u32) -> MomentTriple {
        let spins = self.spins();
        let (big_l, big_m) = (l as i64, m as i64);
        let mut out = [Complex64::default(); 3];
        for refl in [-1, 1] {
            for &l1 in &spins {
                for &l2 in &spins {
                    let parity_cg = clebsch_gordan(l2 as i64, 0, big_l, 0, l1 as i64, 0);
                    if parity_cg == 0.0 {
                        continue;
                    }
                    let weight = ((2 * l2 + 1) as f64 / (2 * l1 + 1) as f64).sqrt() * parity_cg;
                    for m1 in -(l1 as i32)..=(l1 as i32) {
                        let m2 = m1 - m as i32;
                        if m2.unsigned_abs() > l2 {
                            continue;
                        }
                        let term = weight
                            * clebsch_gordan(l2 as i64, m2 as i64, big_l, big_m, l1 as i64, m1 as i64);
                        if term == 0.0 {
                            continue;
                        }
                        let [rho0, rho1, rho2] = self.spin_density(refl, l1, m1, l2, m2);
                        out[0] += rho0 * term;
                        out[1] -= rho1 * term;
                        out[2] -= rho2 * term;
                    }
                }
            }
        }
        out
    }

    fn check_structural_zeros(&self, l: u32, m: u32, triple: &MomentTriple, scale: f64) -> Result<(), MomError> {
        let limit = self.tolerance * scale.max(1.0);
        let violations = [
            ("im_h0", triple[0].im.abs()),
            ("im_h1", triple[1].im.abs()),
            ("re_h2", triple[2].re.abs()),
            ("h2_m0", if m == 0 { triple[2].modulus() } else { 0.0 }),
        ];
        if let Some((part, size)) = violations.iter().find(|(_, size)| *size > limit) {
            return Err(MomError::Index(
                ErrorInfo::new("structural-zero", "moment violates a structural zero")
                    .with_context("l", l.to_string())
                    .with_context("m", m.to_string())
                    .with_context("component", *part)
                    .with_context("magnitude", format!("{size:e}")),
            ));
        }
        Ok(())
    }

    /// Moments for every label of `indices`, in flat-index order, unnormalized.
    ///
    /// Structural zeros (Im H_0 = Im H_1 = Re H_2 = 0, H_2(L, 0) = 0) are verified
    /// and then imposed exactly.
    pub fn moments(&self, indices: &MomentIndexSet) -> Result<CVector, MomError> {
        // Triples laid out by triangle slot L (L + 1) / 2 + M.
        let max_l = indices.max_l() as usize;
        let mut triples: Vec<MomentTriple> = Vec::with_capacity((max_l + 1) * (max_l + 2) / 2);
        let reference = self.moment_triple(0, 0)[0].modulus();
        for l in 0..=indices.max_l() {
            for m in 0..=l {
                let triple = self.moment_triple(l, m);
                self.check_structural_zeros(l, m, &triple, reference)?;
                triples.push(triple);
            }
        }
        let values = indices.iter().map(|qn| {
            let slot = (qn.l() * (qn.l() + 1) / 2 + qn.m()) as usize;
            let component = triples[slot][qn.moment_index() as usize];
            match qn.moment_index() {
                2 => Complex64::new(0.0, component.im),
                _ => Complex64::new(component.re, 0.0),
            }
        });
        Ok(CVector::from_iterator(indices.len(), values))
    }

    /// Moments normalized to H_0(0, 0) = 1.
    pub fn true_moments(&self, indices: &MomentIndexSet) -> Result<CVector, MomError> {
        let values = self.moments(indices)?;
        let reference = values[indices.reference_index()];
        if reference.modulus() < f64::EPSILON {
            return Err(MomError::Normalization(ErrorInfo::new(
                "reference-underflow",
                "amplitude set has vanishing total intensity",
            )));
        }
        Ok(values / reference)
    }

    /// Intensity I(θ, φ, Φ) for beam polarization `polarization`.
    pub fn intensity(&self, theta: f64, phi: f64, big_phi: f64, polarization: f64) -> f64 {
        let harmonics = SphericalHarmonics::evaluate(self.max_spin(), theta, phi);
        let waves: Vec<(u32, i32)> = self
            .spins()
            .into_iter()
            .flat_map(|l| (-(l as i32)..=(l as i32)).map(move |m| (l, m)))
            .collect();
        let mut components = [Complex64::default(); 3];
        for refl in [-1, 1] {
            for &(l1, m1) in &waves {
                for &(l2, m2) in &waves {
                    let rho = self.spin_density(refl, l1, m1, l2, m2);
                    let weight = harmonics.value(l1, m1) * harmonics.value(l2, m2).conj();
                    for (acc, value) in components.iter_mut().zip(rho) {
                        *acc += weight * value;
                    }
                }
            }
        }
        let (sin2, cos2) = (2.0 * big_phi).sin_cos();
        (components[0] - components[1] * (polarization * cos2) - components[2] * (polarization * sin2)).re
    }
}
