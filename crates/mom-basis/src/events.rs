//! Angular event arrays in the helicity (or Gottfried–Jackson) frame.

use std::f64::consts::PI;
use std::ops::Range;

use mom_core::{ErrorInfo, MomError};
use serde::{Deserialize, Serialize};

/// Number of events processed per parallel work unit.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Per-event angles (θ, φ, Φ) in radians, stored column-wise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "AngularEventsRepr")]
pub struct AngularEvents {
    theta: Vec<f64>,
    phi: Vec<f64>,
    big_phi: Vec<f64>,
}

#[derive(Deserialize)]
struct AngularEventsRepr {
    theta: Vec<f64>,
    phi: Vec<f64>,
    big_phi: Vec<f64>,
}

impl TryFrom<AngularEventsRepr> for AngularEvents {
    type Error = MomError;

    fn try_from(repr: AngularEventsRepr) -> Result<Self, Self::Error> {
        Self::new(repr.theta, repr.phi, repr.big_phi)
    }
}

fn sample_error(code: &str, message: &str) -> MomError {
    MomError::Sample(ErrorInfo::new(code, message))
}

impl AngularEvents {
    /// Builds an event array from radians; all columns must share one length
    /// and hold finite values, with θ in [0, π].
    pub fn new(theta: Vec<f64>, phi: Vec<f64>, big_phi: Vec<f64>) -> Result<Self, MomError> {
        if theta.len() != phi.len() || theta.len() != big_phi.len() {
            return Err(MomError::Index(
                ErrorInfo::new("ragged-events", "angle columns differ in length")
                    .with_context("theta", theta.len().to_string())
                    .with_context("phi", phi.len().to_string())
                    .with_context("big_phi", big_phi.len().to_string()),
            ));
        }
        let columns = [("theta", &theta), ("phi", &phi), ("big_phi", &big_phi)];
        for (name, column) in columns {
            if let Some(pos) = column.iter().position(|value| !value.is_finite()) {
                return Err(sample_error("non-finite-angle", "angles must be finite")
                    .with_context("column", name)
                    .with_context("event", pos.to_string()));
            }
        }
        if let Some(pos) = theta.iter().position(|t| !(0.0..=PI).contains(t)) {
            return Err(sample_error("theta-range", "polar angle outside [0, pi]")
                .with_context("event", pos.to_string())
                .with_context("theta", theta[pos].to_string()));
        }
        Ok(Self {
            theta,
            phi,
            big_phi,
        })
    }

    /// Builds an event array from cos θ and azimuths in degrees, the layout
    /// typical of analysis trees.
    pub fn from_cos_theta_degrees(
        cos_theta: &[f64],
        phi_deg: &[f64],
        big_phi_deg: &[f64],
    ) -> Result<Self, MomError> {
        if let Some(pos) = cos_theta.iter().position(|c| !(-1.0..=1.0).contains(c)) {
            return Err(sample_error("cos-theta-range", "cos theta outside [-1, 1]")
                .with_context("event", pos.to_string()));
        }
        Self::new(
            cos_theta.iter().map(|c| c.acos()).collect(),
            phi_deg.iter().map(|d| d.to_radians()).collect(),
            big_phi_deg.iter().map(|d| d.to_radians()).collect(),
        )
    }

    /// Number of events N.
    pub fn len(&self) -> usize {
        self.theta.len()
    }

    /// True when no events are held.
    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    /// Angles of event `idx` as (θ, φ, Φ).
    pub fn get(&self, idx: usize) -> Option<(f64, f64, f64)> {
        Some((
            *self.theta.get(idx)?,
            *self.phi.get(idx)?,
            *self.big_phi.get(idx)?,
        ))
    }

    /// Iterates over (θ, φ, Φ) triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.theta
            .iter()
            .zip(&self.phi)
            .zip(&self.big_phi)
            .map(|((t, p), b)| (*t, *p, *b))
    }

    /// Polar angles θ.
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// Azimuths φ of the decay.
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Azimuths Φ of the photon polarization plane.
    pub fn big_phi(&self) -> &[f64] {
        &self.big_phi
    }

    /// Copies the events at `indices` (repeats allowed) into a new array.
    pub fn select(&self, indices: &[usize]) -> Result<Self, MomError> {
        let mut out = Self {
            theta: Vec::with_capacity(indices.len()),
            phi: Vec::with_capacity(indices.len()),
            big_phi: Vec::with_capacity(indices.len()),
        };
        for &idx in indices {
            let (t, p, b) = self.get(idx).ok_or_else(|| {
                MomError::Index(
                    ErrorInfo::new("event-out-of-range", "event index beyond sample")
                        .with_context("index", idx.to_string())
                        .with_context("len", self.len().to_string()),
                )
            })?;
            out.theta.push(t);
            out.phi.push(p);
            out.big_phi.push(b);
        }
        Ok(out)
    }

    /// Contiguous event ranges of at most `chunk_size` events, in order.
    pub fn chunks(&self, chunk_size: usize) -> Vec<Range<usize>> {
        let chunk_size = chunk_size.max(1);
        (0..self.len())
            .step_by(chunk_size)
            .map(|start| start..(start + chunk_size).min(self.len()))
            .collect()
    }
}
