//! Kinematic binning and the per-bin moment pipeline.

use mom_basis::{AngularEvents, MomentIndexSet};
use mom_core::{derive_substream_seed, ErrorInfo, MomError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::correct::calculate_moments;
use crate::integral::IntegralMatrix;
use crate::opts::CorrectionOpts;
use crate::result::MomentResult;

fn binning_error(code: &str, message: &str) -> MomError {
    MomError::Index(ErrorInfo::new(code, message))
}

/// Uniform binning of one kinematic variable over `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KinematicBinningRepr")]
pub struct KinematicBinning {
    var: String,
    n_bins: usize,
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct KinematicBinningRepr {
    var: String,
    n_bins: usize,
    min: f64,
    max: f64,
}

impl TryFrom<KinematicBinningRepr> for KinematicBinning {
    type Error = MomError;

    fn try_from(repr: KinematicBinningRepr) -> Result<Self, Self::Error> {
        Self::new(repr.var, repr.n_bins, repr.min, repr.max)
    }
}

impl KinematicBinning {
    /// Validates the bin layout.
    pub fn new(var: impl Into<String>, n_bins: usize, min: f64, max: f64) -> Result<Self, MomError> {
        if n_bins == 0 {
            return Err(binning_error("empty-binning", "binning needs at least one bin"));
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(binning_error("invalid-range", "binning range must be finite with min < max")
                .with_context("min", min.to_string())
                .with_context("max", max.to_string()));
        }
        Ok(Self {
            var: var.into(),
            n_bins,
            min,
            max,
        })
    }

    /// Name of the binned variable, e.g. `mass`.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the first bin.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the last bin.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Width of one bin.
    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Bin centres.
    pub fn centers(&self) -> Vec<f64> {
        (0..self.n_bins)
            .map(|bin| self.min + (bin as f64 + 0.5) * self.width())
            .collect()
    }

    /// (lower, upper) edges of every bin.
    pub fn ranges(&self) -> Vec<(f64, f64)> {
        (0..self.n_bins)
            .map(|bin| {
                let lower = self.min + bin as f64 * self.width();
                (lower, lower + self.width())
            })
            .collect()
    }

    /// Bin holding `value`, `None` outside `[min, max)` or for NaN.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }
        let bin = ((value - self.min) / self.width()) as usize;
        Some(bin.min(self.n_bins - 1))
    }

    /// Event indices per bin; values outside the range are dropped.
    pub fn partition(&self, values: &[f64]) -> Vec<Vec<usize>> {
        let mut bins = vec![Vec::new(); self.n_bins];
        for (event, value) in values.iter().enumerate() {
            if let Some(bin) = self.bin_index(*value) {
                bins[bin].push(event);
            }
        }
        bins
    }

    /// Splits `events` by their kinematic `values`.
    pub fn split(&self, values: &[f64], events: &AngularEvents) -> Result<Vec<AngularEvents>, MomError> {
        if values.len() != events.len() {
            return Err(binning_error("shape-mismatch", "one kinematic value per event required")
                .with_context("values", values.len().to_string())
                .with_context("events", events.len().to_string()));
        }
        self.partition(values)
            .iter()
            .map(|picks| events.select(picks))
            .collect()
    }
}

/// Accepted phase-space events of one bin and the generated count they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpaceSample {
    /// Accepted events.
    pub accepted: AngularEvents,
    /// Number of generated events M.
    pub n_generated: usize,
}

/// Inputs of one kinematic bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinInput {
    /// Signal events.
    pub data: AngularEvents,
    /// Phase-space sample; `None` skips the acceptance correction.
    #[serde(default)]
    pub phase_space: Option<PhaseSpaceSample>,
}

/// Outcome of one bin.
#[derive(Debug, Clone)]
pub struct BinOutcome {
    /// Bin index.
    pub bin: usize,
    /// Bin centre in the binned variable.
    pub center: f64,
    /// Acceptance integral matrix, when one was built.
    pub integral: Option<IntegralMatrix>,
    /// Moments or the error raised for this bin.
    pub result: Result<MomentResult, MomError>,
}

/// Moments extracted independently in every kinematic bin.
#[derive(Debug, Clone)]
pub struct BinnedMoments {
    /// Binning the outcomes refer to.
    pub binning: KinematicBinning,
    /// One outcome per bin, in bin order.
    pub outcomes: Vec<BinOutcome>,
}

impl BinnedMoments {
    /// Runs the full pipeline in every bin in parallel.
    ///
    /// A failing bin yields an `Err` outcome tagged with its index and does not
    /// affect the others. Bootstrap seeds are derived per bin from `opts.bootstrap.seed`.
    pub fn calculate(
        binning: &KinematicBinning,
        indices: &MomentIndexSet,
        polarization: f64,
        bins: &[BinInput],
        opts: &CorrectionOpts,
    ) -> Result<Self, MomError> {
        if bins.len() != binning.n_bins {
            return Err(binning_error("bin-count-mismatch", "one input per bin required")
                .with_context("bins", binning.n_bins.to_string())
                .with_context("inputs", bins.len().to_string()));
        }
        let centers = binning.centers();
        let outcomes = bins
            .par_iter()
            .enumerate()
            .map(|(bin, input)| {
                let (integral, result) = Self::process_bin(bin, indices, polarization, input, opts);
                let result = result.map_err(|err| {
                    let err = err.with_context("bin", bin.to_string());
                    tracing::warn!(bin, var = %binning.var, error = %err, "moment extraction failed in bin");
                    err
                });
                BinOutcome {
                    bin,
                    center: centers[bin],
                    integral,
                    result,
                }
            })
            .collect::<Vec<_>>();
        let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
        tracing::info!(bins = binning.n_bins, failed, var = %binning.var, "binned moment extraction finished");
        Ok(Self {
            binning: binning.clone(),
            outcomes,
        })
    }

    fn process_bin(
        bin: usize,
        indices: &MomentIndexSet,
        polarization: f64,
        input: &BinInput,
        opts: &CorrectionOpts,
    ) -> (Option<IntegralMatrix>, Result<MomentResult, MomError>) {
        let integral = match &input.phase_space {
            Some(ps) => match IntegralMatrix::build(indices, &ps.accepted, polarization, ps.n_generated) {
                Ok(integral) => Some(integral),
                Err(err) => return (None, Err(err.with_context("stage", "integral-matrix"))),
            },
            None => None,
        };
        let mut bin_opts = *opts;
        bin_opts.bootstrap.seed = derive_substream_seed(opts.bootstrap.seed, bin as u64);
        let result = calculate_moments(indices, &input.data, polarization, integral.as_ref(), &bin_opts);
        (integral, result)
    }

    /// Successful results with their bin index.
    pub fn successes(&self) -> impl Iterator<Item = (usize, &MomentResult)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|result| (outcome.bin, result)))
    }
}
