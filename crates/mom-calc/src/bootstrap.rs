//! Bootstrap resampling of the signal events.

use std::f64::consts::PI;

use mom_basis::{AngularEvents, BasisEvaluator, MomentIndexSet};
use mom_core::{CMatrix, CVector, ErrorInfo, MomError, RngHandle};
use rayon::prelude::*;

use crate::correct::check_reference;
use crate::opts::{BootstrapOpts, NormalizationOpts};

/// Normalized moment vectors of `opts.samples` resamples (with replacement) of `data`.
///
/// Replica `s` draws from substream `s` of `opts.seed`, so replicas do not
/// depend on scheduling. The acceptance correction reuses `inverse` unchanged.
pub fn bootstrap_replicas(
    indices: &MomentIndexSet,
    data: &AngularEvents,
    polarization: f64,
    inverse: Option<&CMatrix>,
    normalization: &NormalizationOpts,
    opts: &BootstrapOpts,
) -> Result<Vec<CVector>, MomError> {
    let n_events = data.len();
    if n_events == 0 {
        return Err(MomError::Sample(ErrorInfo::new(
            "empty-sample",
            "cannot resample an empty event sample",
        )));
    }
    let evaluator = BasisEvaluator::new(indices, polarization)?;
    tracing::info!(samples = opts.samples, events = n_events, seed = opts.seed, "bootstrapping moments");
    (0..opts.samples as u64)
        .into_par_iter()
        .map(|sample| -> Result<CVector, MomError> {
            let mut rng = RngHandle::substream(opts.seed, sample);
            let resampled = data.select(&rng.resample_indices(n_events))?;
            let measured = evaluator.measured(&resampled)?.column_sum().map(|v| v * (2.0 * PI));
            let physical = match inverse {
                Some(inverse) => inverse * measured,
                None => measured,
            };
            let reference = physical[indices.reference_index()];
            check_reference(reference, normalization)
                .map_err(|err| err.with_context("sample", sample.to_string()))?;
            Ok(physical.map(|v| v / reference))
        })
        .collect()
}
