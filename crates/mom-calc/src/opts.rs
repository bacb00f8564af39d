//! Option structs steering correction, normalization and resampling.

use serde::{Deserialize, Serialize};

fn default_min_relative_eigenvalue() -> f64 {
    1e-8
}

fn default_min_reference_magnitude() -> f64 {
    1e-12
}

fn default_max_relative_imaginary() -> f64 {
    5e-2
}

fn default_warn_relative_imaginary() -> f64 {
    1e-6
}

fn default_seed() -> u64 {
    12345
}

/// Thresholds for accepting an acceptance integral matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConditioningOpts {
    /// Smallest accepted ratio min|λ| / max|λ| of the eigenvalue moduli.
    #[serde(default = "default_min_relative_eigenvalue")]
    pub min_relative_eigenvalue: f64,
}

impl Default for ConditioningOpts {
    fn default() -> Self {
        Self {
            min_relative_eigenvalue: default_min_relative_eigenvalue(),
        }
    }
}

/// Thresholds for normalizing to H_0(0, 0).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NormalizationOpts {
    /// Reference moduli below this are refused.
    #[serde(default = "default_min_reference_magnitude")]
    pub min_reference_magnitude: f64,
    /// Largest accepted |Im ref| / |ref|.
    #[serde(default = "default_max_relative_imaginary")]
    pub max_relative_imaginary: f64,
    /// |Im ref| / |ref| above which a warning is logged.
    #[serde(default = "default_warn_relative_imaginary")]
    pub warn_relative_imaginary: f64,
}

impl Default for NormalizationOpts {
    fn default() -> Self {
        Self {
            min_reference_magnitude: default_min_reference_magnitude(),
            max_relative_imaginary: default_max_relative_imaginary(),
            warn_relative_imaginary: default_warn_relative_imaginary(),
        }
    }
}

/// Bootstrap resampling of the signal events; `samples == 0` disables it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BootstrapOpts {
    /// Number of bootstrap replicas.
    #[serde(default)]
    pub samples: usize,
    /// Master seed; replicas draw from substreams of it.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for BootstrapOpts {
    fn default() -> Self {
        Self {
            samples: 0,
            seed: default_seed(),
        }
    }
}

/// All options of the correction pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CorrectionOpts {
    /// Integral matrix acceptance thresholds.
    #[serde(default)]
    pub conditioning: ConditioningOpts,
    /// Normalization thresholds.
    #[serde(default)]
    pub normalization: NormalizationOpts,
    /// Bootstrap settings.
    #[serde(default)]
    pub bootstrap: BootstrapOpts,
}
