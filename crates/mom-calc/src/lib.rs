#![deny(missing_docs)]
#![doc = "Moment accumulation, acceptance correction, covariance propagation and per-bin drivers."]

pub mod accumulate;
pub mod binning;
pub mod bootstrap;
pub mod convert;
pub mod correct;
pub mod covariance;
pub mod integral;
pub mod opts;
pub mod result;
pub mod serde;

pub use accumulate::RawMoments;
pub use binning::{BinInput, BinOutcome, BinnedMoments, KinematicBinning, PhaseSpaceSample};
pub use bootstrap::bootstrap_replicas;
pub use convert::{to_complex, to_real};
pub use correct::{calculate_moments, AcceptanceCorrected, MomentCorrector, Uncorrected};
pub use covariance::AugmentedCovariance;
pub use integral::IntegralMatrix;
pub use opts::{BootstrapOpts, ConditioningOpts, CorrectionOpts, NormalizationOpts};
pub use result::{MomentResult, MomentValue, Pull};
pub use self::serde::{from_json, to_json};
