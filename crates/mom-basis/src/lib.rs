#![deny(missing_docs)]
#![doc = "Angular basis functions, moment index sets and production-amplitude models."]

pub mod basis;
pub mod clebsch;
pub mod events;
pub mod index;
pub mod waves;
pub mod ylm;

pub use basis::{measured_basis, physical_basis, BasisEvaluator, BasisKind};
pub use clebsch::clebsch_gordan;
pub use events::{AngularEvents, DEFAULT_CHUNK_SIZE};
pub use index::{MomentIndexSet, QnMomentIndex, MOMENT_COMPONENTS};
pub use waves::{AmplitudeSet, AmplitudeValue, MomentTriple, WaveIndex, DEFAULT_STRUCTURAL_TOLERANCE};
pub use ylm::{ylm, SphericalHarmonics};
