#![deny(missing_docs)]
#![doc = "Core error, RNG and scalar types shared by the moment extraction crates."]

pub mod errors;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, MomError};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{max_abs_diff, CMatrix, CVector, Complex64};
