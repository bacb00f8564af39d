//! Seeded random streams for bootstrap resampling and per-bin seeding.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Random stream owned by one resampling task.
///
/// Nothing in the moment crates draws from a global generator. Each bootstrap
/// replica and each kinematic bin gets its own stream, keyed by the caller's
/// master seed and a stream number through [`derive_substream_seed`], so the
/// draws are the same whatever order rayon schedules the tasks in.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Stream seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream number `stream` below `master_seed`.
    pub fn substream(master_seed: u64, stream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, stream))
    }

    /// `n` event positions drawn uniformly from `0..n` with replacement.
    ///
    /// Empty when `n` is zero.
    pub fn resample_indices(&mut self, n: usize) -> Vec<usize> {
        if n == 0 {
            return Vec::new();
        }
        (0..n).map(|_| self.rng.gen_range(0..n)).collect()
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed of stream `stream` below `master_seed`.
///
/// SipHash-1-3 with zero keys over the two words, which gives the same value
/// on every platform and toolchain.
pub fn derive_substream_seed(master_seed: u64, stream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(stream);
    hasher.finish()
}
