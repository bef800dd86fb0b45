//! Deterministic random number generation.
//!
//! RULE: Nothing in the driver may call a global or thread-local RNG.
//! Every worker owns one WorkerRng derived from the run's master seed,
//! and the loader owns its own stream. This keeps transaction-mix and
//! parameter-synthesis tests reproducible.
//!
//! Streams are seeded from (master_seed XOR stream_index * golden ratio), so:
//!   - Adding workers never changes existing workers' streams.
//!   - Each worker's stream is fully reproducible in isolation.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Stream index reserved for the dataset loader.
pub const LOADER_STREAM: u64 = u64::MAX;

const LOWER_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// A deterministic RNG owned by exactly one worker (or the loader).
pub struct WorkerRng {
    inner: Pcg64Mcg,
}

impl WorkerRng {
    /// Derive a stream from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform integer in [min, max], both inclusive.
    pub fn rand_int(&mut self, min: i32, max: i32) -> i32 {
        assert!(min <= max, "empty range [{min}, {max}]");
        self.inner.gen_range(min..=max)
    }

    /// Uniform integer in [min, max] that is never `excluding`.
    /// Requires at least two values in the range.
    pub fn rand_int_excluding(&mut self, min: i32, max: i32, excluding: i32) -> i32 {
        let n = self.rand_int(min, max - 1);
        if n >= excluding {
            n + 1
        } else {
            n
        }
    }

    /// Uniform float in [min, max] rounded to `decimals` places.
    pub fn rand_float(&mut self, min: f64, max: f64, decimals: u32) -> f64 {
        let p = 10f64.powi(decimals as i32);
        ((min + self.next_f64() * (max - min)) * p).round() / p
    }

    /// True with probability `percent`/100, drawn as a 1..=100 roll.
    pub fn percent(&mut self, percent: i32) -> bool {
        self.rand_int(1, 100) <= percent
    }

    /// TPC-C non-uniform random: ((rand(0,a) | rand(x,y)) + c) % (y-x+1) + x.
    pub fn nurand(&mut self, a: i32, x: i32, y: i32, c: i32) -> i32 {
        (((self.rand_int(0, a) | self.rand_int(x, y)) + c) % (y - x + 1)) + x
    }

    /// Lowercase alphabetic string of exactly `len` characters.
    pub fn alpha_string(&mut self, len: usize) -> String {
        self.string_from(len, LOWER_ALPHA)
    }

    /// Lowercase alphabetic string with a length drawn from [min, max].
    pub fn alpha_string_between(&mut self, min: usize, max: usize) -> String {
        let len = self.rand_int(min as i32, max as i32) as usize;
        self.alpha_string(len)
    }

    pub fn numeric_string(&mut self, len: usize) -> String {
        self.string_from(len, DIGITS)
    }

    /// Overwrite a random window of `data` with `marker`.
    /// Returns `data` unchanged if it is too short to hold the marker.
    pub fn embed(&mut self, data: &str, marker: &str) -> String {
        if data.len() <= marker.len() {
            return data.to_string();
        }
        let position = self.inner.gen_range(0..data.len() - marker.len());
        format!(
            "{}{}{}",
            &data[..position],
            marker,
            &data[position + marker.len()..]
        )
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    fn string_from(&mut self, len: usize, charset: &[u8]) -> String {
        (0..len)
            .map(|_| charset[self.inner.gen_range(0..charset.len())] as char)
            .collect()
    }
}
