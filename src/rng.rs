use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use sha2::{Digest, Sha256};

/// Seeded random-value source consumed by the simulator.
///
/// Every implementation must advance a pure function of its internal seed
/// state in a fixed, enumerable sequence: same seed, same sequence, across
/// process restarts. Swappable so tests can drive the simulator with a
/// fixed sequence.
pub trait SeededRng: Send {
    /// Next value in the half-open range [0, 1).
    fn next(&mut self) -> f64;
}

/// Default generator: a PCG stream keyed by the SHA-256 of the seed string.
pub struct PcgSeededRng {
    inner: Pcg64Mcg,
}

impl PcgSeededRng {
    pub fn from_seed_str(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&digest[..16]);
        Self {
            inner: Pcg64Mcg::from_seed(key),
        }
    }
}

impl SeededRng for PcgSeededRng {
    fn next(&mut self) -> f64 {
        // Top 53 bits give a uniform double in [0, 1)
        (self.inner.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Replays a fixed sequence, cycling when exhausted. Test double.
pub struct FixedSequenceRng {
    values: Vec<f64>,
    cursor: usize,
}

impl FixedSequenceRng {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "sequence must not be empty");
        Self { values, cursor: 0 }
    }
}

impl SeededRng for FixedSequenceRng {
    fn next(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}
