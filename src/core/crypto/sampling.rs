// src/core/crypto/sampling.rs
//! Sampling for LWE key generation and encryption.
//! Uniform vectors/matrices over Z_q, binary vectors, and a clipped rounded Gaussian.

use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::Normal;
use ring::rand::{SecureRandom, SystemRandom};

use super::error::{CryptoError, Result};
use super::types::Matrix;

/// Error samples are clipped to `±ERROR_CLIP_STDDEVS · stddev` before rounding.
pub const ERROR_CLIP_STDDEVS: f64 = 2.0;

/// Random source for lattice material.
///
/// Production instances are seeded from the operating system CSPRNG through
/// `ring`; each key generation or encryption call builds its own sampler.
pub struct Sampler {
    rng: ChaCha20Rng,
}

impl Sampler {
    pub fn from_entropy() -> Result<Self> {
        let mut seed = [0u8; 32];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|_| CryptoError::Randomness("Failed to generate random seed".into()))?;
        Ok(Self {
            rng: ChaCha20Rng::from_seed(seed),
        })
    }

    /// Deterministic sampler. Only for tests and benchmarks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Vector of `len` integers uniform over `[0, q)`.
    pub fn uniform_vec(&mut self, len: usize, q: u64) -> Vec<u64> {
        let dist = Uniform::new(0, q);
        (0..len).map(|_| dist.sample(&mut self.rng)).collect()
    }

    /// `rows × cols` matrix uniform over `[0, q)`.
    pub fn uniform_matrix(&mut self, rows: usize, cols: usize, q: u64) -> Matrix {
        let dist = Uniform::new(0, q);
        Matrix::from_fn(rows, cols, |_, _| dist.sample(&mut self.rng))
    }

    /// Vector of `len` independent fair bits.
    pub fn binary_vec(&mut self, len: usize) -> Vec<u64> {
        (0..len).map(|_| u64::from(self.rng.gen::<bool>())).collect()
    }

    /// Draws `len` samples from `N(0, stddev²)`, clips each to
    /// `[-2·stddev, 2·stddev]` and rounds to the nearest integer.
    pub fn clipped_gaussian(&mut self, len: usize, stddev: f64) -> Result<Vec<i64>> {
        let normal = Normal::new(0.0, stddev)
            .map_err(|e| CryptoError::InvalidParameters(format!("Invalid error width: {}", e)))?;
        let bound = ERROR_CLIP_STDDEVS * stddev;
        Ok((0..len)
            .map(|_| normal.sample(&mut self.rng).clamp(-bound, bound).round() as i64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_uniform_vec_range() {
        let q = 3329;
        let mut sampler = Sampler::from_entropy().unwrap();
        let v = sampler.uniform_vec(4096, q);

        assert_eq!(v.len(), 4096);
        assert!(v.iter().all(|&x| x < q));
    }

    #[test]
    fn test_uniform_matrix_shape() {
        let mut sampler = Sampler::with_seed(7);
        let m = sampler.uniform_matrix(5, 3, 17);

        assert_eq!(m.rows(), 5);
        assert_eq!(m.cols(), 3);
        assert!(m.values().iter().all(|&x| x < 17));
    }

    #[test]
    fn test_binary_vec_is_binary_and_mixed() {
        let mut sampler = Sampler::with_seed(11);
        let r = sampler.binary_vec(1024);
        let ones = r.iter().filter(|&&x| x == 1).count();

        assert!(r.iter().all(|&x| x <= 1));
        // 1024 fair coins landing outside [400, 624] is astronomically unlikely
        assert!((400..=624).contains(&ones));
    }

    #[test]
    fn test_clipped_gaussian_bounds() {
        let stddev = 3.19;
        let mut sampler = Sampler::with_seed(3);
        let e = sampler.clipped_gaussian(10_000, stddev).unwrap();
        let bound = (2.0 * stddev).round() as i64;

        assert!(e.iter().all(|&x| x.abs() <= bound));
    }

    #[test]
    fn test_clipped_gaussian_symmetry() {
        let mut sampler = Sampler::with_seed(5);
        let samples = sampler.clipped_gaussian(20_000, 1.0).unwrap();
        let mut histogram: HashMap<i64, i64> = HashMap::new();
        for &x in &samples {
            *histogram.entry(x).or_insert(0) += 1;
        }

        // clipping at 2.0 leaves only {-2..=2}
        assert!(histogram.keys().all(|k| (-2..=2).contains(k)));
        let pos = histogram.get(&1).copied().unwrap_or(0);
        let neg = histogram.get(&-1).copied().unwrap_or(0);
        assert!((pos - neg).abs() < 500);
    }

    #[test]
    fn test_seeded_sampler_is_deterministic() {
        let a = Sampler::with_seed(42).uniform_vec(32, 3329);
        let b = Sampler::with_seed(42).uniform_vec(32, 3329);
        assert_eq!(a, b);
    }
}
