// src/core/crypto/security.rs
//! Rough parameter guidance: an advisory bit-strength band for `(n, q)` and an
//! empirical decryption error-rate measurement. Neither is a rigorous security estimate.

use serde::Serialize;

use super::error::Result;
use super::lwe::Lwe;
use super::sampling::Sampler;
use super::serialization::WireEncode;
use super::types::{Bit, LweParams};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEstimate {
    pub classical_bits: &'static str,
    pub quantum_bits: &'static str,
}

/// Maps `(n, q)` onto coarse classical/quantum strength bands.
pub fn estimate_security(n: usize, q: u64) -> SecurityEstimate {
    let (classical_bits, quantum_bits) = match n {
        0..=64 => ("~60", "~30"),
        65..=128 => ("~100", "~50"),
        129..=256 if q >= 3329 => ("128", "~64"),
        129..=256 => ("~110", "~55"),
        257..=512 if q >= 3329 => ("192", "~96"),
        257..=512 => ("~170", "~85"),
        _ => ("High", "High"),
    };
    SecurityEstimate {
        classical_bits,
        quantum_bits,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRateReport {
    pub params: LweParams,
    pub trials: usize,
    pub failures: usize,
    pub error_rate: f64,
    /// Encoded public key envelope size in bytes.
    pub public_key_size: usize,
    /// Encoded ciphertext envelope size in bytes.
    pub ciphertext_size: usize,
    pub security: SecurityEstimate,
}

/// Encrypts `trials` random bits under one key pair and counts wrong decryptions.
pub fn measure_error_rate(params: LweParams, trials: usize) -> Result<ErrorRateReport> {
    let lwe = Lwe::new(params)?;
    let mut sampler = Sampler::from_entropy()?;
    let (pk, sk) = lwe.generate_keys_with(&mut sampler)?;

    let mut failures = 0;
    let mut ciphertext_size = 0;
    for trial in 0..trials {
        let bit = Bit::from(sampler.binary_vec(1)[0] == 1);
        let ct = lwe.encrypt_with(&pk, bit, &mut sampler)?;
        if trial == 0 {
            ciphertext_size = encoded_size(&ct);
        }
        if lwe.decrypt(&sk, &ct) != bit {
            failures += 1;
        }
    }

    let error_rate = if trials == 0 {
        0.0
    } else {
        failures as f64 / trials as f64
    };

    Ok(ErrorRateReport {
        params,
        trials,
        failures,
        error_rate,
        public_key_size: encoded_size(&pk),
        ciphertext_size,
        security: estimate_security(params.n, params.q),
    })
}

fn encoded_size<T: WireEncode>(value: &T) -> usize {
    value.encode().encoded_len()
}
