// src/core/crypto/lwe.rs
//! Single-bit Learning-With-Errors public-key encryption (Regev style).
//!
//! Key generation samples `s ← Z_q^n`, `A ← Z_q^{n×n}` and a small error `e`,
//! publishing `(A, b = A·s + e)`. Encryption picks a fresh `r ← {0,1}^n` and
//! outputs `(u = Aᵗ·r, v = b·r + bit·⌊q/2⌋)`. Decryption rounds
//! `v − s·u` to the nearer of `{0, q/2}` on the ring of size `q`.

use tracing::trace;

use super::arith::{add_error_mod, dot_mod, mat_t_vec_mod, mat_vec_mod, reduce, sub_mod};
use super::error::Result;
use super::sampling::Sampler;
use super::types::{Bit, Ciphertext, LweParams, PublicKey, SecretKey};

#[derive(Debug, Clone)]
pub struct Lwe {
    params: LweParams,
}

impl Lwe {
    pub fn new(params: LweParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &LweParams {
        &self.params
    }

    /// Generates a fresh key pair from the system CSPRNG.
    pub fn generate_keys(&self) -> Result<(PublicKey, SecretKey)> {
        self.generate_keys_with(&mut Sampler::from_entropy()?)
    }

    pub fn generate_keys_with(&self, sampler: &mut Sampler) -> Result<(PublicKey, SecretKey)> {
        let LweParams { n, q, stddev } = self.params;

        let s = sampler.uniform_vec(n, q);
        let a = sampler.uniform_matrix(n, n, q);
        let e = sampler.clipped_gaussian(n, stddev)?;

        let b = add_error_mod(&mat_vec_mod(&a, &s, q), &e, q);
        trace!(n, q, "generated LWE key pair");

        Ok((PublicKey::from_parts(a, b)?, SecretKey::new(s)))
    }

    /// Encrypts one bit under `pk` with fresh randomness.
    pub fn encrypt(&self, pk: &PublicKey, bit: Bit) -> Result<Ciphertext> {
        self.encrypt_with(pk, bit, &mut Sampler::from_entropy()?)
    }

    pub fn encrypt_with(&self, pk: &PublicKey, bit: Bit, sampler: &mut Sampler) -> Result<Ciphertext> {
        let q = self.params.q;
        let r = sampler.binary_vec(pk.dimension());

        let u = mat_t_vec_mod(pk.a(), &r, q);
        let encoded = (bit.as_u64() * self.params.half_q()) % q;
        let v = reduce(i128::from(dot_mod(pk.b(), &r, q)) + i128::from(encoded), q);

        Ok(Ciphertext::from_parts(u, v))
    }

    /// Decodes `v − s·u` to `1` when it lies within `q/4` of `q/2`, else `0`.
    pub fn decrypt(&self, sk: &SecretKey, ct: &Ciphertext) -> Bit {
        let q = self.params.q;
        let diff = sub_mod(ct.v(), dot_mod(sk.s(), ct.u(), q), q);
        Bit::from(is_near_half(diff, q))
    }
}

/// `|diff − q/2| < q/4`, evaluated exactly in integers as `2·|2·diff − q| < q`.
fn is_near_half(diff: u64, q: u64) -> bool {
    let distance = (2 * i128::from(diff) - i128::from(q)).abs();
    2 * distance < i128::from(q)
}
