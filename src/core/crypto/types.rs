// src/core/crypto/types.rs
//! Lattice parameters and the key/ciphertext objects built on them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CryptoError, Result};

/// Parameters shared by both peers: dimension `n`, modulus `q`, error width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LweParams {
    pub n: usize,
    pub q: u64,
    pub stddev: f64,
}

impl LweParams {
    pub fn new(n: usize, q: u64, stddev: f64) -> Result<Self> {
        let params = Self { n, q, stddev };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(CryptoError::InvalidParameters("n must be positive".into()));
        }
        // q/4 must be non-zero for the decryption guard band to exist
        if self.q < 4 {
            return Err(CryptoError::InvalidParameters(format!(
                "q must be at least 4, got {}",
                self.q
            )));
        }
        if !self.stddev.is_finite() || self.stddev <= 0.0 {
            return Err(CryptoError::InvalidParameters(format!(
                "stddev must be a positive real, got {}",
                self.stddev
            )));
        }
        Ok(())
    }

    /// `floor(q / 2)`, the encoding of a `1` bit.
    pub fn half_q(&self) -> u64 {
        self.q / 2
    }
}

/// A single plaintext bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    pub fn as_u64(self) -> u64 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value {
            Bit::One
        } else {
            Bit::Zero
        }
    }
}

impl TryFrom<u8> for Bit {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            other => Err(CryptoError::InvalidParameters(format!(
                "plaintext must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

/// Dense row-major matrix over `Z_q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u64>,
}

impl Matrix {
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> u64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Builds a matrix from explicit rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let row_count = rows.len();
        let mut data = Vec::with_capacity(row_count * cols);
        for row in rows {
            if row.len() != cols {
                return Err(CryptoError::Dimension {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: row_count,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[u64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.data[i * self.cols + j]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u64]> {
        // chunks(0) panics, so an empty-column matrix yields no rows
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.iter_rows().map(<[u64]>::to_vec).collect()
    }

    pub fn values(&self) -> &[u64] {
        &self.data
    }
}

/// Public key `(A, b)` with `b = A·s + e mod q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    a: Matrix,
    b: Vec<u64>,
}

impl PublicKey {
    /// Assembles a key from its parts, checking that `A` is `n×n` and `b` has length `n`.
    pub fn from_parts(a: Matrix, b: Vec<u64>) -> Result<Self> {
        let n = b.len();
        if a.rows() != n {
            return Err(CryptoError::Dimension {
                expected: n,
                actual: a.rows(),
            });
        }
        if a.cols() != n {
            return Err(CryptoError::Dimension {
                expected: n,
                actual: a.cols(),
            });
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> &Matrix {
        &self.a
    }

    pub fn b(&self) -> &[u64] {
        &self.b
    }

    pub fn dimension(&self) -> usize {
        self.b.len()
    }
}

/// Secret vector `s`. Never leaves the key-generating party.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    s: Vec<u64>,
}

impl SecretKey {
    pub(crate) fn new(s: Vec<u64>) -> Self {
        Self { s }
    }

    pub fn s(&self) -> &[u64] {
        &self.s
    }

    pub fn dimension(&self) -> usize {
        self.s.len()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("dimension", &self.s.len())
            .finish_non_exhaustive()
    }
}

/// Ciphertext `(u, v)` of a single bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    u: Vec<u64>,
    v: u64,
}

impl Ciphertext {
    pub fn from_parts(u: Vec<u64>, v: u64) -> Self {
        Self { u, v }
    }

    pub fn u(&self) -> &[u64] {
        &self.u
    }

    pub fn v(&self) -> u64 {
        self.v
    }

    pub fn dimension(&self) -> usize {
        self.u.len()
    }
}
