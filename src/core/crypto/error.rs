// src/core/crypto/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Randomness source failure: {0}")]
    Randomness(String),

    #[error("Invalid lattice parameters: {0}")]
    InvalidParameters(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unknown envelope tag: {0}")]
    UnknownTag(String),

    #[error("Unexpected document shape: {0}")]
    Shape(String),

    #[error("Integer {value} outside [0, {q})")]
    OutOfRange { value: u64, q: u64 },

    #[error("Invalid integer literal: {0}")]
    InvalidInteger(String),

    #[error("Invalid key material: {0}")]
    Key(#[from] CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
