// src/network/error.rs
use std::time::Duration;

use thiserror::Error;

use crate::core::crypto::{CodecError, CryptoError};

/// Failures while turning the byte stream into discrete messages.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Message exceeds maximum allowed size of {limit} bytes")]
    Overflow { limit: usize },

    #[error("No complete message after {chunks} reads")]
    BudgetExhausted { chunks: usize },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Channel closed after {received} bytes without a complete message")]
    ChannelClosed { received: usize },

    #[error("Channel read timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures verifying a bearer credential.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed credential: {0}")]
    Malformed(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Credential signature verification failed")]
    BadSignature,

    #[error("Credential is missing claim '{0}'")]
    MissingClaim(&'static str),
}

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Failed to read {path}: {reason}")]
    Pem { path: String, reason: String },

    #[error("TLS configuration error: {0}")]
    Config(String),

    #[error("Invalid server name: {0}")]
    ServerName(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),
}

/// Failures of one protocol run. Scoped to a single connection.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Rejected(#[from] AuthError),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("Decode error: {0}")]
    Codec(#[from] CodecError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Transport security error: {0}")]
    Tls(#[from] TlsError),

    #[error("Peer sent dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
