//! Lattice cryptography: modular arithmetic, sampling, the LWE scheme and its wire codec

pub mod arith;
pub mod error;
pub mod lwe;
pub mod sampling;
pub mod security;
pub mod serialization;
pub mod types;

// Re-export commonly used types
pub use error::{CodecError, CryptoError};
pub use lwe::Lwe;
pub use sampling::Sampler;
pub use security::{estimate_security, measure_error_rate, ErrorRateReport, SecurityEstimate};
pub use serialization::{
    decode_document, decode_value, encode_document, fingerprint,
    WireDecode, WireEncode, WireValue,
};
pub use types::{Bit, Ciphertext, LweParams, Matrix, PublicKey, SecretKey};
