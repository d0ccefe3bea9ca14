// src/core/crypto/serialization.rs
//! Wire codec for lattice objects.
//!
//! Every message is one self-describing JSON document:
//!
//! ```text
//! Document := Scalar
//!           | {"type": "ndarray", "data": [Scalar, ...]}
//!           | {"type": "ndarray", "data": [[Scalar, ...], ...]}
//!           | {"type": "tuple",   "data": [Document, Document]}
//! ```
//!
//! Decoding is strict: unknown tags, extra keys, wrong arity and ragged
//! matrices are rejected rather than passed through.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha3::{Digest, Sha3_256};

use super::error::CodecError;
use super::types::{Ciphertext, Matrix, PublicKey};

pub type Result<T> = std::result::Result<T, CodecError>;

const TAG_KEY: &str = "type";
const DATA_KEY: &str = "data";
const NDARRAY_TAG: &str = "ndarray";
const TUPLE_TAG: &str = "tuple";

/// Serializable projection of every lattice object exchanged on the wire.
///
/// An empty `ndarray` carries no shape, so it always parses as an empty
/// `Vector`; [`Matrix`] decoding accepts that as the 0x0 matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Scalar(u64),
    Vector(Vec<u64>),
    Matrix(Vec<Vec<u64>>),
    Pair(Box<WireValue>, Box<WireValue>),
}

impl WireValue {
    pub fn pair(first: WireValue, second: WireValue) -> Self {
        WireValue::Pair(Box::new(first), Box::new(second))
    }

    pub fn to_json(&self) -> Value {
        match self {
            WireValue::Scalar(x) => json!(x),
            WireValue::Vector(v) => json!({ TAG_KEY: NDARRAY_TAG, DATA_KEY: v }),
            WireValue::Matrix(rows) => json!({ TAG_KEY: NDARRAY_TAG, DATA_KEY: rows }),
            WireValue::Pair(a, b) => json!({ TAG_KEY: TUPLE_TAG, DATA_KEY: [a.to_json(), b.to_json()] }),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(_) => Ok(WireValue::Scalar(as_integer(value)?)),
            Value::Object(map) => Self::from_tagged(map),
            other => Err(CodecError::Shape(format!(
                "expected integer or tagged object, found {}",
                kind(other)
            ))),
        }
    }

    fn from_tagged(map: &Map<String, Value>) -> Result<Self> {
        if let Some(extra) = map.keys().find(|k| *k != TAG_KEY && *k != DATA_KEY) {
            return Err(CodecError::Shape(format!("unexpected key '{}'", extra)));
        }
        let tag = match map.get(TAG_KEY) {
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => return Err(CodecError::Shape(format!("tag must be a string, found {}", kind(other)))),
            None => return Err(CodecError::Shape("missing 'type' tag".into())),
        };
        let data = match map.get(DATA_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(CodecError::Shape(format!("data must be an array, found {}", kind(other)))),
            None => return Err(CodecError::Shape("missing 'data' field".into())),
        };

        match tag {
            NDARRAY_TAG => Self::from_ndarray(data),
            TUPLE_TAG => match data.as_slice() {
                [first, second] => Ok(WireValue::pair(Self::from_json(first)?, Self::from_json(second)?)),
                items => Err(CodecError::Shape(format!("tuple must have 2 elements, found {}", items.len()))),
            },
            unknown => Err(CodecError::UnknownTag(unknown.to_string())),
        }
    }

    fn from_ndarray(data: &[Value]) -> Result<Self> {
        match data.first() {
            None => Ok(WireValue::Vector(Vec::new())),
            Some(Value::Array(_)) => {
                let rows = data
                    .iter()
                    .map(|row| match row {
                        Value::Array(items) => items.iter().map(as_integer).collect::<Result<Vec<_>>>(),
                        other => Err(CodecError::Shape(format!(
                            "matrix row must be an array, found {}",
                            kind(other)
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let width = rows[0].len();
                if rows.iter().any(|row| row.len() != width) {
                    return Err(CodecError::Shape("ragged matrix".into()));
                }
                Ok(WireValue::Matrix(rows))
            }
            Some(_) => Ok(WireValue::Vector(data.iter().map(as_integer).collect::<Result<_>>()?)),
        }
    }

    /// Serialized envelope size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.to_json().to_string().len()
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        WireValue::from_json(&value).map_err(de::Error::custom)
    }
}

fn as_integer(value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| CodecError::InvalidInteger(value.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_range(values: &[u64], q: u64) -> Result<()> {
    match values.iter().find(|&&x| x >= q) {
        Some(&value) => Err(CodecError::OutOfRange { value, q }),
        None => Ok(()),
    }
}

/// Projection of a lattice object onto the wire.
pub trait WireEncode {
    fn encode(&self) -> WireValue;
}

/// Reconstruction of a lattice object, checking every integer is in `[0, q)`.
pub trait WireDecode: Sized {
    fn decode(value: WireValue, q: u64) -> Result<Self>;
}

impl WireEncode for u64 {
    fn encode(&self) -> WireValue {
        WireValue::Scalar(*self)
    }
}

impl WireDecode for u64 {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        match value {
            WireValue::Scalar(x) => {
                check_range(&[x], q)?;
                Ok(x)
            }
            other => Err(unexpected("scalar", &other)),
        }
    }
}

impl WireEncode for Vec<u64> {
    fn encode(&self) -> WireValue {
        WireValue::Vector(self.clone())
    }
}

impl WireDecode for Vec<u64> {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        match value {
            WireValue::Vector(v) => {
                check_range(&v, q)?;
                Ok(v)
            }
            other => Err(unexpected("vector", &other)),
        }
    }
}

impl WireEncode for Matrix {
    fn encode(&self) -> WireValue {
        WireValue::Matrix(self.to_rows())
    }
}

impl WireDecode for Matrix {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        match value {
            WireValue::Matrix(rows) => {
                let m = Matrix::from_rows(rows)?;
                check_range(m.values(), q)?;
                Ok(m)
            }
            WireValue::Vector(v) if v.is_empty() => Ok(Matrix::from_rows(Vec::new())?),
            other => Err(unexpected("matrix", &other)),
        }
    }
}

impl<A: WireEncode, B: WireEncode> WireEncode for (A, B) {
    fn encode(&self) -> WireValue {
        WireValue::pair(self.0.encode(), self.1.encode())
    }
}

impl<A: WireDecode, B: WireDecode> WireDecode for (A, B) {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        match value {
            WireValue::Pair(a, b) => Ok((A::decode(*a, q)?, B::decode(*b, q)?)),
            other => Err(unexpected("tuple", &other)),
        }
    }
}

impl WireEncode for PublicKey {
    fn encode(&self) -> WireValue {
        WireValue::pair(self.a().encode(), WireValue::Vector(self.b().to_vec()))
    }
}

impl WireDecode for PublicKey {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        let (a, b) = <(Matrix, Vec<u64>)>::decode(value, q)?;
        Ok(PublicKey::from_parts(a, b)?)
    }
}

impl WireEncode for Ciphertext {
    fn encode(&self) -> WireValue {
        WireValue::pair(WireValue::Vector(self.u().to_vec()), WireValue::Scalar(self.v()))
    }
}

impl WireDecode for Ciphertext {
    fn decode(value: WireValue, q: u64) -> Result<Self> {
        let (u, v) = <(Vec<u64>, u64)>::decode(value, q)?;
        Ok(Ciphertext::from_parts(u, v))
    }
}

fn unexpected(expected: &str, found: &WireValue) -> CodecError {
    let found = match found {
        WireValue::Scalar(_) => "scalar",
        WireValue::Vector(_) => "vector",
        WireValue::Matrix(_) => "matrix",
        WireValue::Pair(_, _) => "tuple",
    };
    CodecError::Shape(format!("expected {}, found {}", expected, found))
}

/// Encodes `value` as a UTF-8 JSON envelope.
pub fn encode_document<T: WireEncode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&value.encode())?)
}

/// Interprets an already parsed JSON document as a `T` over `Z_q`.
pub fn decode_value<T: WireDecode>(document: &Value, q: u64) -> Result<T> {
    T::decode(WireValue::from_json(document)?, q)
}

/// Parses a complete UTF-8 JSON envelope into a `T` over `Z_q`.
pub fn decode_document<T: WireDecode>(bytes: &[u8], q: u64) -> Result<T> {
    let document: Value = serde_json::from_slice(bytes)?;
    decode_value(&document, q)
}

/// Short SHA3-256 fingerprint of an encoded envelope, for logs.
pub fn fingerprint(encoded: &[u8]) -> String {
    let digest = Sha3_256::digest(encoded);
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::{lwe::Lwe, sampling::Sampler, types::{Bit, LweParams}};

    #[test]
    fn test_envelope_shapes() {
        let ct = Ciphertext::from_parts(vec![1, 2, 3], 9);
        let json: Value = serde_json::from_slice(&encode_document(&ct).unwrap()).unwrap();

        assert_eq!(
            json,
            json!({"type": "tuple", "data": [{"type": "ndarray", "data": [1, 2, 3]}, 9]})
        );
    }

    #[test]
    fn test_public_key_roundtrip() {
        let lwe = Lwe::new(LweParams::new(8, 3329, 1.0).unwrap()).unwrap();
        let (pk, _) = lwe.generate_keys_with(&mut Sampler::with_seed(1)).unwrap();

        let bytes = encode_document(&pk).unwrap();
        let decoded: PublicKey = decode_document(&bytes, 3329).unwrap();
        assert_eq!(decoded, pk);
    }

    #[test]
    fn test_ciphertext_roundtrip() {
        let lwe = Lwe::new(LweParams::new(8, 3329, 1.0).unwrap()).unwrap();
        let (pk, _) = lwe.generate_keys().unwrap();
        let ct = lwe.encrypt(&pk, Bit::One).unwrap();

        let decoded: Ciphertext = decode_document(&encode_document(&ct).unwrap(), 3329).unwrap();
        assert_eq!(decoded, ct);
    }

    #[test]
    fn test_wide_integers_roundtrip() {
        let q = u64::MAX;
        let value = (vec![q - 1, 0, 1u64 << 63], q - 1);
        let decoded: (Vec<u64>, u64) = decode_document(&encode_document(&value).unwrap(), q).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_nested_pairs_roundtrip() {
        let value = WireValue::pair(
            WireValue::pair(WireValue::Scalar(1), WireValue::Matrix(vec![vec![1, 2], vec![3, 4]])),
            WireValue::Vector(vec![]),
        );
        let text = serde_json::to_string(&value).unwrap();
        let back: WireValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_empty_matrix_roundtrip() {
        let empty = Matrix::from_rows(Vec::new()).unwrap();
        let bytes = encode_document(&empty).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&bytes).unwrap(),
            json!({"type": "ndarray", "data": []})
        );

        let decoded: Matrix = decode_document(&bytes, 3329).unwrap();
        assert_eq!(decoded, empty);
        assert_eq!((decoded.rows(), decoded.cols()), (0, 0));
        assert!(decode_document::<Matrix>(br#"{"type":"ndarray","data":[1]}"#, 3329).is_err());
    }

    #[test]
    fn test_whitespace_separated_envelope_accepted() {
        let text = r#"{"type": "tuple", "data": [{"type": "ndarray", "data": [[1, 2], [3, 4]]}, {"type": "ndarray", "data": [5, 6]}]}"#;
        let pk: PublicKey = decode_document(text.as_bytes(), 7).unwrap();
        assert_eq!(pk.a().to_rows(), vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(pk.b(), &[5, 6]);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = WireValue::from_json(&json!({"type": "set", "data": [1]})).unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(tag) if tag == "set"));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        assert!(WireValue::from_json(&json!({"type": "tuple", "data": [1, 2, 3]})).is_err());
        assert!(WireValue::from_json(&json!({"type": "ndarray", "data": [[1, 2], [3]]})).is_err());
        assert!(WireValue::from_json(&json!({"type": "ndarray", "data": [-1]})).is_err());
        assert!(WireValue::from_json(&json!({"type": "ndarray", "data": [1.5]})).is_err());
        assert!(WireValue::from_json(&json!({"type": "ndarray"})).is_err());
        assert!(WireValue::from_json(&json!({"type": "ndarray", "data": [], "extra": 1})).is_err());
        assert!(WireValue::from_json(&json!("text")).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let bytes = encode_document(&Ciphertext::from_parts(vec![1, 3329], 0)).unwrap();
        let err = decode_document::<Ciphertext>(&bytes, 3329).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { value: 3329, q: 3329 }));
    }

    #[test]
    fn test_wrong_entity_rejected() {
        let bytes = encode_document(&Ciphertext::from_parts(vec![1, 2], 0)).unwrap();
        assert!(decode_document::<PublicKey>(&bytes, 3329).is_err());
    }

    #[test]
    fn test_non_square_key_rejected() {
        let value = WireValue::pair(WireValue::Matrix(vec![vec![1, 2, 3], vec![4, 5, 6]]), WireValue::Vector(vec![1, 2]));
        let err = PublicKey::decode(value, 7).unwrap_err();
        assert!(matches!(err, CodecError::Key(_)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let bytes = encode_document(&7u64).unwrap();
        assert_eq!(fingerprint(&bytes), fingerprint(&bytes));
        assert_eq!(fingerprint(&bytes).len(), 16);
    }
}
