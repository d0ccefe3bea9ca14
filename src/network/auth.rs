// src/network/auth.rs
//! Bearer credentials: compact HS256-signed tokens (`header.payload.signature`,
//! base64url without padding) carrying a `user` claim.
//!
//! Tokens are not time-checked. `iat` is informational only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::hmac;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{AuthError, FrameError};
use super::framer::FrameDecoder;

const ALGORITHM: &str = "HS256";
/// base64url length of a 32-byte HMAC-SHA256 tag without padding.
const SIGNATURE_LEN: usize = 43;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Issues and verifies credentials under one shared secret.
pub struct CredentialSigner {
    key: hmac::Key,
}

impl CredentialSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    pub fn issue(&self, user: &str) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let claims = Claims {
            user: user.to_string(),
            iat: Some(chrono::Utc::now().timestamp()),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let tag = hmac::sign(&self.key, signing_input.as_bytes());
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(tag.as_ref())))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        // the header decides how the rest is checked, so it is judged first
        let header_segment = token.split('.').next().unwrap_or_default();
        let header: Header = serde_json::from_slice(&decode_segment(header_segment)?)
            .map_err(|e| AuthError::Malformed(format!("header: {}", e)))?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let mut parts = token.split('.');
        let (payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(p), Some(s), None) => (p, s),
            _ => return Err(AuthError::Malformed("expected three dot-separated segments".into())),
        };

        let signature = decode_segment(signature)?;
        let signing_input_len = token.len() - signature_segment_len(token);
        hmac::verify(&self.key, token[..signing_input_len].as_bytes(), &signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: Value = serde_json::from_slice(&decode_segment(payload)?)
            .map_err(|e| AuthError::Malformed(format!("payload: {}", e)))?;
        let user = claims
            .get("user")
            .and_then(Value::as_str)
            .ok_or(AuthError::MissingClaim("user"))?;

        Ok(Claims {
            user: user.to_string(),
            iat: claims.get("iat").and_then(Value::as_i64),
        })
    }
}

/// Length of `.signature`, i.e. everything after the signing input.
fn signature_segment_len(token: &str) -> usize {
    token.rfind('.').map_or(0, |dot| token.len() - dot)
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Malformed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("base64: {}", e)))
}

/// Frames a compact HS256 token off the front of the stream.
///
/// Complete once two dots are present and the signature segment holds a full
/// HMAC-SHA256 tag. A header that does not announce HS256 ends the frame at
/// its dot so the token can be rejected without waiting for more bytes. Any
/// byte outside the base64url alphabet before that point makes the credential
/// malformed.
///
/// Scan progress is kept between calls, so every buffered byte is inspected
/// once however the token is split across reads.
#[derive(Debug, Default, Clone)]
pub struct CredentialDecoder {
    scanned: usize,
    dots: usize,
    signature_start: Option<usize>,
}

impl CredentialDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(&mut self, buf: &[u8], end: usize) -> Result<Option<(String, usize)>, FrameError> {
        *self = Self::default();
        Ok(Some((token_string(&buf[..end])?, end)))
    }
}

impl FrameDecoder for CredentialDecoder {
    type Item = String;

    fn decode(&mut self, buf: &[u8]) -> Result<Option<(String, usize)>, FrameError> {
        for i in self.scanned..buf.len() {
            if let Some(start) = self.signature_start {
                if i - start == SIGNATURE_LEN {
                    return self.finish(buf, i);
                }
            }
            match buf[i] {
                b'.' if self.dots < 2 => {
                    self.dots += 1;
                    if self.dots == 1 && !announces_hs256(&buf[..i]) {
                        return self.finish(buf, i + 1);
                    }
                    if self.dots == 2 {
                        self.signature_start = Some(i + 1);
                    }
                }
                b if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' => {}
                other => {
                    return Err(FrameError::Malformed(format!(
                        "unexpected byte 0x{:02x} in credential",
                        other
                    )))
                }
            }
        }
        self.scanned = buf.len();

        match self.signature_start {
            Some(start) if buf.len() - start == SIGNATURE_LEN => self.finish(buf, buf.len()),
            _ => Ok(None),
        }
    }
}

fn announces_hs256(header_segment: &[u8]) -> bool {
    URL_SAFE_NO_PAD
        .decode(header_segment)
        .ok()
        .and_then(|json| serde_json::from_slice::<Header>(&json).ok())
        .map_or(false, |header| header.alg == ALGORITHM)
}

fn token_string(bytes: &[u8]) -> Result<String, FrameError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FrameError::Malformed(e.to_string()))
}
