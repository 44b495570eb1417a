//! # Compact JWS Framing
//!
//! VC-JWT credentials are compact JWS tokens:
//!
//! ```text
//! base64url(header) "." base64url(payload) "." base64url(signature)
//! ```
//!
//! All segments use the URL-safe alphabet without padding (RFC 7515 §2).
//! On the signing side the header and payload are `CanonicalBytes`, so the
//! same claims always produce the same token bytes. On the verifying side
//! the signature covers the segments exactly as received.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use issuer_core::CanonicalBytes;
use serde_json::Value;

use crate::ed25519::{Ed25519Signature, SigningInput, VerifyingKey};
use crate::error::CryptoError;

/// The JWS algorithm identifier for Ed25519.
pub const ALG_EDDSA: &str = "EdDSA";

/// `base64url(header) "." base64url(payload)`, the bytes a JWS signature covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsSigningInput(String);

impl JwsSigningInput {
    /// Frame canonical header and payload bytes.
    pub fn new(header: &CanonicalBytes, payload: &CanonicalBytes) -> Self {
        Self(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.as_bytes()),
            URL_SAFE_NO_PAD.encode(payload.as_bytes())
        ))
    }

    /// The framed input as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a signature, producing the compact serialization.
    pub fn into_compact(self, signature: &Ed25519Signature) -> String {
        format!("{}.{}", self.0, URL_SAFE_NO_PAD.encode(signature.as_bytes()))
    }
}

impl SigningInput for JwsSigningInput {
    fn signing_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A parsed compact JWS whose signature has not yet been checked.
#[derive(Debug, Clone)]
pub struct CompactJws {
    /// Decoded protected header.
    pub header: Value,
    /// Decoded payload.
    pub payload: Value,
    /// Decoded signature.
    pub signature: Ed25519Signature,
    signing_input: JwsSigningInput,
}

impl CompactJws {
    /// Split and decode a compact token.
    pub fn parse(token: &str) -> Result<Self, CryptoError> {
        let mut segments = token.trim().split('.');
        let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(CryptoError::Encoding(
                "compact JWS must have exactly three segments".into(),
            ));
        };

        let header = decode_json_segment("header", header_b64)?;
        let payload = decode_json_segment("payload", payload_b64)?;
        let sig_bytes = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|e| CryptoError::Encoding(format!("signature segment: {e}")))?;
        let signature = Ed25519Signature::from_slice(&sig_bytes)?;

        Ok(Self {
            header,
            payload,
            signature,
            signing_input: JwsSigningInput(format!("{header_b64}.{payload_b64}")),
        })
    }

    /// The `alg` header parameter, if present.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The `kid` header parameter, if present.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// Check the signature against `key`. Only `EdDSA` tokens are accepted.
    pub fn verify(&self, key: &VerifyingKey) -> Result<(), CryptoError> {
        match self.algorithm() {
            Some(ALG_EDDSA) => key.verify(&self.signing_input, &self.signature),
            Some(other) => Err(CryptoError::VerificationFailed(format!(
                "unsupported JWS algorithm {other:?}"
            ))),
            None => Err(CryptoError::VerificationFailed(
                "JWS header has no alg".into(),
            )),
        }
    }
}

fn decode_json_segment(name: &str, segment: &str) -> Result<Value, CryptoError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CryptoError::Encoding(format!("{name} segment: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::Encoding(format!("{name} segment is not JSON: {e}")))
}
