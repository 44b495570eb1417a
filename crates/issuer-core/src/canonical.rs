//! # Canonical Serialization — JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that are signed
//! or digested anywhere in the issuer.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only constructors run the value
//! through RFC 8785 (JSON Canonicalization Scheme) via `serde_jcs`: sorted
//! keys, compact separators, deterministic number formatting. Any API that
//! signs or verifies takes `&CanonicalBytes`, so "signed something that was
//! serialized differently" cannot be expressed.
//!
//! Unlike digest pipelines that forbid floats outright, credential claims
//! pass attestation values through unchanged, so floats are accepted and
//! formatted per RFC 8785 §3.2.2.3.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON tree.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        Ok(Self(serde_jcs::to_vec(&value)?))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
