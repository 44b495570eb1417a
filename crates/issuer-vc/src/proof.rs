//! # Proof types for Verifiable Credentials
//!
//! The proof object has a rigid structure; unknown fields are rejected on
//! deserialization so nothing can be smuggled alongside a signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type of cryptographic proof attached to a VC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofType {
    /// Ed25519 signature over the JCS-canonicalized credential body.
    Ed25519Signature2020,
}

impl ProofType {
    /// Returns `true` if this is an Ed25519-based proof type.
    pub fn is_ed25519(&self) -> bool {
        matches!(self, ProofType::Ed25519Signature2020)
    }
}

impl std::fmt::Display for ProofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofType::Ed25519Signature2020 => write!(f, "Ed25519Signature2020"),
        }
    }
}

/// The purpose of a cryptographic proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the credential claims are true.
    AssertionMethod,
}

/// A cryptographic proof on a Verifiable Credential.
///
/// `proof_value` is the hex-encoded Ed25519 signature over the canonical
/// credential body with `proof` removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Proof {
    /// The proof type.
    #[serde(rename = "type")]
    pub proof_type: ProofType,

    /// When the proof was created (UTC, seconds precision).
    pub created: DateTime<Utc>,

    /// DID URL identifying the signing key, `{issuer}#{keyAlias}`.
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,

    /// The purpose of this proof.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: ProofPurpose,

    /// Hex-encoded signature bytes (128 characters).
    #[serde(rename = "proofValue")]
    pub proof_value: String,
}
