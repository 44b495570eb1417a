//! # Verifiable Credential structure, signing, and verification
//!
//! Defines [`VerifiableCredential`] following the W3C VC Data Model 1.0.
//!
//! ## Security Invariants
//!
//! - **Signing** canonicalizes the credential body (with `proof` removed)
//!   via [`CanonicalBytes::from_value()`], signs it with Ed25519, and
//!   attaches a [`Proof`]. No raw `serde_json::to_vec()` is used in the
//!   signing path.
//! - **Verification** recomputes the canonical body and checks every proof.
//!   Expired credentials fail before any signature work is done.
//! - The envelope is rigid (`deny_unknown_fields`); `credential_subject`
//!   is intentionally extensible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use issuer_core::{CanonicalBytes, Timestamp};
use issuer_crypto::{CryptoError, Ed25519Signature, SigningKey, VerifyingKey};

use crate::proof::{Proof, ProofPurpose, ProofType};

/// The base W3C credentials context.
pub const W3C_CREDENTIALS_V1: &str = "https://www.w3.org/2018/credentials/v1";

/// The mandatory base credential type.
pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";

/// Errors from VC construction, signing and verification.
#[derive(Error, Debug)]
pub enum VcError {
    /// Canonicalization of the credential body failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] issuer_core::CanonicalizationError),

    /// Signature or validity-window verification failed.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The proof has an unsupported type.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// The credential has no proofs to verify.
    #[error("credential has no proofs")]
    NoProofs,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The proof value has invalid encoding or wrong length.
    #[error("invalid proof value: {0}")]
    InvalidProofValue(String),

    /// Key or framing error from the crypto layer.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The credential is structurally invalid.
    #[error("malformed credential: {0}")]
    Malformed(String),
}

/// The result of verifying a single proof on a credential.
#[derive(Debug, Clone)]
pub struct ProofResult {
    /// The verification method (DID URL) from the proof.
    pub verification_method: String,
    /// Whether the signature was valid.
    pub ok: bool,
    /// Error message if verification failed; empty if ok.
    pub error: String,
}

/// A W3C Verifiable Credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifiableCredential {
    /// JSON-LD context URIs.
    #[serde(rename = "@context")]
    pub context: ContextValue,

    /// Credential identifier (`urn:uuid:...`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential type(s). MUST include `"VerifiableCredential"`.
    #[serde(rename = "type")]
    pub credential_type: CredentialTypeValue,

    /// DID of the credential issuer.
    pub issuer: String,

    /// When the credential was issued (UTC).
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,

    /// Expiration date (UTC).
    #[serde(
        rename = "expirationDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<DateTime<Utc>>,

    /// The credential subject.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: serde_json::Value,

    /// Cryptographic proofs attached to this credential.
    #[serde(default, skip_serializing_if = "ProofValue::is_empty")]
    pub proof: ProofValue,
}

/// JSON-LD `@context` value: a single string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Single context URI string.
    Single(String),
    /// Array of context URI strings or objects.
    Array(Vec<serde_json::Value>),
}

impl Default for ContextValue {
    fn default() -> Self {
        Self::Array(vec![serde_json::Value::String(
            W3C_CREDENTIALS_V1.to_string(),
        )])
    }
}

/// Credential `type` value: a single string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialTypeValue {
    /// Single type string.
    Single(String),
    /// Array of type strings.
    Array(Vec<String>),
}

impl CredentialTypeValue {
    /// `["VerifiableCredential", credential_type]`, without duplicating the base type.
    pub fn for_type(credential_type: &str) -> Self {
        if credential_type == VERIFIABLE_CREDENTIAL {
            Self::Array(vec![VERIFIABLE_CREDENTIAL.to_string()])
        } else {
            Self::Array(vec![
                VERIFIABLE_CREDENTIAL.to_string(),
                credential_type.to_string(),
            ])
        }
    }

    /// Check whether `"VerifiableCredential"` is included in the type.
    pub fn contains_vc_type(&self) -> bool {
        self.as_list().iter().any(|s| *s == VERIFIABLE_CREDENTIAL)
    }

    /// Normalize to a list of type names.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Array(arr) => arr.iter().map(String::as_str).collect(),
        }
    }
}

/// Proof value: a single proof, an array of proofs, or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofValue {
    /// A single proof object.
    Single(Box<Proof>),
    /// An array of proof objects.
    Array(Vec<Proof>),
}

impl Default for ProofValue {
    fn default() -> Self {
        Self::Array(Vec::new())
    }
}

impl ProofValue {
    /// Returns `true` if there are no proofs.
    pub fn is_empty(&self) -> bool {
        match self {
            ProofValue::Single(_) => false,
            ProofValue::Array(arr) => arr.is_empty(),
        }
    }

    /// Normalize to a list of proof references.
    pub fn as_list(&self) -> Vec<&Proof> {
        match self {
            ProofValue::Single(p) => vec![p.as_ref()],
            ProofValue::Array(arr) => arr.iter().collect(),
        }
    }

    /// Add a proof, converting `Single` to `Array` if needed.
    pub fn push(&mut self, proof: Proof) {
        match self {
            ProofValue::Single(existing) => {
                let prev = existing.as_ref().clone();
                *self = ProofValue::Array(vec![prev, proof]);
            }
            ProofValue::Array(arr) => arr.push(proof),
        }
    }
}

impl VerifiableCredential {
    /// Canonical bytes of the credential with the `proof` field removed.
    pub fn signing_input(&self) -> Result<CanonicalBytes, VcError> {
        let mut val = serde_json::to_value(self)?;
        if let Some(obj) = val.as_object_mut() {
            obj.remove("proof");
        }
        Ok(CanonicalBytes::from_value(val)?)
    }

    /// Sign this credential and attach an Ed25519 proof.
    pub fn sign_ed25519(
        &mut self,
        signing_key: &SigningKey,
        verification_method: String,
        proof_type: ProofType,
        created: Option<Timestamp>,
    ) -> Result<Ed25519Signature, VcError> {
        let canonical = self.signing_input()?;
        let signature = signing_key.sign(&canonical);

        self.proof.push(Proof {
            proof_type,
            created: *created.unwrap_or_else(Timestamp::now).as_datetime(),
            verification_method,
            proof_purpose: ProofPurpose::AssertionMethod,
            proof_value: signature.to_hex(),
        });
        Ok(signature)
    }

    /// Structural checks that do not involve signatures.
    pub fn validate_structure(&self) -> Result<(), VcError> {
        if !self.credential_type.contains_vc_type() {
            return Err(VcError::Malformed(
                "type must include \"VerifiableCredential\"".into(),
            ));
        }
        if self.issuer.trim().is_empty() {
            return Err(VcError::Malformed("issuer must not be empty".into()));
        }
        if !self.credential_subject.is_object() {
            return Err(VcError::Malformed(
                "credentialSubject must be an object".into(),
            ));
        }
        if let Some(exp) = self.expiration_date {
            if exp <= self.issuance_date {
                return Err(VcError::Malformed(
                    "expirationDate must be after issuanceDate".into(),
                ));
            }
        }
        Ok(())
    }

    /// Verify every Ed25519 proof as of `now`.
    ///
    /// An expired credential yields all-failed results without performing
    /// signature verification. Zero proofs yield an empty `Vec`, which
    /// callers must treat as failure.
    pub fn verify_at<F>(&self, now: DateTime<Utc>, resolve_key: F) -> Vec<ProofResult>
    where
        F: Fn(&str) -> Result<VerifyingKey, String>,
    {
        let proofs = self.proof.as_list();
        let fail_all = |error: String| {
            proofs
                .iter()
                .map(|p| ProofResult {
                    verification_method: p.verification_method.clone(),
                    ok: false,
                    error: error.clone(),
                })
                .collect::<Vec<_>>()
        };

        if let Some(expiration) = self.expiration_date {
            if expiration <= now {
                return fail_all(format!("credential expired at {expiration}"));
            }
        }
        if self.issuance_date > now {
            return fail_all(format!("credential not valid before {}", self.issuance_date));
        }

        let canonical = match self.signing_input() {
            Ok(c) => c,
            Err(e) => return fail_all(format!("canonicalization failed: {e}")),
        };

        proofs
            .iter()
            .map(|proof| {
                let vm = proof.verification_method.clone();
                match verify_single_proof(proof, &canonical, &resolve_key) {
                    Ok(()) => ProofResult {
                        verification_method: vm,
                        ok: true,
                        error: String::new(),
                    },
                    Err(e) => ProofResult {
                        verification_method: vm,
                        ok: false,
                        error: e.to_string(),
                    },
                }
            })
            .collect()
    }

    /// Verify all proofs now and return `Ok(())` only if all pass.
    pub fn verify_all<F>(&self, resolve_key: F) -> Result<(), VcError>
    where
        F: Fn(&str) -> Result<VerifyingKey, String>,
    {
        self.validate_structure()?;
        let results = self.verify_at(Utc::now(), resolve_key);
        if results.is_empty() {
            return Err(VcError::NoProofs);
        }
        for r in &results {
            if !r.ok {
                return Err(VcError::VerificationFailed(format!(
                    "proof from {} failed: {}",
                    r.verification_method, r.error
                )));
            }
        }
        Ok(())
    }
}

fn verify_single_proof<F>(
    proof: &Proof,
    canonical: &CanonicalBytes,
    resolve_key: &F,
) -> Result<(), VcError>
where
    F: Fn(&str) -> Result<VerifyingKey, String>,
{
    if !proof.proof_type.is_ed25519() {
        return Err(VcError::UnsupportedProofType(proof.proof_type.to_string()));
    }

    let vk = resolve_key(&proof.verification_method).map_err(VcError::VerificationFailed)?;

    let sig = Ed25519Signature::from_hex(&proof.proof_value)
        .map_err(|e| VcError::InvalidProofValue(e.to_string()))?;

    vk.verify(canonical, &sig)
        .map_err(|e| VcError::VerificationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand_core::OsRng;
    use serde_json::json;

    fn make_vc() -> VerifiableCredential {
        let now = Utc::now();
        VerifiableCredential {
            context: ContextValue::default(),
            id: Some("urn:uuid:6f1c1c9e-1111-4b1e-9a57-0a1b2c3d4e5f".to_string()),
            credential_type: CredentialTypeValue::for_type("MembershipCredential"),
            issuer: "did:web:issuer".to_string(),
            issuance_date: now - Duration::seconds(5),
            expiration_date: Some(now + Duration::days(1)),
            credential_subject: json!({
                "id": "did:web:example:consumer",
                "membershipType": "FullMember"
            }),
            proof: ProofValue::default(),
        }
    }

    fn resolver(vk: VerifyingKey) -> impl Fn(&str) -> Result<VerifyingKey, String> {
        move |_: &str| Ok(vk)
    }

    #[test]
    fn sign_then_verify() {
        let key = SigningKey::generate(&mut OsRng);
        let mut vc = make_vc();
        vc.sign_ed25519(
            &key,
            "did:web:issuer#issuer".into(),
            ProofType::Ed25519Signature2020,
            None,
        )
        .unwrap();
        vc.verify_all(resolver(key.verifying_key())).unwrap();
    }

    #[test]
    fn tampered_subject_fails() {
        let key = SigningKey::generate(&mut OsRng);
        let mut vc = make_vc();
        vc.sign_ed25519(&key, "vm".into(), ProofType::Ed25519Signature2020, None)
            .unwrap();
        vc.credential_subject["membershipType"] = json!("Associate");
        assert!(matches!(
            vc.verify_all(resolver(key.verifying_key())),
            Err(VcError::VerificationFailed(_))
        ));
    }

    #[test]
    fn unsigned_credential_has_no_proofs() {
        let key = SigningKey::generate(&mut OsRng);
        let vc = make_vc();
        assert!(matches!(
            vc.verify_all(resolver(key.verifying_key())),
            Err(VcError::NoProofs)
        ));
    }

    #[test]
    fn expired_credential_fails_every_proof() {
        let key = SigningKey::generate(&mut OsRng);
        let mut vc = make_vc();
        vc.sign_ed25519(&key, "vm".into(), ProofType::Ed25519Signature2020, None)
            .unwrap();
        let later = Utc::now() + Duration::days(2);
        let results = vc.verify_at(later, resolver(key.verifying_key()));
        assert_eq!(results.len(), 1);
        assert!(!results[0].ok);
        assert!(results[0].error.contains("expired"));
    }

    #[test]
    fn signing_input_excludes_proof() {
        let key = SigningKey::generate(&mut OsRng);
        let mut vc = make_vc();
        let before = vc.signing_input().unwrap();
        vc.sign_ed25519(&key, "vm".into(), ProofType::Ed25519Signature2020, None)
            .unwrap();
        assert_eq!(before, vc.signing_input().unwrap());
    }

    #[test]
    fn type_list_does_not_duplicate_base_type() {
        assert_eq!(
            CredentialTypeValue::for_type(VERIFIABLE_CREDENTIAL).as_list(),
            vec!["VerifiableCredential"]
        );
        assert!(CredentialTypeValue::for_type("DataProcessorCredential").contains_vc_type());
    }

    #[test]
    fn structure_rejects_missing_base_type() {
        let mut vc = make_vc();
        vc.credential_type = CredentialTypeValue::Single("MembershipCredential".into());
        assert!(matches!(vc.validate_structure(), Err(VcError::Malformed(_))));
    }

    #[test]
    fn serde_roundtrip_uses_w3c_names() {
        let vc = make_vc();
        let json = serde_json::to_value(&vc).unwrap();
        assert!(json.get("@context").is_some());
        assert!(json.get("credentialSubject").is_some());
        assert!(json.get("proof").is_none());
        let back: VerifiableCredential = serde_json::from_value(json).unwrap();
        assert_eq!(back, vc);
    }
}
