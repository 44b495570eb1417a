//! # Signing Boundary
//!
//! The orchestrator hands a mapped claim set to a [`CredentialSigner`] and
//! receives a signed credential or a [`SigningError`]. It knows nothing
//! about keys, algorithms or output encodings beyond this contract.
//!
//! [`Ed25519Signer`] is the bundled implementation: it resolves the key
//! alias against a [`KeyRing`], wraps the claims in a W3C VC envelope and
//! secures it as VC-JWT or with a linked-data proof, depending on the
//! requested [`CredentialFormat`]. Remote signers (HSM, KMS) implement the
//! same trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use issuer_core::Timestamp;
use issuer_crypto::KeyRing;

use crate::credential::{ContextValue, CredentialTypeValue, ProofValue, VerifiableCredential};
use crate::format::CredentialFormat;
use crate::jwt;
use crate::proof::ProofType;

/// Everything the signer needs to produce one credential.
#[derive(Debug, Clone, PartialEq)]
pub struct SigningRequest {
    /// Identifier for the credential (`urn:uuid:...`).
    pub credential_id: String,
    /// Claim tree produced by the mapping engine, rooted at `credentialSubject`.
    pub claims: Value,
    /// Credential type, e.g. `MembershipCredential`.
    pub credential_type: String,
    /// Issuer DID.
    pub issuer: String,
    /// Holder identifier; becomes `credentialSubject.id` when the claims lack one.
    pub subject: Option<String>,
    /// Validity window length in seconds.
    pub validity_seconds: u64,
    /// Alias of the signing key.
    pub key_alias: String,
    /// Output format.
    pub format: CredentialFormat,
}

/// A credential produced by the signing boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCredential {
    /// Format of `credential`.
    pub format: CredentialFormat,
    /// The JSON-LD credential object, or the VC-JWT as a JSON string.
    pub credential: Value,
    /// Signature in the encoding native to the format (hex for JSON-LD,
    /// base64url for VC-JWT).
    pub signature: String,
    /// DID URL of the signing key.
    pub verification_method: String,
    /// Start of the validity window.
    pub issued_at: Timestamp,
    /// End of the validity window.
    pub expires_at: Timestamp,
}

/// Failure at the signing boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// No key is registered under the requested alias.
    #[error("unknown signing key alias: {0}")]
    UnknownKey(String),

    /// The signer rejected the input.
    #[error("signer rejected input: {0}")]
    InvalidInput(String),

    /// The signer could not be reached or failed internally.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Opaque signing capability invoked by the issuance orchestrator.
#[async_trait]
pub trait CredentialSigner: Send + Sync {
    /// Sign a claim set as a credential.
    async fn sign(&self, request: SigningRequest) -> Result<SignedCredential, SigningError>;
}

/// Ed25519 signer backed by an in-process key ring.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    keys: Arc<KeyRing>,
}

impl Ed25519Signer {
    /// Create a signer over a key ring.
    pub fn new(keys: Arc<KeyRing>) -> Self {
        Self { keys }
    }

    /// The key ring this signer draws from.
    pub fn keys(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    fn sign_now(
        &self,
        request: SigningRequest,
        issued_at: Timestamp,
    ) -> Result<SignedCredential, SigningError> {
        let key = self
            .keys
            .get(&request.key_alias)
            .ok_or_else(|| SigningError::UnknownKey(request.key_alias.clone()))?;

        let vc = build_credential(&request, issued_at)?;
        let expires_at = issued_at
            .checked_add_secs(request.validity_seconds)
            .ok_or_else(|| SigningError::InvalidInput("validity window overflows".into()))?;
        let verification_method = format!("{}#{}", request.issuer, request.key_alias);

        let (credential, signature) = match request.format {
            CredentialFormat::JsonLd => {
                let mut vc = vc;
                let sig = vc
                    .sign_ed25519(
                        &key,
                        verification_method.clone(),
                        ProofType::Ed25519Signature2020,
                        Some(issued_at),
                    )
                    .map_err(|e| SigningError::InvalidInput(e.to_string()))?;
                let value = serde_json::to_value(&vc)
                    .map_err(|e| SigningError::InvalidInput(e.to_string()))?;
                (value, sig.to_hex())
            }
            CredentialFormat::Vc10Jwt => {
                let token = jwt::encode(&vc, &key, &verification_method)
                    .map_err(|e| SigningError::InvalidInput(e.to_string()))?;
                let signature = token.rsplit('.').next().unwrap_or_default().to_string();
                (Value::String(token), signature)
            }
        };

        tracing::debug!(
            credential_id = %request.credential_id,
            credential_type = %request.credential_type,
            format = %request.format,
            key_alias = %request.key_alias,
            "credential signed"
        );

        Ok(SignedCredential {
            format: request.format,
            credential,
            signature,
            verification_method,
            issued_at,
            expires_at,
        })
    }
}

#[async_trait]
impl CredentialSigner for Ed25519Signer {
    async fn sign(&self, request: SigningRequest) -> Result<SignedCredential, SigningError> {
        self.sign_now(request, Timestamp::now())
    }
}

/// Wrap a claim tree in an unsigned VC envelope.
fn build_credential(
    request: &SigningRequest,
    issued_at: Timestamp,
) -> Result<VerifiableCredential, SigningError> {
    if request.issuer.trim().is_empty() {
        return Err(SigningError::InvalidInput("issuer must not be empty".into()));
    }
    if request.validity_seconds == 0 {
        return Err(SigningError::InvalidInput(
            "validity must be at least one second".into(),
        ));
    }
    let Some(claims) = request.claims.as_object() else {
        return Err(SigningError::InvalidInput("claims must be a JSON object".into()));
    };
    if let Some(extra) = claims.keys().find(|k| k.as_str() != "credentialSubject") {
        return Err(SigningError::InvalidInput(format!(
            "unsupported top-level claim {extra:?}"
        )));
    }

    let mut subject = match claims.get("credentialSubject") {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(SigningError::InvalidInput(
                "credentialSubject must be an object".into(),
            ))
        }
        None => serde_json::Map::new(),
    };
    if let Some(holder) = &request.subject {
        subject
            .entry("id")
            .or_insert_with(|| Value::String(holder.clone()));
    }

    let expires_at = issued_at
        .checked_add_secs(request.validity_seconds)
        .ok_or_else(|| SigningError::InvalidInput("validity window overflows".into()))?;

    Ok(VerifiableCredential {
        context: ContextValue::default(),
        id: Some(request.credential_id.clone()),
        credential_type: CredentialTypeValue::for_type(&request.credential_type),
        issuer: request.issuer.clone(),
        issuance_date: *issued_at.as_datetime(),
        expiration_date: Some(*expires_at.as_datetime()),
        credential_subject: Value::Object(subject),
        proof: ProofValue::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::VcJwt;
    use issuer_crypto::SigningKey;
    use serde_json::json;

    fn signer() -> Ed25519Signer {
        let ring = KeyRing::new().with_key("issuer", SigningKey::from_bytes(&[11u8; 32]));
        Ed25519Signer::new(Arc::new(ring))
    }

    fn request(format: CredentialFormat) -> SigningRequest {
        SigningRequest {
            credential_id: "urn:uuid:0b8f4f8a-7f55-4a43-8d0c-5b5b9f7f2a10".into(),
            claims: json!({"credentialSubject": {"membershipType": "FullMember"}}),
            credential_type: "MembershipCredential".into(),
            issuer: "did:web:issuer".into(),
            subject: Some("did:web:example:consumer".into()),
            validity_seconds: 3600,
            key_alias: "issuer".into(),
            format,
        }
    }

    #[tokio::test]
    async fn jwt_format_produces_verifiable_token() {
        let signer = signer();
        let signed = signer.sign(request(CredentialFormat::Vc10Jwt)).await.unwrap();
        assert_eq!(signed.format, CredentialFormat::Vc10Jwt);
        assert_eq!(
            signed.expires_at.epoch_secs() - signed.issued_at.epoch_secs(),
            3600
        );

        let token = signed.credential.as_str().unwrap();
        assert!(token.ends_with(&signed.signature));
        let jwt = VcJwt::parse(token).unwrap();
        let vk = signer.keys().verifying_key("issuer").unwrap();
        jwt.verify_at(&vk, signed.issued_at).unwrap();
        assert_eq!(jwt.claims.sub.as_deref(), Some("did:web:example:consumer"));
        assert_eq!(
            jwt.claims.vc["credentialSubject"]["membershipType"],
            "FullMember"
        );
    }

    #[tokio::test]
    async fn json_ld_format_embeds_proof() {
        let signer = signer();
        let signed = signer.sign(request(CredentialFormat::JsonLd)).await.unwrap();
        let vc: VerifiableCredential = serde_json::from_value(signed.credential.clone()).unwrap();
        let vk = signer.keys().verifying_key("issuer").unwrap();
        vc.verify_all(|_| Ok(vk)).unwrap();
        assert_eq!(vc.proof.as_list()[0].proof_value, signed.signature);
        assert_eq!(signed.verification_method, "did:web:issuer#issuer");
    }

    #[tokio::test]
    async fn unknown_alias_is_rejected() {
        let mut req = request(CredentialFormat::Vc10Jwt);
        req.key_alias = "missing".into();
        assert_eq!(
            signer().sign(req).await.unwrap_err(),
            SigningError::UnknownKey("missing".into())
        );
    }

    #[tokio::test]
    async fn existing_subject_id_is_kept() {
        let mut req = request(CredentialFormat::JsonLd);
        req.claims = json!({"credentialSubject": {"id": "urn:member:42"}});
        let signed = signer().sign(req).await.unwrap();
        assert_eq!(signed.credential["credentialSubject"]["id"], "urn:member:42");
    }

    #[tokio::test]
    async fn invalid_claims_are_rejected() {
        let mut req = request(CredentialFormat::Vc10Jwt);
        req.claims = json!(["not", "an", "object"]);
        assert!(matches!(
            signer().sign(req).await,
            Err(SigningError::InvalidInput(_))
        ));

        let mut req = request(CredentialFormat::Vc10Jwt);
        req.claims = json!({"evidence": {}});
        assert!(matches!(
            signer().sign(req).await,
            Err(SigningError::InvalidInput(_))
        ));

        let mut req = request(CredentialFormat::Vc10Jwt);
        req.validity_seconds = 0;
        assert!(matches!(
            signer().sign(req).await,
            Err(SigningError::InvalidInput(_))
        ));
    }
}
