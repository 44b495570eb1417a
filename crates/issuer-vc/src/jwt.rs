//! # VC-JWT Encoding
//!
//! `VC1_0_JWT` credentials follow the VC Data Model 1.0 JWT mapping: the
//! unsigned credential travels in the `vc` claim and the registered claims
//! mirror its envelope.
//!
//! | JWT claim | Source                          |
//! |-----------|---------------------------------|
//! | `iss`     | `issuer`                        |
//! | `sub`     | `credentialSubject.id`          |
//! | `jti`     | `id`                            |
//! | `nbf`/`iat` | `issuanceDate` (epoch seconds) |
//! | `exp`     | `expirationDate` (epoch seconds) |
//!
//! The header is `{"alg":"EdDSA","kid":<verification method>,"typ":"JWT"}`.

use serde::{Deserialize, Serialize};

use issuer_core::{CanonicalBytes, Timestamp};
use issuer_crypto::jws::ALG_EDDSA;
use issuer_crypto::{CompactJws, JwsSigningInput, SigningKey, VerifyingKey};

use crate::credential::{VcError, VerifiableCredential};

/// Registered and private claims of a VC-JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcJwtClaims {
    /// Issuer DID.
    pub iss: String,
    /// Subject identifier, when the credential subject has an `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Credential identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Not-before, epoch seconds.
    pub nbf: i64,
    /// Expiry, epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// The unsigned credential.
    pub vc: serde_json::Value,
}

impl VcJwtClaims {
    /// Derive the JWT claims from an (unsigned) credential.
    pub fn from_credential(vc: &VerifiableCredential) -> Result<Self, VcError> {
        let mut body = serde_json::to_value(vc)?;
        if let Some(obj) = body.as_object_mut() {
            obj.remove("proof");
        }
        Ok(Self {
            iss: vc.issuer.clone(),
            sub: vc
                .credential_subject
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            jti: vc.id.clone(),
            iat: vc.issuance_date.timestamp(),
            nbf: vc.issuance_date.timestamp(),
            exp: vc.expiration_date.map(|d| d.timestamp()),
            vc: body,
        })
    }
}

/// Encode and sign a credential as a compact VC-JWT.
pub fn encode(
    vc: &VerifiableCredential,
    signing_key: &SigningKey,
    key_id: &str,
) -> Result<String, VcError> {
    let claims = VcJwtClaims::from_credential(vc)?;
    let header = CanonicalBytes::new(&serde_json::json!({
        "alg": ALG_EDDSA,
        "typ": "JWT",
        "kid": key_id,
    }))?;
    let payload = CanonicalBytes::new(&claims)?;
    let input = JwsSigningInput::new(&header, &payload);
    let signature = signing_key.sign(&input);
    Ok(input.into_compact(&signature))
}

/// A parsed VC-JWT whose signature has not yet been checked.
#[derive(Debug, Clone)]
pub struct VcJwt {
    /// The decoded JWS.
    pub jws: CompactJws,
    /// The decoded claims.
    pub claims: VcJwtClaims,
}

impl VcJwt {
    /// Parse a compact token.
    pub fn parse(token: &str) -> Result<Self, VcError> {
        let jws = CompactJws::parse(token)?;
        let claims: VcJwtClaims = serde_json::from_value(jws.payload.clone())?;
        Ok(Self { jws, claims })
    }

    /// Key id (`kid`) from the header.
    pub fn key_id(&self) -> Option<&str> {
        self.jws.key_id()
    }

    /// Verify the signature and the validity window as of `now`.
    pub fn verify_at(&self, key: &VerifyingKey, now: Timestamp) -> Result<(), VcError> {
        self.jws
            .verify(key)
            .map_err(|e| VcError::VerificationFailed(e.to_string()))?;

        let now = now.epoch_secs();
        if self.claims.nbf > now {
            return Err(VcError::VerificationFailed(format!(
                "credential not valid before epoch {}",
                self.claims.nbf
            )));
        }
        if let Some(exp) = self.claims.exp {
            if exp <= now {
                return Err(VcError::VerificationFailed(format!(
                    "credential expired at epoch {exp}"
                )));
            }
        }
        Ok(())
    }

    /// The embedded credential.
    pub fn credential(&self) -> Result<VerifiableCredential, VcError> {
        Ok(serde_json::from_value(self.claims.vc.clone())?)
    }
}
