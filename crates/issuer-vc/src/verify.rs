//! Format-agnostic verification of an issued credential.
//!
//! A JSON string is treated as a VC-JWT; a JSON object as a JSON-LD
//! credential carrying Ed25519 proofs. Used by the CLI `verify` command and
//! by integration tests to check what the engine hands out.

use serde::Serialize;
use serde_json::Value;

use issuer_core::Timestamp;
use issuer_crypto::VerifyingKey;

use crate::credential::VcError;
use crate::format::CredentialFormat;
use crate::jwt::VcJwt;

/// Summary of a credential that passed verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCredential {
    pub format: CredentialFormat,
    pub issuer: String,
    pub types: Vec<String>,
    pub subject: Value,
    pub expires_at: Option<Timestamp>,
}

/// Verify `credential` against a single issuer key.
pub fn verify_credential(
    credential: &Value,
    key: &VerifyingKey,
) -> Result<VerifiedCredential, VcError> {
    match credential {
        Value::String(token) => {
            let jwt = VcJwt::parse(token)?;
            jwt.verify_at(key, Timestamp::now())?;
            let vc = jwt.credential()?;
            vc.validate_structure()?;
            if vc.issuer != jwt.claims.iss {
                return Err(VcError::Malformed(
                    "iss claim does not match credential issuer".into(),
                ));
            }
            Ok(VerifiedCredential {
                format: CredentialFormat::Vc10Jwt,
                issuer: vc.issuer,
                types: vc.credential_type.as_list().into_iter().map(str::to_string).collect(),
                subject: vc.credential_subject,
                expires_at: jwt
                    .claims
                    .exp
                    .and_then(|exp| Timestamp::from_epoch_secs(exp).ok()),
            })
        }
        Value::Object(_) => {
            let vc: crate::VerifiableCredential = serde_json::from_value(credential.clone())?;
            let key = *key;
            vc.verify_all(move |_: &str| Ok(key))?;
            Ok(VerifiedCredential {
                format: CredentialFormat::JsonLd,
                types: vc.credential_type.as_list().into_iter().map(str::to_string).collect(),
                expires_at: vc.expiration_date.map(Timestamp::from_utc),
                issuer: vc.issuer,
                subject: vc.credential_subject,
            })
        }
        _ => Err(VcError::Malformed(
            "credential must be a VC-JWT string or a JSON-LD object".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{CredentialSigner, Ed25519Signer, SigningRequest};
    use issuer_crypto::{KeyRing, SigningKey};
    use serde_json::json;
    use std::sync::Arc;

    async fn issue(format: CredentialFormat) -> (Value, VerifyingKey) {
        let key = SigningKey::from_bytes(&[21u8; 32]);
        let vk = key.verifying_key();
        let signer = Ed25519Signer::new(Arc::new(KeyRing::new().with_key("issuer", key)));
        let signed = signer
            .sign(SigningRequest {
                credential_id: "urn:uuid:9a0e7f3c-3c2b-4f53-9f0f-3d3c1e2a7b64".into(),
                claims: json!({"credentialSubject": {"membershipType": "FullMember"}}),
                credential_type: "MembershipCredential".into(),
                issuer: "did:web:issuer".into(),
                subject: Some("h1".into()),
                validity_seconds: 600,
                key_alias: "issuer".into(),
                format,
            })
            .await
            .unwrap();
        (signed.credential, vk)
    }

    #[tokio::test]
    async fn verifies_both_formats() {
        for format in [CredentialFormat::Vc10Jwt, CredentialFormat::JsonLd] {
            let (credential, vk) = issue(format).await;
            let verified = verify_credential(&credential, &vk).unwrap();
            assert_eq!(verified.format, format);
            assert_eq!(verified.issuer, "did:web:issuer");
            assert!(verified.types.contains(&"MembershipCredential".to_string()));
            assert_eq!(verified.subject["id"], "h1");
            assert!(verified.expires_at.is_some());
        }
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let other = SigningKey::from_bytes(&[22u8; 32]).verifying_key();
        for format in [CredentialFormat::Vc10Jwt, CredentialFormat::JsonLd] {
            let (credential, _) = issue(format).await;
            assert!(verify_credential(&credential, &other).is_err());
        }
    }

    #[test]
    fn non_credential_values_are_malformed() {
        let vk = SigningKey::from_bytes(&[1u8; 32]).verifying_key();
        assert!(matches!(
            verify_credential(&json!(42), &vk),
            Err(VcError::Malformed(_))
        ));
    }
}
