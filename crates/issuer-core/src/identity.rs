//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the issuer handles. These prevent
//! accidental identifier confusion: a `HolderId` cannot be passed where a
//! `DefinitionId` is expected, and an issuing context is threaded explicitly
//! through every registry call instead of living in a global.
//!
//! String-backed identifiers validate on construction and on
//! deserialization (`#[serde(try_from = "String")]`), so an invalid value
//! never reaches the engine through a request body or a seed file.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Defines a validated, string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal, $validate:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                $validate($field, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// The participant context under which definitions and holders are
    /// registered (e.g. `issuer`, or a URL-encoded DID).
    IssuingContext,
    "issuing_context",
    validate_context
);

string_id!(
    /// Opaque holder identifier, unique within an issuing context.
    HolderId,
    "holder_id",
    validate_holder
);

string_id!(
    /// Identifier of an attestation or credential definition.
    DefinitionId,
    "definition_id",
    validate_definition
);

string_id!(
    /// A decentralized identifier of the form `did:<method>:<method-specific-id>`.
    Did,
    "did",
    validate_did
);

impl Did {
    /// The DID method (`web` for `did:web:example.com`).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }
}

const MAX_CONTEXT_LEN: usize = 128;
const MAX_HOLDER_LEN: usize = 512;
const MAX_DEFINITION_LEN: usize = 128;
const MAX_DID_LEN: usize = 2048;

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn require_max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

fn require_charset(
    field: &'static str,
    value: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<(), ValidationError> {
    if let Some(bad) = value.chars().find(|c| !allowed(*c)) {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("character {bad:?} is not permitted"),
        });
    }
    Ok(())
}

fn validate_context(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    require_max_len(field, value, MAX_CONTEXT_LEN)?;
    require_charset(field, value, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '%')
    })
}

fn validate_holder(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    require_max_len(field, value, MAX_HOLDER_LEN)?;
    require_charset(field, value, |c| !c.is_whitespace() && !c.is_control())
}

fn validate_definition(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    require_max_len(field, value, MAX_DEFINITION_LEN)?;
    require_charset(field, value, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
    })
}

fn validate_did(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    require_max_len(field, value, MAX_DID_LEN)?;
    require_charset(field, value, |c| !c.is_whitespace() && !c.is_control())?;

    let mut parts = value.splitn(3, ':');
    let scheme = parts.next().unwrap_or_default();
    let method = parts.next().unwrap_or_default();
    let specific = parts.next().unwrap_or_default();

    if scheme != "did" {
        return Err(ValidationError::Invalid {
            field,
            reason: "must start with \"did:\"".into(),
        });
    }
    if method.is_empty()
        || !method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("invalid DID method {method:?}"),
        });
    }
    if specific.is_empty() {
        return Err(ValidationError::Invalid {
            field,
            reason: "missing method-specific identifier".into(),
        });
    }
    Ok(())
}

// -- RequestId -------------------------------------------------------------

/// Identifier of an issuance request, returned to the caller on submission
/// and used to poll status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for RequestId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::Invalid {
                field: "request_id",
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_accepts_plain_and_encoded_did() {
        assert!(IssuingContext::new("issuer").is_ok());
        assert!(IssuingContext::new("did%3Aweb%3Aissuer-service%3Aissuer").is_ok());
        assert!(IssuingContext::new("did:web:issuer").is_ok());
    }

    #[test]
    fn context_rejects_empty_and_slashes() {
        assert_eq!(
            IssuingContext::new("  "),
            Err(ValidationError::Empty {
                field: "issuing_context"
            })
        );
        assert!(IssuingContext::new("a/b").is_err());
    }

    #[test]
    fn holder_rejects_whitespace() {
        assert!(HolderId::new("did:web:example:consumer").is_ok());
        assert!(HolderId::new("holder one").is_err());
        assert!(HolderId::new("").is_err());
    }

    #[test]
    fn holder_rejects_overlong_values() {
        let err = HolderId::new("h".repeat(513)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 512, actual: 513, .. }));
    }

    #[test]
    fn definition_id_charset() {
        assert!(DefinitionId::new("db-membership").is_ok());
        assert!(DefinitionId::new("membership_cred.v2").is_ok());
        assert!(DefinitionId::new("membership cred").is_err());
        assert!(DefinitionId::new("cred:1").is_err());
    }

    #[test]
    fn did_parsing() {
        let did = Did::new("did:web:example:consumer").unwrap();
        assert_eq!(did.method(), "web");
        assert!(Did::new("web:example").is_err());
        assert!(Did::new("did:web").is_err());
        assert!(Did::new("did::x").is_err());
        assert!(Did::new("did:WEB:x").is_err());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: DefinitionId = serde_json::from_str("\"membership-cred\"").unwrap();
        assert_eq!(ok, "membership-cred");
        let bad: Result<DefinitionId, _> = serde_json::from_str("\"has space\"");
        assert!(bad.is_err());
    }

    #[test]
    fn serde_serializes_as_plain_string() {
        let id = HolderId::new("did:web:example:consumer").unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"did:web:example:consumer\""
        );
    }

    #[test]
    fn request_id_roundtrips_through_display() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RequestId>().is_err());
    }
}
