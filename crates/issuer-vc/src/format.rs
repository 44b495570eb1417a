//! Output formats a credential definition may request.

use serde::{Deserialize, Serialize};

/// Serialization and proof format of an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CredentialFormat {
    /// W3C VC Data Model 1.0 secured as a compact JWS (VC-JWT).
    #[default]
    #[serde(rename = "VC1_0_JWT")]
    Vc10Jwt,
    /// W3C VC Data Model 1.0 with an embedded Ed25519 linked-data proof.
    #[serde(rename = "JSON_LD")]
    JsonLd,
}

impl CredentialFormat {
    /// Wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vc10Jwt => "VC1_0_JWT",
            Self::JsonLd => "JSON_LD",
        }
    }
}

impl std::fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
