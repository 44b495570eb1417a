//! Structured failure reasons for issuance sub-requests.
//!
//! Serialized with an explicit `code` discriminator so pollers can branch
//! without parsing messages:
//!
//! ```json
//! {"code": "ATTESTATION_UNAVAILABLE", "attestationId": "membership", "detail": "no record"}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a sub-request ended in FAILED.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "code",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum FailureReason {
    /// One or more credential definition ids do not exist in the context.
    #[error("unknown credential definition(s): {}", .missing.join(", "))]
    UnknownCredentialDefinition {
        /// The ids that could not be resolved.
        missing: Vec<String>,
    },

    /// A required attestation could not be resolved for the holder.
    #[error("attestation {attestation_id} unavailable: {detail}")]
    AttestationUnavailable {
        attestation_id: String,
        detail: String,
    },

    /// A required field was absent from the attestation data.
    #[error("mapping failed: required field {field} missing")]
    MappingFailed {
        /// The input path that could not be resolved.
        field: String,
        /// The attestation the field was read from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attestation_id: Option<String>,
    },

    /// The signing boundary rejected the request, errored or timed out.
    #[error("signing failed: {detail}")]
    SigningFailed { detail: String },
}

impl FailureReason {
    /// The wire discriminator, e.g. `MAPPING_FAILED`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCredentialDefinition { .. } => "UNKNOWN_CREDENTIAL_DEFINITION",
            Self::AttestationUnavailable { .. } => "ATTESTATION_UNAVAILABLE",
            Self::MappingFailed { .. } => "MAPPING_FAILED",
            Self::SigningFailed { .. } => "SIGNING_FAILED",
        }
    }
}
