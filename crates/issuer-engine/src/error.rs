//! Errors returned synchronously by the engine facade.
//!
//! Failures that happen after a request was accepted are not errors of the
//! call; they are recorded on the sub-request as a
//! [`FailureReason`](issuer_state::FailureReason).

use thiserror::Error;

use issuer_core::{RequestId, ValidationError};

use crate::registry::RegistryError;
use crate::status::StatusError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Conflict, not-found, unknown-attestation and referenced-attestation
    /// errors from the registries.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A queryable attestation names a data source the engine lacks.
    #[error("unknown data source {0:?}")]
    UnknownDataSource(String),

    /// The holder is not registered and the engine requires registration.
    #[error("holder {holder} is not registered in context {context}")]
    UnknownHolder { context: String, holder: String },

    #[error("issuance request {0} not found")]
    RequestNotFound(RequestId),

    /// Waiting for a request to finish ran out of time.
    #[error("issuance request {0} still pending")]
    StillPending(RequestId),

    /// Internal failure (no async runtime, store inconsistency).
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl From<StatusError> for EngineError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::RequestNotFound(id) => Self::RequestNotFound(id),
            other => Self::Internal(other.to_string()),
        }
    }
}
