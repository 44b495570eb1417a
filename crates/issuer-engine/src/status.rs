//! # Issuance Status Store
//!
//! Holds every accepted request together with its sub-requests and the
//! credentials they produced. A sub-request's terminal transition and the
//! storage of its credential happen inside one `try_update`, so a poller
//! sees either PENDING without a credential or ISSUED with one, never a
//! mix.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use issuer_core::{DefinitionId, RequestId, Timestamp};
use issuer_state::{
    overall_status, FailureReason, IssuanceState, SubRequestLifecycle, TransitionError,
};
use issuer_vc::CredentialFormat;

use crate::model::IssuanceRequest;
use crate::store::Store;

/// A credential produced for one (request, definition) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredential {
    pub request_id: RequestId,
    pub definition_id: DefinitionId,
    pub credential_type: String,
    pub format: CredentialFormat,
    /// The mapped claim set that was signed.
    pub claims: Value,
    /// SHA-256 of the canonical claim set, hex.
    pub claims_digest: String,
    /// VC-JWT string or JSON-LD object.
    pub credential: Value,
    pub signature: String,
    pub verification_method: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// One credential definition within a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequest {
    pub definition_id: DefinitionId,
    #[serde(flatten)]
    pub lifecycle: SubRequestLifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<IssuedCredential>,
}

impl SubRequest {
    pub fn new(definition_id: DefinitionId) -> Self {
        Self {
            definition_id,
            lifecycle: SubRequestLifecycle::new(),
            credential: None,
        }
    }

    pub fn state(&self) -> IssuanceState {
        self.lifecycle.state()
    }
}

/// A request and the progress of each of its sub-requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRecord {
    pub request: IssuanceRequest,
    pub sub_requests: Vec<SubRequest>,
    pub updated_at: Timestamp,
}

impl IssuanceRecord {
    pub fn new(request: IssuanceRequest) -> Self {
        let sub_requests = request
            .credential_definition_ids
            .iter()
            .cloned()
            .map(SubRequest::new)
            .collect();
        Self {
            updated_at: request.created_at,
            request,
            sub_requests,
        }
    }

    pub fn status(&self) -> IssuanceState {
        overall_status(self.sub_requests.iter().map(SubRequest::state))
    }

    /// Every sub-request is terminal and no credential is retained, and
    /// either one was issued and has since expired or a failed request
    /// outlived `failed_retention`.
    fn is_exhausted(&self, now: Timestamp, failed_retention: Duration) -> bool {
        let settled = self
            .sub_requests
            .iter()
            .all(|s| s.state().is_terminal() && s.credential.is_none());
        if !settled {
            return false;
        }
        let issued_any = self
            .sub_requests
            .iter()
            .any(|s| s.state() == IssuanceState::Issued);
        issued_any
            || self
                .updated_at
                .checked_add_secs(failed_retention.as_secs())
                .is_some_and(|until| until <= now)
    }
}

/// A failed sub-request as reported to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestFailure {
    pub definition_id: DefinitionId,
    pub reason: FailureReason,
}

/// Per-definition status line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestStatus {
    pub definition_id: DefinitionId,
    pub status: IssuanceState,
}

/// Poll result for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceStatus {
    pub request_id: RequestId,
    pub status: IssuanceState,
    pub request: IssuanceRequest,
    pub sub_requests: Vec<SubRequestStatus>,
    pub issued_credentials: Vec<IssuedCredential>,
    pub failures: Vec<SubRequestFailure>,
    pub updated_at: Timestamp,
}

impl From<&IssuanceRecord> for IssuanceStatus {
    fn from(record: &IssuanceRecord) -> Self {
        Self {
            request_id: record.request.id,
            status: record.status(),
            request: record.request.clone(),
            sub_requests: record
                .sub_requests
                .iter()
                .map(|s| SubRequestStatus {
                    definition_id: s.definition_id.clone(),
                    status: s.state(),
                })
                .collect(),
            issued_credentials: record
                .sub_requests
                .iter()
                .filter_map(|s| s.credential.clone())
                .collect(),
            failures: record
                .sub_requests
                .iter()
                .filter_map(|s| {
                    s.lifecycle.failure().map(|reason| SubRequestFailure {
                        definition_id: s.definition_id.clone(),
                        reason: reason.clone(),
                    })
                })
                .collect(),
            updated_at: record.updated_at,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("issuance request {0} not found")]
    RequestNotFound(RequestId),

    #[error("request {request} has no sub-request {index}")]
    SubRequestNotFound { request: RequestId, index: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Outcome of one sub-request.
pub type SubRequestOutcome = Result<IssuedCredential, FailureReason>;

/// Thread-safe store of issuance records.
#[derive(Debug, Clone, Default)]
pub struct IssuanceStore {
    records: Store<IssuanceRecord>,
}

impl IssuanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: IssuanceRecord) {
        self.records.insert(record.request.id.0, record);
    }

    pub fn get(&self, id: &RequestId) -> Option<IssuanceRecord> {
        self.records.get(id.as_uuid())
    }

    pub fn status(&self, id: &RequestId) -> Result<IssuanceStatus, StatusError> {
        self.get(id)
            .map(|record| IssuanceStatus::from(&record))
            .ok_or(StatusError::RequestNotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record the terminal outcome of a sub-request and return the
    /// request's overall status afterwards.
    ///
    /// The transition and the credential are written under one lock. A
    /// sub-request that is already terminal is left untouched.
    pub fn complete(
        &self,
        id: &RequestId,
        index: usize,
        outcome: SubRequestOutcome,
    ) -> Result<IssuanceState, StatusError> {
        self.records
            .try_update(id.as_uuid(), |record| -> Result<IssuanceState, StatusError> {
                let sub = record
                    .sub_requests
                    .get_mut(index)
                    .ok_or(StatusError::SubRequestNotFound {
                        request: *id,
                        index,
                    })?;
                match outcome {
                    Ok(credential) => {
                        sub.lifecycle.issue()?;
                        sub.credential = Some(credential);
                    }
                    Err(reason) => sub.lifecycle.fail(reason)?,
                }
                record.updated_at = Timestamp::now();
                Ok(record.status())
            })
            .unwrap_or(Err(StatusError::RequestNotFound(*id)))
    }

    /// Drop stored credentials whose validity window has ended at `now`,
    /// then drop requests with nothing left to report.
    ///
    /// A request is dropped once every sub-request is terminal and none
    /// still holds a credential: at once if it issued anything (its last
    /// credential just expired), otherwise `failed_retention` after its
    /// last update, so pollers can still read the failure reasons.
    pub fn purge_expired(&self, now: Timestamp, failed_retention: Duration) -> PurgeSummary {
        let mut credentials = 0;
        let requests = self.records.retain(|record| {
            for sub in &mut record.sub_requests {
                if sub.credential.as_ref().is_some_and(|c| c.expires_at <= now) {
                    sub.credential = None;
                    credentials += 1;
                }
            }
            !record.is_exhausted(now, failed_retention)
        });
        PurgeSummary {
            credentials,
            requests,
        }
    }
}

/// What a purge removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Credentials whose `expiresAt` had passed.
    pub credentials: usize,
    /// Requests dropped from the store.
    pub requests: usize,
}

impl PurgeSummary {
    pub fn is_empty(&self) -> bool {
        self.credentials == 0 && self.requests == 0
    }
}
