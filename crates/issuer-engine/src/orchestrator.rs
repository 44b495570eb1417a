//! # Issuance Orchestrator
//!
//! Drives accepted requests from PENDING to a terminal state. Submission is
//! synchronous and cheap: the request and its sub-requests are stored as
//! PENDING and a background task is spawned. Each sub-request then runs
//!
//! 1. attestation resolution, one source per required attestation, each
//!    bounded by `attestation_timeout`;
//! 2. the mapping engine;
//! 3. the signing boundary, bounded by `signing_timeout` and never retried;
//! 4. an atomic commit of the credential and the ISSUED transition.
//!
//! Any step may end the sub-request in FAILED with a [`FailureReason`].
//! Sub-requests of all requests share one semaphore, so at most
//! `max_concurrent_issuances` are in flight at once. A sub-request that
//! panics is recorded as failed rather than left pending, with the reason
//! of the step it was in.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use uuid::Uuid;

use issuer_core::{sha256_hex, CanonicalBytes, DefinitionId, HolderId, RequestId, Timestamp};
use issuer_state::{FailureReason, IssuanceMode, IssuanceState};
use issuer_vc::{CredentialSigner, SigningRequest};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lookup::DataSources;
use crate::mapping::{self, MappingError};
use crate::model::{AttestationDefinition, IssuanceRequest, CREDENTIAL_SUBJECT};
use crate::registry::ResolvedDefinition;
use crate::source::{source_for, AttestationRecord};
use crate::status::{
    IssuanceRecord, IssuanceStatus, IssuanceStore, IssuedCredential, PurgeSummary,
    SubRequestOutcome,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Step a sub-request worker last entered. Read back when the worker
/// panics, so the failure is charged to the step that broke.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Queued,
    Resolving(DefinitionId),
    Mapping,
    Signing,
}

impl Stage {
    fn aborted(&self, cause: &str) -> FailureReason {
        match self {
            Self::Resolving(attestation_id) => FailureReason::AttestationUnavailable {
                attestation_id: attestation_id.to_string(),
                detail: format!("attestation resolution aborted: {cause}"),
            },
            Self::Queued | Self::Mapping => FailureReason::MappingFailed {
                field: CREDENTIAL_SUBJECT.to_string(),
                attestation_id: None,
            },
            Self::Signing => FailureReason::SigningFailed {
                detail: format!("signing aborted: {cause}"),
            },
        }
    }
}

struct Shared {
    data_sources: Arc<DataSources>,
    signer: Arc<dyn CredentialSigner>,
    store: IssuanceStore,
    config: EngineConfig,
    permits: Arc<Semaphore>,
}

/// Runs issuance requests in the background and records their outcome.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("data_sources", &self.shared.data_sources)
            .field("requests", &self.shared.store.len())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        data_sources: Arc<DataSources>,
        signer: Arc<dyn CredentialSigner>,
        config: EngineConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.permits()));
        Self {
            shared: Arc::new(Shared {
                data_sources,
                signer,
                store: IssuanceStore::new(),
                config,
                permits,
            }),
        }
    }

    pub fn store(&self) -> &IssuanceStore {
        &self.shared.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Accept a request and start working on it.
    ///
    /// `resolved` holds one entry per definition id of the request, `None`
    /// for ids that are not registered. `subject` becomes the credential
    /// subject id. Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        request: IssuanceRequest,
        resolved: Vec<Option<ResolvedDefinition>>,
        subject: String,
    ) -> Result<RequestId, EngineError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::Internal(format!("no async runtime: {e}")))?;
        if resolved.len() != request.credential_definition_ids.len() {
            return Err(EngineError::Internal(
                "resolved definitions do not match the request".into(),
            ));
        }

        let id = request.id;
        let mut record = IssuanceRecord::new(request.clone());
        let missing: Vec<String> = request
            .credential_definition_ids
            .iter()
            .zip(&resolved)
            .filter(|(_, r)| r.is_none())
            .map(|(def, _)| def.to_string())
            .collect();

        tracing::info!(
            request_id = %id,
            context = %request.issuing_context,
            holder_id = %request.holder_id,
            mode = %request.mode,
            definitions = request.credential_definition_ids.len(),
            "issuance request accepted"
        );

        if !missing.is_empty() && request.mode == IssuanceMode::FailFast {
            let reason = FailureReason::UnknownCredentialDefinition { missing };
            for sub in &mut record.sub_requests {
                sub.lifecycle
                    .fail(reason.clone())
                    .map_err(|e| EngineError::Internal(e.to_string()))?;
            }
            tracing::warn!(request_id = %id, reason = %reason, "issuance request failed fast");
            self.shared.store.insert(record);
            return Ok(id);
        }

        let mut work = Vec::new();
        for (index, (sub, resolved)) in record.sub_requests.iter_mut().zip(resolved).enumerate() {
            match resolved {
                Some(definition) => work.push((index, definition)),
                None => {
                    let reason = FailureReason::UnknownCredentialDefinition {
                        missing: vec![sub.definition_id.to_string()],
                    };
                    tracing::warn!(
                        request_id = %id,
                        definition_id = %sub.definition_id,
                        reason = %reason,
                        "sub-request failed"
                    );
                    sub.lifecycle
                        .fail(reason)
                        .map_err(|e| EngineError::Internal(e.to_string()))?;
                }
            }
        }
        self.shared.store.insert(record);

        if !work.is_empty() {
            let subject: Arc<str> = Arc::from(subject);
            runtime.spawn(run(
                Arc::clone(&self.shared),
                Arc::new(request),
                subject,
                work,
            ));
        }
        Ok(id)
    }

    pub fn status(&self, id: &RequestId) -> Result<IssuanceStatus, EngineError> {
        Ok(self.shared.store.status(id)?)
    }

    /// Drop stored credentials whose expiry is at or before `now`, and
    /// requests with nothing left to report.
    pub fn purge_expired(&self, now: Timestamp) -> PurgeSummary {
        let summary = self
            .shared
            .store
            .purge_expired(now, self.shared.config.failed_request_retention);
        if !summary.is_empty() {
            tracing::info!(
                credentials = summary.credentials,
                requests = summary.requests,
                "purged expired issuance state"
            );
        }
        summary
    }

    /// Poll until the request leaves PENDING or `limit` elapses.
    pub async fn wait_for_completion(
        &self,
        id: &RequestId,
        limit: Duration,
    ) -> Result<IssuanceStatus, EngineError> {
        let poll = async {
            loop {
                let status = self.status(id)?;
                if status.status != IssuanceState::Pending {
                    return Ok(status);
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        timeout(limit, poll)
            .await
            .unwrap_or(Err(EngineError::StillPending(*id)))
    }
}

async fn run(
    shared: Arc<Shared>,
    request: Arc<IssuanceRequest>,
    subject: Arc<str>,
    work: Vec<(usize, ResolvedDefinition)>,
) {
    let mut tasks = JoinSet::new();
    for (index, resolved) in work {
        let shared = Arc::clone(&shared);
        let request = Arc::clone(&request);
        let subject = Arc::clone(&subject);
        tasks.spawn(async move {
            let progress = Arc::new(Mutex::new(Stage::Queued));
            let worker = tokio::spawn(process(
                Arc::clone(&shared),
                Arc::clone(&request),
                subject,
                resolved,
                Arc::clone(&progress),
            ));
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(progress.lock().aborted(&e.to_string())),
            };
            commit(&shared, &request, index, outcome);
        });
    }
    while tasks.join_next().await.is_some() {}

    match shared.store.status(&request.id) {
        Ok(status) => tracing::info!(
            request_id = %request.id,
            status = %status.status,
            issued = status.issued_credentials.len(),
            failed = status.failures.len(),
            "issuance request finished"
        ),
        Err(e) => tracing::error!(request_id = %request.id, error = %e, "issuance record vanished"),
    }
}

fn commit(shared: &Shared, request: &IssuanceRequest, index: usize, outcome: SubRequestOutcome) {
    let definition_id = request
        .credential_definition_ids
        .get(index)
        .map(ToString::to_string)
        .unwrap_or_default();
    if let Err(reason) = &outcome {
        tracing::warn!(
            request_id = %request.id,
            definition_id = %definition_id,
            code = reason.code(),
            reason = %reason,
            "sub-request failed"
        );
    }
    match shared.store.complete(&request.id, index, outcome) {
        Ok(overall) => tracing::debug!(
            request_id = %request.id,
            definition_id = %definition_id,
            overall = %overall,
            "sub-request completed"
        ),
        Err(e) => tracing::error!(
            request_id = %request.id,
            definition_id = %definition_id,
            error = %e,
            "could not record sub-request outcome"
        ),
    }
}

async fn process(
    shared: Arc<Shared>,
    request: Arc<IssuanceRequest>,
    subject: Arc<str>,
    resolved: ResolvedDefinition,
    progress: Arc<Mutex<Stage>>,
) -> SubRequestOutcome {
    let _permit = Arc::clone(&shared.permits)
        .acquire_owned()
        .await
        .map_err(|_| FailureReason::SigningFailed {
            detail: "issuance engine is shutting down".into(),
        })?;
    let definition = &resolved.definition;

    let mut records = BTreeMap::new();
    for attestation_id in &definition.required_attestation_ids {
        *progress.lock() = Stage::Resolving(attestation_id.clone());
        let record = resolve_attestation(
            &shared,
            &request.holder_id,
            attestation_id,
            resolved.attestations.get(attestation_id),
        )
        .await?;
        records.insert(attestation_id.clone(), record);
    }

    *progress.lock() = Stage::Mapping;
    let claims = mapping::apply(
        &definition.mappings,
        &definition.required_attestation_ids,
        &records,
    )
    .map_err(mapping_failure)?;
    let claims = Value::Object(claims);
    let claims_digest = CanonicalBytes::new(&claims)
        .map(|bytes| sha256_hex(&bytes))
        .map_err(|_| FailureReason::MappingFailed {
            field: CREDENTIAL_SUBJECT.to_string(),
            attestation_id: None,
        })?;

    let signing = SigningRequest {
        credential_id: format!("urn:uuid:{}", Uuid::new_v4()),
        claims: claims.clone(),
        credential_type: definition.credential_type.clone(),
        issuer: request.issuer_id.to_string(),
        subject: Some(subject.to_string()),
        validity_seconds: definition.validity_seconds,
        key_alias: definition
            .key_alias
            .clone()
            .unwrap_or_else(|| shared.config.default_key_alias.clone()),
        format: definition.format,
    };
    *progress.lock() = Stage::Signing;
    let signing_timeout = shared.config.signing_timeout;
    let signed = match timeout(signing_timeout, shared.signer.sign(signing)).await {
        Ok(Ok(signed)) => signed,
        Ok(Err(e)) => {
            return Err(FailureReason::SigningFailed {
                detail: e.to_string(),
            })
        }
        Err(_) => {
            return Err(FailureReason::SigningFailed {
                detail: format!(
                    "signer did not answer within {} ms",
                    signing_timeout.as_millis()
                ),
            })
        }
    };

    Ok(IssuedCredential {
        request_id: request.id,
        definition_id: definition.id.clone(),
        credential_type: definition.credential_type.clone(),
        format: signed.format,
        claims,
        claims_digest,
        credential: signed.credential,
        signature: signed.signature,
        verification_method: signed.verification_method,
        issued_at: signed.issued_at,
        expires_at: signed.expires_at,
    })
}

async fn resolve_attestation(
    shared: &Shared,
    holder: &HolderId,
    attestation_id: &DefinitionId,
    definition: Option<&AttestationDefinition>,
) -> Result<AttestationRecord, FailureReason> {
    let unavailable = |detail: String| FailureReason::AttestationUnavailable {
        attestation_id: attestation_id.to_string(),
        detail,
    };
    let definition =
        definition.ok_or_else(|| unavailable("attestation definition is not registered".into()))?;
    let source = source_for(&definition.source, &shared.data_sources)
        .map_err(|e| unavailable(e.to_string()))?;

    let limit = shared.config.attestation_timeout;
    match timeout(limit, source.resolve(holder)).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(e)) => Err(unavailable(e.to_string())),
        Err(_) => Err(unavailable(format!(
            "{} source did not answer within {} ms",
            definition.source.kind(),
            limit.as_millis()
        ))),
    }
}

fn mapping_failure(err: MappingError) -> FailureReason {
    match err {
        MappingError::MissingField { field, attestation } => FailureReason::MappingFailed {
            field,
            attestation_id: Some(attestation),
        },
        MappingError::MissingRecord { attestation } => FailureReason::AttestationUnavailable {
            attestation_id: attestation,
            detail: "no record was resolved".into(),
        },
        MappingError::NoSource { field } => FailureReason::MappingFailed {
            field,
            attestation_id: None,
        },
        MappingError::OutputConflict { path } => FailureReason::MappingFailed {
            field: path,
            attestation_id: None,
        },
    }
}
