//! The engine facade: registries, data sources and the orchestrator behind
//! one handle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use issuer_core::{DefinitionId, HolderId, IssuingContext, RequestId, Timestamp};
use issuer_state::IssuanceMode;
use issuer_vc::CredentialSigner;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lookup::DataSources;
use crate::model::{
    AttestationDefinition, CredentialDefinition, Holder, IssuanceRequest, IssuanceSubmission,
    SourceConfig,
};
use crate::orchestrator::Orchestrator;
use crate::registry::Registry;
use crate::status::{IssuanceStatus, PurgeSummary};

/// Attestation-driven credential issuer.
///
/// Cheap to clone; clones share registries and request state.
#[derive(Debug, Clone)]
pub struct IssuerEngine {
    registry: Arc<Registry>,
    data_sources: Arc<DataSources>,
    orchestrator: Orchestrator,
}

impl IssuerEngine {
    pub fn new(
        data_sources: DataSources,
        signer: Arc<dyn CredentialSigner>,
        config: EngineConfig,
    ) -> Self {
        let data_sources = Arc::new(data_sources);
        Self {
            registry: Arc::new(Registry::new()),
            orchestrator: Orchestrator::new(Arc::clone(&data_sources), signer, config),
            data_sources,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.orchestrator.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn data_sources(&self) -> &DataSources {
        &self.data_sources
    }

    // ─── Holders ─────────────────────────────────────────────────────

    pub fn register_holder(
        &self,
        context: &IssuingContext,
        holder: Holder,
    ) -> Result<(), EngineError> {
        let holder_id = holder.holder_id.clone();
        self.registry.create_holder(context, holder)?;
        tracing::info!(context = %context, holder_id = %holder_id, "holder registered");
        Ok(())
    }

    pub fn holder(&self, context: &IssuingContext, id: &HolderId) -> Result<Holder, EngineError> {
        Ok(self.registry.holder(context, id)?)
    }

    pub fn holders(&self, context: &IssuingContext) -> Vec<Holder> {
        self.registry.holders(context)
    }

    pub fn delete_holder(&self, context: &IssuingContext, id: &HolderId) -> Result<(), EngineError> {
        Ok(self.registry.delete_holder(context, id)?)
    }

    // ─── Attestation Definitions ─────────────────────────────────────

    /// Register an attestation definition. Queryable definitions must
    /// name a data source the engine was built with.
    pub fn register_attestation_definition(
        &self,
        context: &IssuingContext,
        definition: AttestationDefinition,
    ) -> Result<(), EngineError> {
        if let SourceConfig::Queryable(query) = &definition.source {
            if !self.data_sources.contains(&query.data_source_name) {
                return Err(EngineError::UnknownDataSource(
                    query.data_source_name.clone(),
                ));
            }
        }
        let id = definition.id.clone();
        let kind = definition.source.kind();
        self.registry.create_attestation_definition(context, definition)?;
        tracing::info!(context = %context, attestation_id = %id, kind, "attestation definition registered");
        Ok(())
    }

    pub fn attestation_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<AttestationDefinition, EngineError> {
        Ok(self.registry.attestation_definition(context, id)?)
    }

    pub fn attestation_definitions(&self, context: &IssuingContext) -> Vec<AttestationDefinition> {
        self.registry.attestation_definitions(context)
    }

    pub fn delete_attestation_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<(), EngineError> {
        self.registry.delete_attestation_definition(context, id)?;
        tracing::info!(context = %context, attestation_id = %id, "attestation definition deleted");
        Ok(())
    }

    // ─── Credential Definitions ──────────────────────────────────────

    pub fn register_credential_definition(
        &self,
        context: &IssuingContext,
        definition: CredentialDefinition,
    ) -> Result<(), EngineError> {
        let id = definition.id.clone();
        self.registry.create_credential_definition(context, definition)?;
        tracing::info!(context = %context, definition_id = %id, "credential definition registered");
        Ok(())
    }

    pub fn credential_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<CredentialDefinition, EngineError> {
        Ok(self.registry.credential_definition(context, id)?)
    }

    pub fn credential_definitions(&self, context: &IssuingContext) -> Vec<CredentialDefinition> {
        self.registry.credential_definitions(context)
    }

    pub fn delete_credential_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<(), EngineError> {
        self.registry.delete_credential_definition(context, id)?;
        tracing::info!(context = %context, definition_id = %id, "credential definition deleted");
        Ok(())
    }

    // ─── Issuance ────────────────────────────────────────────────────

    /// Accept an issuance request and return its id immediately.
    ///
    /// Definitions are snapshotted at this point; later registry changes do
    /// not affect the request. Each definition id may appear only once. Unknown definition ids do not reject the
    /// call; the affected sub-requests are recorded as failed.
    pub fn request_issuance(&self, submission: IssuanceSubmission) -> Result<RequestId, EngineError> {
        if submission.definition_ids.is_empty() {
            return Err(issuer_core::ValidationError::Empty {
                field: "credentialDefinitionIds",
            }
            .into());
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = submission.definition_ids.iter().find(|id| !seen.insert(*id)) {
            return Err(issuer_core::ValidationError::Invalid {
                field: "credentialDefinitionIds",
                reason: format!("duplicate definition id {dup}"),
            }
            .into());
        }

        let subject = match self.registry.holder(&submission.context, &submission.holder_id) {
            Ok(holder) => holder.did.to_string(),
            Err(_) if self.config().require_registered_holder => {
                return Err(EngineError::UnknownHolder {
                    context: submission.context.to_string(),
                    holder: submission.holder_id.to_string(),
                })
            }
            Err(_) => submission.holder_id.to_string(),
        };

        let mode = submission.mode.unwrap_or(if self.config().independent_by_default {
            IssuanceMode::Independent
        } else {
            IssuanceMode::FailFast
        });
        let resolved = self
            .registry
            .resolve(&submission.context, &submission.definition_ids);
        let request = IssuanceRequest {
            id: RequestId::new(),
            issuing_context: submission.context,
            holder_id: submission.holder_id,
            issuer_id: submission.issuer,
            credential_definition_ids: submission.definition_ids,
            mode,
            created_at: Timestamp::now(),
        };
        self.orchestrator.start(request, resolved, subject)
    }

    pub fn issuance_status(&self, id: &RequestId) -> Result<IssuanceStatus, EngineError> {
        self.orchestrator.status(id)
    }

    pub async fn wait_for_completion(
        &self,
        id: &RequestId,
        limit: Duration,
    ) -> Result<IssuanceStatus, EngineError> {
        self.orchestrator.wait_for_completion(id, limit).await
    }

    pub fn purge_expired(&self, now: Timestamp) -> PurgeSummary {
        self.orchestrator.purge_expired(now)
    }

    /// Number of requests held in the status store.
    pub fn tracked_requests(&self) -> usize {
        self.orchestrator.store().len()
    }
}
