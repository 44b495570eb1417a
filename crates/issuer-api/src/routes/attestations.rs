//! # Attestation Definitions
//!
//! Admin endpoints registering where evidence about holders comes from.
//! `attestationType` selects the source: `demo` returns a fixed record,
//! `database` looks a row up in a registered data source. Deleting a
//! definition still referenced by a credential definition is a 409.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use issuer_core::DefinitionId;
use issuer_engine::{AttestationDefinition, SourceConfig};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::issuing_context;
use crate::state::AppState;

const ATTESTATION_TYPES: [&str; 2] = ["demo", "database"];

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// Wire form of an attestation definition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationDefinitionBody {
    pub id: String,
    /// `demo` or `database`.
    pub attestation_type: String,
    /// `{"record": {...}}` for `demo`; `tableName`, `dataSourceName`,
    /// `idColumn` and optional `orderBy` for `database`.
    #[schema(value_type = Object)]
    pub configuration: serde_json::Value,
}

impl Validate for AttestationDefinitionBody {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_string());
        }
        if !ATTESTATION_TYPES.contains(&self.attestation_type.as_str()) {
            return Err(format!(
                "attestationType must be one of {}, got {:?}",
                ATTESTATION_TYPES.join(", "),
                self.attestation_type
            ));
        }
        if !self.configuration.is_object() {
            return Err("configuration must be an object".to_string());
        }
        Ok(())
    }
}

impl TryFrom<AttestationDefinitionBody> for AttestationDefinition {
    type Error = AppError;

    fn try_from(body: AttestationDefinitionBody) -> Result<Self, Self::Error> {
        let source: SourceConfig = serde_json::from_value(json!({
            "attestationType": body.attestation_type,
            "configuration": body.configuration,
        }))
        .map_err(|e| AppError::Validation(format!("invalid configuration: {e}")))?;

        Ok(AttestationDefinition {
            id: DefinitionId::new(body.id)?,
            source,
        })
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/v1alpha/participants/:context/attestations",
            get(list_attestations).post(create_attestation),
        )
        .route(
            "/api/admin/v1alpha/participants/:context/attestations/:id",
            get(get_attestation).delete(delete_attestation),
        )
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /api/admin/v1alpha/participants/:context/attestations
#[utoipa::path(
    post,
    path = "/api/admin/v1alpha/participants/{context}/attestations",
    params(("context" = String, Path, description = "Issuing context")),
    request_body = AttestationDefinitionBody,
    responses(
        (status = 201, description = "Attestation definition registered", body = AttestationDefinitionBody),
        (status = 409, description = "Id already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid definition or unknown data source", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_attestation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
    body: Result<Json<AttestationDefinitionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AttestationDefinition>), AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let definition = AttestationDefinition::try_from(extract_validated_json(body)?)?;
    state
        .engine
        .register_attestation_definition(&context, definition.clone())?;
    Ok((StatusCode::CREATED, Json(definition)))
}

/// GET /api/admin/v1alpha/participants/:context/attestations
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/attestations",
    params(("context" = String, Path, description = "Issuing context")),
    responses((status = 200, description = "Attestation definitions", body = Vec<AttestationDefinitionBody>)),
    tag = "admin"
)]
async fn list_attestations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
) -> Result<Json<Vec<AttestationDefinition>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    Ok(Json(state.engine.attestation_definitions(&context)))
}

/// GET /api/admin/v1alpha/participants/:context/attestations/:id
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/attestations/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Attestation definition id"),
    ),
    responses(
        (status = 200, description = "Attestation definition", body = AttestationDefinitionBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn get_attestation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<Json<AttestationDefinition>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let definition = state
        .engine
        .attestation_definition(&context, &DefinitionId::new(id)?)?;
    Ok(Json(definition))
}

/// DELETE /api/admin/v1alpha/participants/:context/attestations/:id
#[utoipa::path(
    delete,
    path = "/api/admin/v1alpha/participants/{context}/attestations/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Attestation definition id"),
    ),
    responses(
        (status = 204, description = "Attestation definition removed"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Still referenced by a credential definition", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_attestation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    state
        .engine
        .delete_attestation_definition(&context, &DefinitionId::new(id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
