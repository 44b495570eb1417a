//! # Credential Definitions
//!
//! Admin endpoints for credential templates: the credential type, the
//! attestations it needs and how attestation fields map onto claims.
//! Every referenced attestation must already exist in the context,
//! otherwise the registration is rejected with `UNKNOWN_ATTESTATION`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use issuer_core::DefinitionId;
use issuer_engine::{CredentialDefinition, Mapping};
use issuer_vc::CredentialFormat;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::issuing_context;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// One attestation field copied into the claim set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingBody {
    /// Dotted path into the attestation record.
    pub input: String,
    /// Dotted path under `credentialSubject`.
    pub output: String,
    /// Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Attestation to read from; defaults to the first listed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Wire form of a credential definition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinitionBody {
    pub id: String,
    pub credential_type: String,
    /// Attestation definition ids, all required.
    pub attestations: Vec<String>,
    #[serde(default)]
    pub mappings: Vec<MappingBody>,
    /// Validity period in seconds.
    pub validity: u64,
    /// `VC1_0_JWT` (default) or `JSON_LD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema_url: Option<String>,
}

impl Validate for CredentialDefinitionBody {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_string());
        }
        if self.attestations.is_empty() {
            return Err("attestations must name at least one attestation".to_string());
        }
        if self.validity == 0 {
            return Err("validity must be positive".to_string());
        }
        Ok(())
    }
}

fn parse_format(raw: Option<&str>) -> Result<CredentialFormat, AppError> {
    match raw {
        None => Ok(CredentialFormat::default()),
        Some("VC1_0_JWT") => Ok(CredentialFormat::Vc10Jwt),
        Some("JSON_LD") => Ok(CredentialFormat::JsonLd),
        Some(other) => Err(AppError::Validation(format!(
            "format must be VC1_0_JWT or JSON_LD, got {other:?}"
        ))),
    }
}

impl TryFrom<MappingBody> for Mapping {
    type Error = AppError;

    fn try_from(body: MappingBody) -> Result<Self, Self::Error> {
        let mapping = Mapping::new(body.input, body.output, body.required.unwrap_or(true));
        Ok(match body.source {
            Some(source) => mapping.with_source(DefinitionId::new(source)?),
            None => mapping,
        })
    }
}

impl TryFrom<CredentialDefinitionBody> for CredentialDefinition {
    type Error = AppError;

    fn try_from(body: CredentialDefinitionBody) -> Result<Self, Self::Error> {
        let format = parse_format(body.format.as_deref())?;
        let required_attestation_ids = body
            .attestations
            .into_iter()
            .map(DefinitionId::new)
            .collect::<Result<Vec<_>, _>>()?;
        let mappings = body
            .mappings
            .into_iter()
            .map(Mapping::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CredentialDefinition {
            id: DefinitionId::new(body.id)?,
            credential_type: body.credential_type,
            required_attestation_ids,
            mappings,
            validity_seconds: body.validity,
            format,
            key_alias: body.key_alias,
            json_schema_url: body.json_schema_url,
        })
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/v1alpha/participants/:context/credentialdefinitions",
            get(list_credential_definitions).post(create_credential_definition),
        )
        .route(
            "/api/admin/v1alpha/participants/:context/credentialdefinitions/:id",
            get(get_credential_definition).delete(delete_credential_definition),
        )
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /api/admin/v1alpha/participants/:context/credentialdefinitions
#[utoipa::path(
    post,
    path = "/api/admin/v1alpha/participants/{context}/credentialdefinitions",
    params(("context" = String, Path, description = "Issuing context")),
    request_body = CredentialDefinitionBody,
    responses(
        (status = 201, description = "Credential definition registered", body = CredentialDefinitionBody),
        (status = 409, description = "Id already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid definition or unknown attestation", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_credential_definition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
    body: Result<Json<CredentialDefinitionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CredentialDefinition>), AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let definition = CredentialDefinition::try_from(extract_validated_json(body)?)?;
    state
        .engine
        .register_credential_definition(&context, definition.clone())?;
    Ok((StatusCode::CREATED, Json(definition)))
}

/// GET /api/admin/v1alpha/participants/:context/credentialdefinitions
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/credentialdefinitions",
    params(("context" = String, Path, description = "Issuing context")),
    responses((status = 200, description = "Credential definitions", body = Vec<CredentialDefinitionBody>)),
    tag = "admin"
)]
async fn list_credential_definitions(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
) -> Result<Json<Vec<CredentialDefinition>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    Ok(Json(state.engine.credential_definitions(&context)))
}

/// GET /api/admin/v1alpha/participants/:context/credentialdefinitions/:id
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/credentialdefinitions/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Credential definition id"),
    ),
    responses(
        (status = 200, description = "Credential definition", body = CredentialDefinitionBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn get_credential_definition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<Json<CredentialDefinition>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let definition = state
        .engine
        .credential_definition(&context, &DefinitionId::new(id)?)?;
    Ok(Json(definition))
}

/// DELETE /api/admin/v1alpha/participants/:context/credentialdefinitions/:id
#[utoipa::path(
    delete,
    path = "/api/admin/v1alpha/participants/{context}/credentialdefinitions/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Credential definition id"),
    ),
    responses(
        (status = 204, description = "Credential definition removed"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_credential_definition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    state
        .engine
        .delete_credential_definition(&context, &DefinitionId::new(id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> CredentialDefinitionBody {
        CredentialDefinitionBody {
            id: "membership-cred".into(),
            credential_type: "MembershipCredential".into(),
            attestations: vec!["membership".into()],
            mappings: vec![MappingBody {
                input: "membership_type".into(),
                output: "credentialSubject.membershipType".into(),
                required: None,
                source: None,
            }],
            validity: 3600,
            format: None,
            key_alias: None,
            json_schema_url: None,
        }
    }

    #[test]
    fn defaults_apply_on_conversion() {
        let def = CredentialDefinition::try_from(body()).unwrap();
        assert_eq!(def.format, CredentialFormat::Vc10Jwt);
        assert!(def.mappings[0].required);
        assert_eq!(def.validity_seconds, 3600);
    }

    #[test]
    fn json_ld_format_is_accepted() {
        let mut b = body();
        b.format = Some("JSON_LD".into());
        assert_eq!(
            CredentialDefinition::try_from(b).unwrap().format,
            CredentialFormat::JsonLd
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut b = body();
        b.format = Some("MDOC".into());
        assert!(matches!(
            CredentialDefinition::try_from(b),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn empty_attestation_list_fails_validation() {
        let mut b = body();
        b.attestations.clear();
        assert!(b.validate().is_err());
    }
}
