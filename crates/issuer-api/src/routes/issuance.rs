//! # Issuance Requests
//!
//! Holders (or admins acting for them) submit a request naming one or more
//! credential definitions and get a request id back at once with
//! `202 Accepted`. Issuance runs in the background; the status endpoint
//! reports PENDING until every sub-request reached ISSUED or FAILED.
//!
//! `GET .../requests/:id?waitMs=N` holds the response for up to `N`
//! milliseconds (capped) waiting for the request to finish.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use issuer_core::{DefinitionId, Did, HolderId, RequestId};
use issuer_engine::{EngineError, IssuanceStatus, IssuanceSubmission};
use issuer_state::IssuanceMode;

use crate::auth::{require_holder, require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::issuing_context;
use crate::state::AppState;

/// Upper bound for `waitMs`.
const MAX_WAIT: Duration = Duration::from_secs(30);

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// Issuance request submitted by or on behalf of a holder.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequestBody {
    pub holder_id: String,
    /// Issuer DID; defaults to the service's configured DID. Only admins
    /// may name a different one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<String>,
    pub credential_definition_ids: Vec<String>,
    /// `failFast` or `independent`; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl Validate for IssuanceRequestBody {
    fn validate(&self) -> Result<(), String> {
        if self.holder_id.trim().is_empty() {
            return Err("holderId must not be empty".to_string());
        }
        if self.credential_definition_ids.is_empty() {
            return Err("credentialDefinitionIds must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_mode(raw: Option<&str>) -> Result<Option<IssuanceMode>, AppError> {
    match raw {
        None => Ok(None),
        Some("failFast") => Ok(Some(IssuanceMode::FailFast)),
        Some("independent") => Ok(Some(IssuanceMode::Independent)),
        Some(other) => Err(AppError::Validation(format!(
            "mode must be failFast or independent, got {other:?}"
        ))),
    }
}

/// Returned with `202 Accepted`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceAccepted {
    pub request_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Milliseconds to wait for a terminal status (max 30000).
    pub wait_ms: Option<u64>,
}

/// Why a sub-request failed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FailureView {
    /// `UNKNOWN_CREDENTIAL_DEFINITION`, `ATTESTATION_UNAVAILABLE`,
    /// `MAPPING_FAILED` or `SIGNING_FAILED`.
    pub code: String,
    pub message: String,
    /// The full failure reason, including the fields of its variant.
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestView {
    pub definition_id: String,
    /// `PENDING`, `ISSUED` or `FAILED`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureView>,
}

/// Poll result for an issuance request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceStatusResponse {
    pub request_id: String,
    /// `PENDING`, `ISSUED` or `FAILED`.
    pub status: String,
    pub issuing_context: String,
    pub holder_id: String,
    pub issuer_id: String,
    pub mode: String,
    pub sub_requests: Vec<SubRequestView>,
    /// Issued credentials with their claims, digest and proof.
    #[schema(value_type = Vec<Object>)]
    pub credentials: Vec<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

fn to_json(value: &impl Serialize) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("serialization: {e}")))
}

impl TryFrom<IssuanceStatus> for IssuanceStatusResponse {
    type Error = AppError;

    fn try_from(status: IssuanceStatus) -> Result<Self, Self::Error> {
        let sub_requests = status
            .sub_requests
            .iter()
            .map(|sub| {
                let failure = status
                    .failures
                    .iter()
                    .find(|f| f.definition_id == sub.definition_id)
                    .map(|f| {
                        Ok::<_, AppError>(FailureView {
                            code: f.reason.code().to_string(),
                            message: f.reason.to_string(),
                            details: to_json(&f.reason)?,
                        })
                    })
                    .transpose()?;
                Ok(SubRequestView {
                    definition_id: sub.definition_id.to_string(),
                    status: sub.status.to_string(),
                    failure,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let credentials = status
            .issued_credentials
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            request_id: status.request_id.to_string(),
            status: status.status.to_string(),
            issuing_context: status.request.issuing_context.to_string(),
            holder_id: status.request.holder_id.to_string(),
            issuer_id: status.request.issuer_id.to_string(),
            mode: status.request.mode.to_string(),
            sub_requests,
            credentials,
            created_at: status.request.created_at.to_iso8601(),
            updated_at: status.updated_at.to_iso8601(),
        })
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/issuance/v1alpha/participants/:context/requests",
            post(request_issuance),
        )
        .route("/api/issuance/v1alpha/requests/:id", get(get_status))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /api/issuance/v1alpha/participants/:context/requests
#[utoipa::path(
    post,
    path = "/api/issuance/v1alpha/participants/{context}/requests",
    params(("context" = String, Path, description = "Issuing context")),
    request_body = IssuanceRequestBody,
    responses(
        (status = 202, description = "Request accepted, poll the Location header", body = IssuanceAccepted),
        (status = 403, description = "Caller may not act for this holder or issuer", body = crate::error::ErrorBody),
        (status = 404, description = "Holder not registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "issuance"
)]
async fn request_issuance(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
    body: Result<Json<IssuanceRequestBody>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<IssuanceAccepted>), AppError> {
    let context = issuing_context(context)?;
    let req = extract_validated_json(body)?;
    let holder_id = HolderId::new(req.holder_id)?;
    require_holder(&caller, &holder_id)?;

    // Only admins may issue under a DID other than the service's own.
    let issuer = match req.issuer_id {
        Some(did) => {
            let did = Did::new(did)?;
            if did != state.issuer_did {
                require_role(&caller, Role::Admin)?;
            }
            did
        }
        None => state.issuer_did.clone(),
    };
    let definition_ids = req
        .credential_definition_ids
        .into_iter()
        .map(DefinitionId::new)
        .collect::<Result<Vec<_>, _>>()?;

    let request_id = state.engine.request_issuance(IssuanceSubmission {
        context,
        holder_id,
        issuer,
        definition_ids,
        mode: parse_mode(req.mode.as_deref())?,
    })?;

    let mut headers = HeaderMap::new();
    let location = format!("/api/issuance/v1alpha/requests/{request_id}");
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location)
            .map_err(|e| AppError::Internal(format!("location header: {e}")))?,
    );
    Ok((
        StatusCode::ACCEPTED,
        headers,
        Json(IssuanceAccepted {
            request_id: request_id.to_string(),
        }),
    ))
}

/// GET /api/issuance/v1alpha/requests/:id
#[utoipa::path(
    get,
    path = "/api/issuance/v1alpha/requests/{id}",
    params(
        ("id" = String, Path, description = "Request id"),
        StatusQuery,
    ),
    responses(
        (status = 200, description = "Current status", body = IssuanceStatusResponse),
        (status = 403, description = "Request belongs to another holder", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown request", body = crate::error::ErrorBody),
    ),
    tag = "issuance"
)]
async fn get_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<IssuanceStatusResponse>, AppError> {
    let id: RequestId = id.parse()?;
    let mut status = state.engine.issuance_status(&id)?;
    require_holder(&caller, &status.request.holder_id)?;

    let wait = query
        .wait_ms
        .map(Duration::from_millis)
        .unwrap_or_default()
        .min(MAX_WAIT);
    if !wait.is_zero() && !status.status.is_terminal() {
        status = match state.engine.wait_for_completion(&id, wait).await {
            Ok(done) => done,
            Err(EngineError::StillPending(_)) => state.engine.issuance_status(&id)?,
            Err(e) => return Err(e.into()),
        };
    }

    Ok(Json(IssuanceStatusResponse::try_from(status)?))
}
