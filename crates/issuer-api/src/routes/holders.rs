//! # Holder Registration
//!
//! Admin endpoints for the participants that may receive credentials in
//! an issuing context.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use issuer_core::{Did, HolderId};
use issuer_engine::Holder;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::issuing_context;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// A holder as registered by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HolderBody {
    /// Identifier the holder is known by in this context.
    pub holder_id: String,
    /// DID used as the credential subject.
    pub did: String,
    /// Display name.
    pub name: String,
}

impl Validate for HolderBody {
    fn validate(&self) -> Result<(), String> {
        if self.holder_id.trim().is_empty() {
            return Err("holderId must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

impl TryFrom<HolderBody> for Holder {
    type Error = AppError;

    fn try_from(body: HolderBody) -> Result<Self, Self::Error> {
        Ok(Holder {
            holder_id: HolderId::new(body.holder_id)?,
            did: Did::new(body.did)?,
            name: body.name,
        })
    }
}

impl From<Holder> for HolderBody {
    fn from(holder: Holder) -> Self {
        Self {
            holder_id: holder.holder_id.to_string(),
            did: holder.did.to_string(),
            name: holder.name,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/v1alpha/participants/:context/holders",
            get(list_holders).post(create_holder),
        )
        .route(
            "/api/admin/v1alpha/participants/:context/holders/:id",
            get(get_holder).delete(delete_holder),
        )
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /api/admin/v1alpha/participants/:context/holders
#[utoipa::path(
    post,
    path = "/api/admin/v1alpha/participants/{context}/holders",
    params(("context" = String, Path, description = "Issuing context")),
    request_body = HolderBody,
    responses(
        (status = 201, description = "Holder registered", body = HolderBody),
        (status = 409, description = "Holder already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_holder(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
    body: Result<Json<HolderBody>, JsonRejection>,
) -> Result<(StatusCode, Json<HolderBody>), AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let holder = Holder::try_from(extract_validated_json(body)?)?;
    state.engine.register_holder(&context, holder.clone())?;
    Ok((StatusCode::CREATED, Json(holder.into())))
}

/// GET /api/admin/v1alpha/participants/:context/holders
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/holders",
    params(("context" = String, Path, description = "Issuing context")),
    responses((status = 200, description = "Holders in the context", body = Vec<HolderBody>)),
    tag = "admin"
)]
async fn list_holders(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(context): Path<String>,
) -> Result<Json<Vec<HolderBody>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let holders = state.engine.holders(&context);
    Ok(Json(holders.into_iter().map(HolderBody::from).collect()))
}

/// GET /api/admin/v1alpha/participants/:context/holders/:id
#[utoipa::path(
    get,
    path = "/api/admin/v1alpha/participants/{context}/holders/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Holder id"),
    ),
    responses(
        (status = 200, description = "Holder found", body = HolderBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn get_holder(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<Json<HolderBody>, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    let holder = state.engine.holder(&context, &HolderId::new(id)?)?;
    Ok(Json(holder.into()))
}

/// DELETE /api/admin/v1alpha/participants/:context/holders/:id
#[utoipa::path(
    delete,
    path = "/api/admin/v1alpha/participants/{context}/holders/{id}",
    params(
        ("context" = String, Path, description = "Issuing context"),
        ("id" = String, Path, description = "Holder id"),
    ),
    responses(
        (status = 204, description = "Holder removed"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_holder(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((context, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let context = issuing_context(context)?;
    state.engine.delete_holder(&context, &HolderId::new(id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
