//! Service health summary at `/api/check/health`. The bare liveness and
//! readiness probes live in `lib.rs`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `UP` or `DOWN`.
    pub status: String,
    pub version: String,
    /// `postgres` or `memory`.
    pub record_store: String,
    /// Issuance requests currently held in memory.
    pub tracked_requests: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/check/health", get(health))
}

/// GET /api/check/health
#[utoipa::path(
    get,
    path = "/api/check/health",
    responses(
        (status = 200, description = "Service is up", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport),
    ),
    tag = "health"
)]
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let up = match state.check_ready().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            false
        }
    };
    let report = HealthReport {
        status: if up { "UP" } else { "DOWN" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        record_store: if state.db_pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
        .to_string(),
        tracked_requests: state.engine.tracked_requests(),
    };
    let code = if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}
