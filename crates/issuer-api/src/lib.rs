//! # issuer-api — HTTP Surface of the Credential Issuer
//!
//! ## API Surface
//!
//! | Prefix                                         | Module                              |
//! |------------------------------------------------|-------------------------------------|
//! | `/api/admin/v1alpha/participants/:ctx/holders` | [`routes::holders`]                 |
//! | `/api/admin/v1alpha/participants/:ctx/attestations` | [`routes::attestations`]       |
//! | `/api/admin/v1alpha/participants/:ctx/credentialdefinitions` | [`routes::credential_definitions`] |
//! | `/api/issuance/v1alpha/participants/:ctx/requests` | [`routes::issuance`]            |
//! | `/api/issuance/v1alpha/requests/:id`           | [`routes::issuance`]                |
//! | `/api/issuance/v1alpha/keys`                   | [`routes::keys`]                    |
//! | `/api/check/health`, `/health/*`               | [`routes::health`], this module     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health endpoints are mounted outside the auth middleware so probes work
/// without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::holders::router())
        .merge(routes::attestations::router())
        .merge(routes::credential_definitions::router())
        .merge(routes::issuance::router())
        .merge(routes::keys::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::health::router())
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe; 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe; 503 while a configured database is unreachable.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    match state.check_ready().await {
        Ok(()) => Ok("ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
