//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credential Issuer API",
        version = "0.1.0",
        description = "Attestation-driven verifiable credential issuance: admin registration of holders, attestation and credential definitions; asynchronous issuance with status polling.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Holders
        crate::routes::holders::create_holder,
        crate::routes::holders::list_holders,
        crate::routes::holders::get_holder,
        crate::routes::holders::delete_holder,
        // Attestation definitions
        crate::routes::attestations::create_attestation,
        crate::routes::attestations::list_attestations,
        crate::routes::attestations::get_attestation,
        crate::routes::attestations::delete_attestation,
        // Credential definitions
        crate::routes::credential_definitions::create_credential_definition,
        crate::routes::credential_definitions::list_credential_definitions,
        crate::routes::credential_definitions::get_credential_definition,
        crate::routes::credential_definitions::delete_credential_definition,
        // Issuance
        crate::routes::issuance::request_issuance,
        crate::routes::issuance::get_status,
        crate::routes::keys::list_keys,
        // Health
        crate::routes::health::health,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::holders::HolderBody,
        crate::routes::attestations::AttestationDefinitionBody,
        crate::routes::credential_definitions::CredentialDefinitionBody,
        crate::routes::credential_definitions::MappingBody,
        crate::routes::issuance::IssuanceRequestBody,
        crate::routes::issuance::IssuanceAccepted,
        crate::routes::issuance::IssuanceStatusResponse,
        crate::routes::issuance::SubRequestView,
        crate::routes::issuance::FailureView,
        crate::routes::keys::IssuerKeys,
        crate::routes::keys::PublicKeyView,
        crate::routes::health::HealthReport,
    )),
    tags(
        (name = "admin", description = "Holder and definition registration, per issuing context"),
        (name = "issuance", description = "Credential requests, status polling and issuer keys"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
