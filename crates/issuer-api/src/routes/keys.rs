//! # Issuer Keys
//!
//! Public half of every signing key, so relying parties can verify
//! issued credentials against the `kid` in their proof.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyView {
    pub alias: String,
    /// `{issuer DID}#{alias}`, the `kid` of credentials signed with this key.
    pub verification_method: String,
    /// Always `Ed25519`.
    pub algorithm: String,
    /// Raw 32-byte public key, hex.
    pub public_key_hex: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuerKeys {
    pub issuer: String,
    pub keys: Vec<PublicKeyView>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/issuance/v1alpha/keys", get(list_keys))
}

/// GET /api/issuance/v1alpha/keys
#[utoipa::path(
    get,
    path = "/api/issuance/v1alpha/keys",
    responses((status = 200, description = "Issuer public keys", body = IssuerKeys)),
    tag = "issuance"
)]
async fn list_keys(State(state): State<AppState>) -> Json<IssuerKeys> {
    let issuer = state.issuer_did.to_string();
    let keys = state
        .keys
        .public_keys()
        .into_iter()
        .map(|(alias, key)| PublicKeyView {
            verification_method: format!("{issuer}#{alias}"),
            algorithm: "Ed25519".to_string(),
            public_key_hex: key.to_hex(),
            alias,
        })
        .collect();
    Json(IssuerKeys { issuer, keys })
}
