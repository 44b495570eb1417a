//! # Integration Tests for issuer-api
//!
//! Exercises the HTTP surface end to end against the in-memory record
//! store: health probes, authentication, admin registration rules, the
//! issuance flow with status polling, and OpenAPI generation.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use issuer_api::state::{AppConfig, AppState};

const CTX: &str = "ctx-1";

/// Helper: in-memory state with membership rows for holder-1 and holder-2.
fn test_state(config: AppConfig) -> AppState {
    let state = AppState::with_config(config, None).unwrap();
    let rows = [
        json!({
            "holder_id": "holder-1",
            "membership_type": "full",
            "membership_start_date": "2023-01-01T00:00:00Z",
        }),
        json!({
            "holder_id": "holder-2",
            "membership_start_date": "2023-06-01T00:00:00Z",
        }),
    ];
    for row in rows {
        if let Value::Object(row) = row {
            state.records.insert("membership_attestations", row);
        }
    }
    state
}

/// Helper: build the test app with auth disabled.
fn test_app() -> (axum::Router, AppState) {
    let state = test_state(AppConfig::default());
    (issuer_api::app(state.clone()), state)
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> (axum::Router, AppState) {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    let state = test_state(config);
    (issuer_api::app(state.clone()), state)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn post_json(uri: &str, body: &Value, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn admin_uri(path: &str) -> String {
    format!("/api/admin/v1alpha/participants/{CTX}/{path}")
}

fn membership_attestation() -> Value {
    json!({
        "id": "membership",
        "attestationType": "database",
        "configuration": {
            "tableName": "membership_attestations",
            "dataSourceName": "membership",
            "idColumn": "holder_id",
        }
    })
}

fn membership_credential() -> Value {
    json!({
        "id": "membership-cred",
        "credentialType": "MembershipCredential",
        "attestations": ["membership"],
        "validity": 3600,
        "mappings": [
            {"input": "membership_type", "output": "credentialSubject.membershipType"},
            {"input": "membership_start_date", "output": "credentialSubject.membershipStartDate"},
        ]
    })
}

/// Register the membership attestation and credential definition.
async fn register_membership(app: &axum::Router, auth: Option<&str>) {
    let response = app
        .clone()
        .oneshot(post_json(&admin_uri("attestations"), &membership_attestation(), auth))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .clone()
        .oneshot(post_json(
            &admin_uri("credentialdefinitions"),
            &membership_credential(),
            auth,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Submit a request and return the Location header.
async fn submit(app: &axum::Router, holder: &str, definitions: &[&str], auth: Option<&str>) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/issuance/v1alpha/participants/{CTX}/requests"),
            &json!({"holderId": holder, "credentialDefinitionIds": definitions}),
            auth,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(response).await;
    assert!(location.ends_with(body["requestId"].as_str().unwrap()));
    location
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/health/liveness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/health/readiness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_health_report_without_auth() {
    let (app, _) = test_app_with_auth("s3cret");
    let response = app.oneshot(get("/api/check/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "UP");
    assert_eq!(body["recordStore"], "memory");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let (app, _) = test_app_with_auth("s3cret");
    let response = app.oneshot(get(&admin_uri("holders"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_holder_token_cannot_use_admin_routes() {
    let (app, _) = test_app_with_auth("s3cret");
    let response = app
        .oneshot(post_json(
            &admin_uri("attestations"),
            &membership_attestation(),
            Some("holder:holder-1:s3cret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_holder_cannot_request_for_another_holder() {
    let (app, _) = test_app_with_auth("s3cret");
    register_membership(&app, Some("s3cret")).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/issuance/v1alpha/participants/{CTX}/requests"),
            &json!({"holderId": "holder-2", "credentialDefinitionIds": ["membership-cred"]}),
            Some("holder:holder-1:s3cret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_admin_may_override_issuer_did() {
    let (app, _) = test_app_with_auth("s3cret");
    register_membership(&app, Some("s3cret")).await;
    let uri = format!("/api/issuance/v1alpha/participants/{CTX}/requests");

    let foreign = json!({
        "holderId": "holder-1",
        "issuerId": "did:web:someone-else.example",
        "credentialDefinitionIds": ["membership-cred"],
    });
    let response = app
        .clone()
        .oneshot(post_json(&uri, &foreign, Some("holder:holder-1:s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let own = json!({
        "holderId": "holder-1",
        "issuerId": "did:web:localhost",
        "credentialDefinitionIds": ["membership-cred"],
    });
    let response = app
        .clone()
        .oneshot(post_json(&uri, &own, Some("holder:holder-1:s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_json(&uri, &foreign, Some("s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_holder_cannot_poll_another_holders_request() {
    let (app, _) = test_app_with_auth("s3cret");
    register_membership(&app, Some("s3cret")).await;
    let location = submit(&app, "holder-2", &["membership-cred"], Some("s3cret")).await;

    let response = app
        .clone()
        .oneshot(get(&location, Some("holder:holder-1:s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get(&location, Some("holder:holder-2:s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Admin Registration -------------------------------------------------------

#[tokio::test]
async fn test_holder_crud() {
    let (app, _) = test_app();
    let holder = json!({"holderId": "holder-1", "did": "did:web:holder1.example", "name": "Holder One"});

    let response = app
        .clone()
        .oneshot(post_json(&admin_uri("holders"), &holder, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_json(&admin_uri("holders"), &holder, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(get(&admin_uri("holders/holder-1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["did"], "did:web:holder1.example");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(admin_uri("holders/holder-1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&admin_uri("holders/holder-1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_credential_definition_with_unknown_attestation_is_422() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            &admin_uri("credentialdefinitions"),
            &membership_credential(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNKNOWN_ATTESTATION");
    assert_eq!(body["error"]["details"]["missing"][0], "membership");
}

#[tokio::test]
async fn test_referenced_attestation_cannot_be_deleted() {
    let (app, _) = test_app();
    register_membership(&app, None).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(admin_uri("attestations/membership"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_data_source_is_422() {
    let (app, _) = test_app();
    let mut attestation = membership_attestation();
    attestation["configuration"]["dataSourceName"] = json!("warehouse");
    let response = app
        .oneshot(post_json(&admin_uri("attestations"), &attestation, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(admin_uri("holders"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_definitions_are_scoped_by_context() {
    let (app, _) = test_app();
    register_membership(&app, None).await;
    let response = app
        .oneshot(get(
            "/api/admin/v1alpha/participants/ctx-2/credentialdefinitions",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

// -- Issuance -----------------------------------------------------------------

#[tokio::test]
async fn test_membership_credential_is_issued() {
    let (app, state) = test_app();
    register_membership(&app, None).await;
    let location = submit(&app, "holder-1", &["membership-cred"], None).await;

    let response = app
        .oneshot(get(&format!("{location}?waitMs=5000"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ISSUED");
    assert_eq!(body["subRequests"][0]["status"], "ISSUED");

    let issued = &body["credentials"][0];
    assert_eq!(issued["claims"]["credentialSubject"]["membershipType"], "full");
    let key = state.keys.verifying_key("issuer").unwrap();
    let verified = issuer_vc::verify_credential(&issued["credential"], &key).unwrap();
    assert!(verified.types.contains(&"MembershipCredential".to_string()));
    assert_eq!(verified.subject["membershipType"], "full");
}

#[tokio::test]
async fn test_missing_required_field_fails_with_mapping_reason() {
    let (app, _) = test_app();
    register_membership(&app, None).await;
    let location = submit(&app, "holder-2", &["membership-cred"], None).await;

    let body = body_json(
        app.oneshot(get(&format!("{location}?waitMs=5000"), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "FAILED");
    let failure = &body["subRequests"][0]["failure"];
    assert_eq!(failure["code"], "MAPPING_FAILED");
    assert_eq!(failure["details"]["field"], "membership_type");
    assert!(body["credentials"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_holder_without_attestation_fails() {
    let (app, _) = test_app();
    register_membership(&app, None).await;
    let location = submit(&app, "holder-3", &["membership-cred"], None).await;

    let body = body_json(
        app.oneshot(get(&format!("{location}?waitMs=5000"), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(
        body["subRequests"][0]["failure"]["code"],
        "ATTESTATION_UNAVAILABLE"
    );
}

#[tokio::test]
async fn test_unknown_definition_fails_request() {
    let (app, _) = test_app();
    register_membership(&app, None).await;
    let location = submit(&app, "holder-1", &["membership-cred", "nope"], None).await;

    let body = body_json(
        app.oneshot(get(&format!("{location}?waitMs=5000"), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["mode"], "failFast");
    for sub in body["subRequests"].as_array().unwrap() {
        assert_eq!(sub["failure"]["code"], "UNKNOWN_CREDENTIAL_DEFINITION");
    }
}

#[tokio::test]
async fn test_empty_definition_list_is_422() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            &format!("/api/issuance/v1alpha/participants/{CTX}/requests"),
            &json!({"holderId": "holder-1", "credentialDefinitionIds": []}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_repeated_definition_id_is_422() {
    let (app, state) = test_app();
    register_membership(&app, None).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/issuance/v1alpha/participants/{CTX}/requests"),
            &json!({
                "holderId": "holder-1",
                "credentialDefinitionIds": ["membership-cred", "membership-cred"],
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("duplicate definition id"), "{body}");
    assert_eq!(state.engine.tracked_requests(), 0);
}

#[tokio::test]
async fn test_unknown_request_is_404() {
    let (app, _) = test_app();
    let response = app
        .oneshot(get(
            "/api/issuance/v1alpha/requests/00000000-0000-4000-8000-000000000000",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_request_id_is_422() {
    let (app, _) = test_app();
    let response = app
        .oneshot(get("/api/issuance/v1alpha/requests/not-a-uuid", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Keys & OpenAPI -----------------------------------------------------------

#[tokio::test]
async fn test_keys_expose_issuer_public_key() {
    let (app, state) = test_app();
    let response = app
        .oneshot(get("/api/issuance/v1alpha/keys", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["issuer"], "did:web:localhost");
    assert_eq!(body["keys"][0]["verificationMethod"], "did:web:localhost#issuer");
    assert_eq!(
        body["keys"][0]["publicKeyHex"],
        state.keys.verifying_key("issuer").unwrap().to_hex()
    );
}

#[tokio::test]
async fn test_openapi_spec() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/openapi.json", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]
        .get("/api/issuance/v1alpha/participants/{context}/requests")
        .is_some());
}

// -- Seed ---------------------------------------------------------------------

#[tokio::test]
async fn test_seed_file_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.yaml");
    std::fs::write(
        &path,
        r#"
contexts:
  ctx-1:
    attestations:
      - id: membership
        attestationType: database
        configuration:
          tableName: membership_attestations
          dataSourceName: membership
          idColumn: holder_id
records:
  membership_attestations:
    - holder_id: holder-9
      membership_type: associate
"#,
    )
    .unwrap();

    let config = AppConfig {
        seed_file: Some(path),
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, None).unwrap();
    let summary = state.bootstrap().unwrap().unwrap();
    assert_eq!(summary.attestations, 1);
    assert_eq!(state.records.row_count("membership_attestations"), 1);

    let app = issuer_api::app(state);
    let response = app
        .oneshot(get(&admin_uri("attestations/membership"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
