//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with two roles.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{holder_id}:{secret}   role is `holder` or `admin`
//! Bearer {secret}                      legacy format, treated as admin
//! ```
//!
//! A `holder` token must name the holder it acts for; such a caller may
//! only request and poll issuance for that holder. Admin tokens leave the
//! holder part empty (`admin::{secret}`).
//!
//! Every authenticated request gets a [`CallerIdentity`] in its
//! extensions. Handlers extract it through the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use issuer_core::HolderId;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles, ordered by privilege: `Holder < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May request and poll issuance for its own holder id.
    Holder,
    /// Registers holders and definitions; acts for any holder.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// The holder a `holder` token is bound to. `None` for admins.
    pub holder_id: Option<HolderId>,
}

impl CallerIdentity {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            holder_id: None,
        }
    }

    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Admins act for every holder; holders only for themselves.
    pub fn can_act_for(&self, holder: &HolderId) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Holder => self.holder_id.as_ref() == Some(holder),
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

/// Returns 403 Forbidden unless the caller may act for `holder`.
pub fn require_holder(caller: &CallerIdentity, holder: &HolderId) -> Result<(), AppError> {
    if caller.can_act_for(holder) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "caller may not act for holder {holder}"
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in `{role}:{holder_id}:{secret}` or legacy `{secret}` form.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::admin())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role, holder, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            match *role {
                "admin" => Ok(CallerIdentity::admin()),
                "holder" => {
                    if holder.is_empty() {
                        return Err("holder token must name a holder id".into());
                    }
                    let holder_id =
                        HolderId::new(*holder).map_err(|e| format!("invalid holder id: {e}"))?;
                    Ok(CallerIdentity {
                        role: Role::Holder,
                        holder_id: Some(holder_id),
                    })
                }
                other => Err(format!("unknown role: {other}")),
            }
        }
        _ => Err("invalid token format, expected {role}:{holder_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Validate the bearer token and inject the caller's identity.
///
/// When `AuthConfig.token` is `None`, every request runs as admin.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header.map(|h| h.strip_prefix("Bearer ")) {
                Some(Some(provided)) => match parse_bearer_token(provided, expected) {
                    Ok(identity) => {
                        request.extensions_mut().insert(identity);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                        unauthorized_response(&msg)
                    }
                },
                Some(None) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            request.extensions_mut().insert(CallerIdentity::admin());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
