//! # API Route Modules
//!
//! Each module exposes a `router()` returning `Router<AppState>`; the
//! application router in `lib.rs` merges them.
//!
//! Admin routes live under `/api/admin/v1alpha/participants/:context/`,
//! holder-facing issuance under `/api/issuance/v1alpha/`.

pub mod attestations;
pub mod credential_definitions;
pub mod health;
pub mod holders;
pub mod issuance;
pub mod keys;

use issuer_core::IssuingContext;

use crate::error::AppError;

/// Parse the `:context` path segment.
pub(crate) fn issuing_context(raw: String) -> Result<IssuingContext, AppError> {
    Ok(IssuingContext::new(raw)?)
}
