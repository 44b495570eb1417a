//! # issuer-core — Foundational Types for the Credential Issuer
//!
//! Every other crate in the workspace depends on `issuer-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `IssuingContext`, `HolderId`,
//!    `DefinitionId`, `Did` and `RequestId` are distinct types with validated
//!    constructors. A holder id cannot be passed where a definition id is
//!    expected.
//!
//! 2. **`CanonicalBytes` newtype.** All signing input flows through
//!    `CanonicalBytes::new()` (RFC 8785 JSON canonicalization). Signatures
//!    computed over ad-hoc `serde_json::to_vec()` output cannot be expressed.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision, so
//!    issuance and expiry instants canonicalize identically everywhere.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `issuer-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::sha256_hex;
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{DefinitionId, Did, HolderId, IssuingContext, RequestId};
pub use temporal::Timestamp;
