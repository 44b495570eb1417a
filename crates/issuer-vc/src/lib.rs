//! # issuer-vc — Verifiable Credentials
//!
//! - [`credential`]: the W3C VC envelope with Ed25519 linked-data proofs.
//! - [`jwt`]: VC-JWT (`VC1_0_JWT`) compact encoding and verification.
//! - [`signer`]: the signing boundary the issuance orchestrator calls,
//!   plus the bundled key-ring-backed Ed25519 implementation.
//! - [`verify`]: format-agnostic verification of a presented credential.
//!
//! Signing always goes through `CanonicalBytes` or a JWS signing input
//! built from `CanonicalBytes`; see `issuer-crypto`.

pub mod credential;
pub mod format;
pub mod jwt;
pub mod proof;
pub mod signer;
pub mod verify;

pub use credential::{
    ContextValue, CredentialTypeValue, ProofResult, ProofValue, VcError, VerifiableCredential,
};
pub use format::CredentialFormat;
pub use jwt::{VcJwt, VcJwtClaims};
pub use proof::{Proof, ProofPurpose, ProofType};
pub use signer::{
    CredentialSigner, Ed25519Signer, SignedCredential, SigningError, SigningRequest,
};
pub use verify::{verify_credential, VerifiedCredential};
