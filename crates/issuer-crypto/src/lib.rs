//! # issuer-crypto — Cryptographic Primitives
//!
//! - **Ed25519** signing and verification. Keys sign only values that
//!   implement [`SigningInput`], which is sealed to [`CanonicalBytes`] and
//!   [`JwsSigningInput`]; raw byte slices cannot be signed.
//! - **Compact JWS** framing (`header.payload.signature`, base64url without
//!   padding) for VC-JWT credentials.
//! - **Key ring** mapping signing-key aliases to keys, consumed by the
//!   signing boundary.
//!
//! ## Crate Policy
//!
//! - Depends only on `issuer-core` internally.
//! - Private key material is never serialized or logged; `Debug` impls
//!   redact it and decoded seeds are zeroized.
//! - No mocking of cryptographic operations in tests.
//!
//! [`CanonicalBytes`]: issuer_core::CanonicalBytes

pub mod ed25519;
pub mod error;
pub mod hex;
pub mod jws;
pub mod keyring;

pub use ed25519::{Ed25519Signature, SigningInput, SigningKey, VerifyingKey};
pub use error::CryptoError;
pub use jws::{CompactJws, JwsSigningInput};
pub use keyring::KeyRing;
