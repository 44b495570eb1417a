//! SHA-256 digests over canonical bytes.
//!
//! Only `&CanonicalBytes` is accepted, so two parties digesting the same
//! claim set always agree on the result.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Compute the lowercase hex SHA-256 digest of canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    let digest = Sha256::digest(data.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
