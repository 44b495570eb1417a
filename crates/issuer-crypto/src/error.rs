//! Errors from key handling, encoding and signature verification.

use thiserror::Error;

/// Cryptographic operation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material was malformed or of the wrong length.
    #[error("key error: {0}")]
    KeyError(String),

    /// A signature did not verify.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// Hex, base64 or JSON framing could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}
