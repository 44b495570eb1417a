//! # Verify Subcommand
//!
//! Offline verification of an issued credential. The input file may hold
//! a bare VC-JWT, a JSON-LD credential, or an issued-credential object as
//! returned by the status endpoint (its `credential` field is used).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use issuer_crypto::VerifyingKey;
use issuer_vc::{verify_credential, VerifiedCredential};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// File holding the credential.
    #[arg(value_name = "CREDENTIAL")]
    pub credential: PathBuf,

    /// Issuer public key, hex-encoded (see `GET /api/issuance/v1alpha/keys`).
    #[arg(long)]
    pub public_key: String,
}

/// Turn file contents into the value `verify_credential` expects.
pub fn parse_credential(text: &str) -> Result<Value> {
    let text = text.trim();
    if !text.starts_with('{') {
        return Ok(Value::String(text.trim_matches('"').to_string()));
    }
    let value: Value = serde_json::from_str(text).context("credential file is not valid JSON")?;
    match value.get("credential") {
        Some(inner) => Ok(inner.clone()),
        None => Ok(value),
    }
}

pub fn verify_file(args: &VerifyArgs) -> Result<VerifiedCredential> {
    let key = VerifyingKey::from_hex(args.public_key.trim())
        .map_err(|e| anyhow::anyhow!("invalid public key: {e}"))?;
    let credential = parse_credential(&crate::read_file(&args.credential)?)?;
    verify_credential(&credential, &key)
        .with_context(|| format!("{} failed verification", args.credential.display()))
}

pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    match verify_file(args) {
        Ok(verified) => {
            println!("OK: credential is valid");
            println!("{}", serde_json::to_string_pretty(&verified)?);
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e:#}");
            Ok(1)
        }
    }
}
