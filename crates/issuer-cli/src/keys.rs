//! # Keygen Subcommand
//!
//! Generates an Ed25519 key for `ISSUER_SIGNING_KEY_HEX` and prints it as
//! JSON, optionally writing the secret to a file instead of stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand_core::OsRng;
use serde::Serialize;

use issuer_crypto::SigningKey;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key alias; credentials reference it as `{issuer DID}#{alias}`.
    #[arg(long, default_value = "issuer")]
    pub alias: String,

    /// Write the secret key (hex) to this file and omit it from stdout.
    #[arg(long)]
    pub secret_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKey {
    pub alias: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_hex: Option<String>,
}

/// Generate a key and describe it. The secret stays in the returned value
/// only when no `secret_out` file was given.
pub fn generate(args: &KeygenArgs) -> Result<GeneratedKey> {
    let key = SigningKey::generate(&mut OsRng);
    let secret = key.secret_hex();

    let private_key_hex = match &args.secret_out {
        Some(path) => {
            std::fs::write(path, secret.as_bytes())
                .with_context(|| format!("failed to write secret key: {}", path.display()))?;
            tracing::info!(path = %path.display(), "secret key written");
            None
        }
        None => Some(secret.to_string()),
    };

    Ok(GeneratedKey {
        alias: args.alias.clone(),
        public_key: key.verifying_key().to_hex(),
        private_key_hex,
    })
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let generated = generate(args)?;
    println!("{}", serde_json::to_string_pretty(&generated)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuer_crypto::VerifyingKey;

    #[test]
    fn generated_key_round_trips_through_hex() {
        let generated = generate(&KeygenArgs {
            alias: "issuer".into(),
            secret_out: None,
        })
        .unwrap();
        let secret = generated.private_key_hex.unwrap();
        let key = SigningKey::from_hex(&secret).unwrap();
        assert_eq!(key.verifying_key().to_hex(), generated.public_key);
        assert!(VerifyingKey::from_hex(&generated.public_key).is_ok());
    }

    #[test]
    fn secret_out_keeps_secret_off_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuer.key");
        let generated = generate(&KeygenArgs {
            alias: "k1".into(),
            secret_out: Some(path.clone()),
        })
        .unwrap();
        assert!(generated.private_key_hex.is_none());
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            SigningKey::from_hex(&written).unwrap().verifying_key().to_hex(),
            generated.public_key
        );
    }
}
