//! # issuer-cli — Operator Tooling for the Credential Issuer
//!
//! ## Subcommands
//!
//! - `issuer keygen`: Generate an Ed25519 issuer key.
//! - `issuer validate`: Load a seed file into a scratch engine and report
//!   every registration error without starting the server.
//! - `issuer verify`: Check an issued credential against a public key.
//!
//! Each subcommand module exposes `run_*` returning the process exit code,
//! so the binary stays a thin dispatcher.

pub mod keys;
pub mod validate;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a file, naming it in the error.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
