//! # issuer CLI entry point
//!
//! Parses arguments with clap derive and dispatches to the subcommand
//! handlers in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use issuer_cli::keys::{run_keygen, KeygenArgs};
use issuer_cli::validate::{run_validate, ValidateArgs};
use issuer_cli::verify::{run_verify, VerifyArgs};

/// Credential issuer operator tooling.
#[derive(Parser, Debug)]
#[command(name = "issuer", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 issuer signing key.
    Keygen(KeygenArgs),

    /// Check a seed file by applying it to a scratch engine.
    Validate(ValidateArgs),

    /// Verify an issued credential against an issuer public key.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
