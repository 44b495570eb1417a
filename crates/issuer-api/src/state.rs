//! # Application State
//!
//! Configuration read from the environment and the shared state every
//! handler sees: the issuance engine, the issuer's key ring and DID, the
//! in-memory record store, and the optional Postgres pool.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use issuer_core::{Did, ValidationError};
use issuer_crypto::{CryptoError, KeyRing, SigningKey};
use issuer_engine::{
    DataSources, EngineConfig, InMemoryRecordStore, IssuerEngine, RecordLookup, Seed, SeedError,
    SeedSummary,
};
use issuer_vc::Ed25519Signer;

use crate::db::records::PgRecordStore;

/// DID used when `ISSUER_DID` is not set.
pub const DEFAULT_ISSUER_DID: &str = "did:web:localhost";

/// Data source name queryable attestations use when `ISSUER_DATA_SOURCE` is not set.
pub const DEFAULT_DATA_SOURCE: &str = "membership";

// -- Configuration ------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts the auth token and the signing key.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// DID credentials are issued under.
    pub issuer_did: String,
    /// Hex-encoded Ed25519 seed. If `None`, an ephemeral key is generated.
    pub signing_key_hex: Option<String>,
    /// YAML seed applied at startup.
    pub seed_file: Option<PathBuf>,
    /// Name the record store is registered under.
    pub data_source: String,
    pub engine: EngineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("issuer_did", &self.issuer_did)
            .field(
                "signing_key_hex",
                &self.signing_key_hex.as_ref().map(|_| "[REDACTED]"),
            )
            .field("seed_file", &self.seed_file)
            .field("data_source", &self.data_source)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            issuer_did: DEFAULT_ISSUER_DID.to_string(),
            signing_key_hex: None,
            seed_file: None,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

fn env_parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVar {
                name,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let engine_defaults = EngineConfig::default();
        let engine = EngineConfig {
            max_concurrent_issuances: env_parse("ISSUER_MAX_CONCURRENCY")?
                .unwrap_or(engine_defaults.max_concurrent_issuances),
            attestation_timeout: env_parse("ISSUER_ATTESTATION_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(engine_defaults.attestation_timeout),
            signing_timeout: env_parse("ISSUER_SIGNING_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(engine_defaults.signing_timeout),
            require_registered_holder: env_parse("ISSUER_REQUIRE_REGISTERED_HOLDER")?
                .unwrap_or(engine_defaults.require_registered_holder),
            failed_request_retention: env_parse("ISSUER_FAILED_RETENTION_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(engine_defaults.failed_request_retention),
            ..engine_defaults
        };

        Ok(Self {
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            auth_token: std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            issuer_did: std::env::var("ISSUER_DID").unwrap_or(defaults.issuer_did),
            signing_key_hex: std::env::var("ISSUER_SIGNING_KEY_HEX").ok(),
            seed_file: std::env::var("ISSUER_SEED_FILE").ok().map(PathBuf::from),
            data_source: std::env::var("ISSUER_DATA_SOURCE").unwrap_or(defaults.data_source),
            engine,
        })
    }
}

// -- Application State --------------------------------------------------------

#[derive(Error, Debug)]
pub enum StateError {
    #[error("ISSUER_SIGNING_KEY_HEX is invalid: {0}")]
    SigningKey(#[from] CryptoError),

    #[error("ISSUER_DID is invalid: {0}")]
    IssuerDid(#[from] ValidationError),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

fn load_or_generate_key(config: &AppConfig) -> Result<SigningKey, CryptoError> {
    match &config.signing_key_hex {
        Some(hex) => SigningKey::from_hex(hex),
        None => {
            tracing::warn!(
                "ISSUER_SIGNING_KEY_HEX not set, generating ephemeral key. \
                 Credentials signed with it cannot be verified after restart."
            );
            Ok(SigningKey::generate(&mut rand_core::OsRng))
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: IssuerEngine,
    /// Keys the signer can use, by alias.
    pub keys: Arc<KeyRing>,
    pub issuer_did: Did,
    /// Backs the data source when no database is configured.
    pub records: InMemoryRecordStore,
    /// PostgreSQL pool. When `Some`, queryable attestations read from it.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration and a fresh key.
    pub fn try_new() -> Result<Self, StateError> {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Result<Self, StateError> {
        let key = load_or_generate_key(&config)?;
        let issuer_did = Did::new(config.issuer_did.clone())?;
        let keys = Arc::new(KeyRing::new().with_key(config.engine.default_key_alias.clone(), key));

        let records = InMemoryRecordStore::new();
        let lookup: Arc<dyn RecordLookup> = match &db_pool {
            Some(pool) => Arc::new(PgRecordStore::new(pool.clone())),
            None => Arc::new(records.clone()),
        };
        let data_sources = DataSources::new().with_source(config.data_source.clone(), lookup);
        let signer = Arc::new(Ed25519Signer::new(Arc::clone(&keys)));
        let engine = IssuerEngine::new(data_sources, signer, config.engine.clone());

        Ok(Self {
            engine,
            keys,
            issuer_did,
            records,
            db_pool,
            config,
        })
    }

    /// Register a seed's holders and definitions. Its rows go into the
    /// in-memory store, unless a database backs the data source.
    pub fn apply_seed(&self, seed: &Seed) -> Result<SeedSummary, SeedError> {
        if self.db_pool.is_none() {
            let rows = seed.load_records(&self.records);
            tracing::info!(rows, "loaded seed records into the in-memory store");
        } else if !seed.records.is_empty() {
            tracing::warn!("database configured, ignoring records in seed file");
        }
        seed.apply(&self.engine)
    }

    /// Load and apply `config.seed_file`, if set.
    pub fn bootstrap(&self) -> Result<Option<SeedSummary>, StateError> {
        let Some(path) = &self.config.seed_file else {
            return Ok(None);
        };
        tracing::info!(path = %path.display(), "applying seed file");
        let seed = Seed::load(path)?;
        Ok(Some(self.apply_seed(&seed)?))
    }

    /// Ready when the database, if configured, answers.
    pub async fn check_ready(&self) -> Result<(), sqlx::Error> {
        if let Some(pool) = &self.db_pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
